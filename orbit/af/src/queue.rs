//! Bounded event queues.
//!
//! The queue keeps the next event to consume in a dedicated front slot and
//! the rest in a ring buffer, so delivery to an empty queue touches no ring
//! state and the kernel's "queue became non-empty" signal falls out of the
//! front transition. FIFO posts write the ring at `head` walking downward;
//! LIFO posts displace the front into the slot above `tail`; consumption
//! refills the front from `tail` walking downward.
//!
//! `n_free` counts the front slot, so a queue created with ring length `n`
//! accepts `n + 1` events. `n_min` is the all-time low of `n_free`.

use orbit_core::{require, Error, Evt, NO_MARGIN};

use crate::fw;
use crate::pool;

const MODULE: &str = "queue";

pub(crate) struct EvtQueue {
    front: Option<Evt>,
    ring: alloc::vec::Vec<Option<Evt>>,
    head: u16,
    tail: u16,
    end: u16,
    n_free: u16,
    n_min: u16,
}

impl EvtQueue {
    /// A queue with `len` ring slots (total capacity `len + 1`).
    pub(crate) fn new(len: u16) -> Self {
        EvtQueue {
            front: None,
            ring: alloc::vec![None; len as usize],
            head: 0,
            tail: 0,
            end: len,
            n_free: len + 1,
            n_min: len + 1,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.front.is_none()
    }

    pub(crate) fn n_free(&self) -> u16 {
        self.n_free
    }

    pub(crate) fn n_min(&self) -> u16 {
        self.n_min
    }

    /// Margin policy of a FIFO post: `NO_MARGIN` needs one free slot,
    /// anything else needs `margin` slots left over after the post.
    pub(crate) fn can_accept(&self, margin: u16) -> bool {
        if margin == NO_MARGIN {
            self.n_free > 0
        } else {
            self.n_free > margin
        }
    }

    fn used_one(&mut self) {
        require!(MODULE, 211, self.n_free > 0);
        self.n_free -= 1;
        if self.n_min > self.n_free {
            self.n_min = self.n_free;
        }
    }

    /// Append an event; returns whether the queue was empty (the caller
    /// signals the owner on that edge).
    pub(crate) fn push_fifo(&mut self, e: Evt) -> bool {
        self.used_one();
        if self.front.is_none() {
            self.front = Some(e);
            true
        } else {
            self.ring[self.head as usize] = Some(e);
            if self.head == 0 {
                self.head = self.end;
            }
            self.head -= 1;
            false
        }
    }

    /// Put an event in front of everything queued. Overflow is fatal: a
    /// LIFO post is for events that must not be lost.
    pub(crate) fn push_lifo(&mut self, e: Evt) -> bool {
        require!(MODULE, 210, self.n_free > 0);
        self.used_one();
        match self.front.replace(e) {
            None => true,
            Some(displaced) => {
                self.tail += 1;
                if self.tail == self.end {
                    self.tail = 0;
                }
                self.ring[self.tail as usize] = Some(displaced);
                false
            }
        }
    }

    /// Remove the front event; refills the front from the ring. The caller
    /// owns the returned reference (no count adjustment here).
    pub(crate) fn pop(&mut self) -> Option<Evt> {
        let e = self.front.take()?;
        self.n_free += 1;
        if self.n_free <= self.end {
            // ring still holds events
            let next = self.ring[self.tail as usize].take();
            require!(MODULE, 311, next.is_some());
            self.front = next;
            if self.tail == 0 {
                self.tail = self.end;
            }
            self.tail -= 1;
        } else {
            // all entries must be free now (+1 for the front slot)
            require!(MODULE, 310, self.n_free == self.end + 1);
        }
        Some(e)
    }
}

/// A thread-safe event queue outside any active object.
///
/// Events in a raw queue are reference-counted like queued events anywhere
/// else, but nothing dispatches them: the owner takes them out with
/// [`RawQueue::get`] and remains responsible for the reference it receives.
/// The deferral API ([`crate::active::ActiveBase::defer`]) stores events
/// here.
pub struct RawQueue {
    q: critical_section::Mutex<core::cell::RefCell<EvtQueue>>,
}

impl RawQueue {
    /// A raw queue with `len` ring slots (total capacity `len + 1`).
    pub fn new(len: u16) -> Self {
        RawQueue {
            q: critical_section::Mutex::new(core::cell::RefCell::new(EvtQueue::new(len))),
        }
    }

    /// Post FIFO with a margin; see [`EvtQueue::can_accept`] for the
    /// policy. A failed post garbage-collects the event so nothing leaks.
    pub fn post(&self, e: Evt, margin: u16) -> Result<(), Error> {
        let ok = critical_section::with(|cs| {
            let mut q = self.q.borrow_ref_mut(cs);
            let ok = q.can_accept(margin);
            // a NO_MARGIN post must not overflow
            require!(MODULE, 110, ok || margin != NO_MARGIN);
            if ok {
                if e.is_dynamic() {
                    fw::borrow_mut(cs).evt_ref_inc(&e);
                }
                let _ = q.push_fifo(e);
            }
            ok
        });
        if ok {
            Ok(())
        } else {
            pool::gc(e);
            Err(Error::QueueFull)
        }
    }

    /// Post to the front; overflow is fatal.
    pub fn post_lifo(&self, e: Evt) {
        critical_section::with(|cs| {
            let mut q = self.q.borrow_ref_mut(cs);
            if e.is_dynamic() {
                fw::borrow_mut(cs).evt_ref_inc(&e);
            }
            let _ = q.push_lifo(e);
        });
    }

    /// Take the next event. The caller owns the single reference the queue
    /// held and must `gc` it (or hand it on) eventually.
    pub fn get(&self) -> Option<Evt> {
        critical_section::with(|cs| self.q.borrow_ref_mut(cs).pop())
    }

    pub fn is_empty(&self) -> bool {
        critical_section::with(|cs| self.q.borrow_ref(cs).is_empty())
    }

    pub fn n_free(&self) -> u16 {
        critical_section::with(|cs| self.q.borrow_ref(cs).n_free())
    }

    pub fn n_min(&self) -> u16 {
        critical_section::with(|cs| self.q.borrow_ref(cs).n_min())
    }
}

/// Lowest number of free queue slots ever observed for the AO at `prio`.
pub fn queue_min(prio: orbit_core::Prio) -> u16 {
    fw::with(|fw| {
        let slot = fw.slots[prio.index()].as_ref();
        require!(MODULE, 400, slot.is_some());
        slot.unwrap().queue.n_min()
    })
}

/// Discard every event still queued for the AO at `prio`, recycling the
/// dynamic ones. Used when stopping an active object.
pub(crate) fn flush(prio: orbit_core::Prio) {
    loop {
        let e = fw::with(|fw| {
            fw.slots[prio.index()]
                .as_mut()
                .and_then(|slot| slot.queue.pop())
        });
        match e {
            Some(e) => pool::gc(e),
            None => break,
        }
    }
}
