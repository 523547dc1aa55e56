//! Active objects: event-driven, run-to-completion state machines, each
//! bound to a unique priority and a bounded event queue.
//!
//! The framework keeps two things per priority: the queue slot, which any
//! context may post into under the critical section, and the behavior
//! object, which a kernel takes out for the duration of exactly one
//! dispatch and puts back afterwards. Taking the behavior out makes
//! run-to-completion structural: nothing can re-enter a machine that is
//! away being dispatched.

use orbit_core::{require, Evt, Prio, Signal, NO_MARGIN};
use orbit_trace::records::ao;

use crate::fw;
use crate::pool;
use crate::queue::{EvtQueue, RawQueue};
use crate::time;

const MODULE: &str = "active";

/// Queue slot of a started active object.
pub(crate) struct AoSlot {
    pub(crate) queue: EvtQueue,
}

/// Object-safe behavior of an active object.
///
/// Implemented by hand for exotic machines, or through [`crate::impl_active!`]
/// for the common case of a type embedding an [`ActiveBase`] and an
/// [`orbit_hsm::Hsm`].
pub trait Active: Send {
    fn base(&self) -> &ActiveBase;
    fn base_mut(&mut self) -> &mut ActiveBase;

    /// Take the top-most initial transition. Called once, from [`start`].
    fn on_init(&mut self);

    /// Dispatch one event, run-to-completion.
    fn on_event(&mut self, e: &Evt);
}

/// Common per-object bookkeeping embedded in every active object.
pub struct ActiveBase {
    prio: Option<Prio>,
}

impl ActiveBase {
    pub const fn new() -> Self {
        ActiveBase { prio: None }
    }

    /// The unique priority assigned at [`start`].
    pub fn prio(&self) -> Prio {
        // only valid on a started active object
        require!(MODULE, 600, self.prio.is_some());
        self.prio.unwrap()
    }

    /// This object's posting handle.
    pub fn id(&self) -> AoId {
        AoId { prio: self.prio() }
    }

    /// Subscribe this object to a published signal.
    pub fn subscribe(&self, sig: Signal) {
        crate::pubsub::subscribe(self.prio(), sig);
    }

    /// Undo a [`ActiveBase::subscribe`].
    pub fn unsubscribe(&self, sig: Signal) {
        crate::pubsub::unsubscribe(self.prio(), sig);
    }

    /// Drop every subscription this object holds.
    pub fn unsubscribe_all(&self) {
        crate::pubsub::unsubscribe_all(self.prio());
    }

    /// Park an event this object cannot handle in its current state.
    /// Returns whether the deferral queue accepted it.
    pub fn defer(&self, dq: &RawQueue, e: Evt) -> bool {
        let ok = dq.post(e, 0).is_ok();
        let hook = fw::with(|fw| fw.trace.clone());
        fw::emit(
            &hook,
            ao::DEFER,
            &[self.prio().raw(), e.sig.raw() as u8, ok as u8],
        );
        ok
    }

    /// Bring one deferred event back, ahead of everything else queued.
    /// Returns whether there was an event to recall.
    pub fn recall(&self, dq: &RawQueue) -> bool {
        match dq.get() {
            Some(e) => {
                // the LIFO post takes its own reference...
                post_lifo(self.id(), e);
                if e.is_dynamic() {
                    // ...so the one the deferral queue held is surplus now
                    let hook = fw::with(|fw| {
                        let block = fw.block_mut(&e);
                        require!(MODULE, 210, block.ref_count >= 2);
                        block.ref_count -= 1;
                        fw.trace.clone()
                    });
                    fw::emit(&hook, ao::RECALL, &[self.prio().raw(), e.sig.raw() as u8]);
                } else {
                    let hook = fw::with(|fw| fw.trace.clone());
                    fw::emit(&hook, ao::RECALL, &[self.prio().raw(), e.sig.raw() as u8]);
                }
                true
            }
            None => false,
        }
    }

    /// Recycle every event still parked in a deferral queue. Returns how
    /// many were flushed.
    pub fn flush_deferred(&self, dq: &RawQueue) -> usize {
        let mut n = 0;
        while let Some(e) = dq.get() {
            pool::gc(e);
            n += 1;
        }
        n
    }
}

impl Default for ActiveBase {
    fn default() -> Self {
        Self::new()
    }
}

/// Posting handle for a started active object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AoId {
    pub(crate) prio: Prio,
}

impl AoId {
    pub fn prio(self) -> Prio {
        self.prio
    }

    /// Post FIFO; failure to deliver is fatal.
    pub fn post(self, e: Evt, sender: u8) {
        let _ = post_margin(self, e, NO_MARGIN, sender);
    }

    /// Post FIFO, requiring `margin` free slots to remain. Returns whether
    /// the event was delivered; an undeliverable event is recycled.
    pub fn post_margin(self, e: Evt, margin: u16, sender: u8) -> bool {
        post_margin(self, e, margin, sender)
    }

    /// Post to the front of the queue; overflow is fatal.
    pub fn post_lifo(self, e: Evt) {
        post_lifo(self, e)
    }

    /// Remove this object from scheduling: drop its subscriptions, disarm
    /// its time events, recycle its queued events, vacate its priority.
    /// The behavior's memory persists; the object cannot be restarted.
    pub fn stop(self) {
        crate::pubsub::unsubscribe_all(self.prio);
        let hook = fw::with(|fw| {
            time::disarm_owned(fw, self.prio);
            fw.behaviors[self.prio.index()] = None;
            fw.ready.remove(self.prio);
            fw.trace.clone()
        });
        crate::queue::flush(self.prio);
        fw::with(|fw| fw.slots[self.prio.index()] = None);
        fw::emit(&hook, ao::STOP, &[self.prio.raw()]);
    }
}

/// Register and start an active object at a vacant priority with a queue of
/// `queue_len + 1` events, and run its top-most initial transition.
pub fn start(ao: &'static mut dyn Active, prio: Prio, queue_len: u16) -> AoId {
    ao.base_mut().prio = Some(prio);

    let hook = fw::with(|fw| {
        // the priority level must be vacant
        require!(
            MODULE,
            100,
            fw.slots[prio.index()].is_none() && fw.behaviors[prio.index()].is_none()
        );
        fw.slots[prio.index()] = Some(AoSlot {
            queue: EvtQueue::new(queue_len),
        });
        fw.trace.clone()
    });

    // the initial transition runs outside any critical section; it may
    // post, publish, subscribe and arm freely
    ao.on_init();

    fw::with(|fw| fw.behaviors[prio.index()] = Some(ao));
    fw::emit(&hook, ao::START, &[prio.raw(), queue_len as u8]);
    AoId { prio }
}

pub(crate) fn post_margin(target: AoId, e: Evt, margin: u16, sender: u8) -> bool {
    let p = target.prio;
    let (delivered, n_free, hook) = fw::with(|fw| {
        // the target must be a started active object
        require!(MODULE, 102, fw.slots[p.index()].is_some());
        let ok = fw.slots[p.index()].as_ref().unwrap().queue.can_accept(margin);
        // a NO_MARGIN post must be deliverable
        require!(MODULE, 110, ok || margin != NO_MARGIN);
        if e.is_dynamic() {
            fw.evt_ref_inc(&e);
        }
        if ok {
            let slot = fw.slots[p.index()].as_mut().unwrap();
            if slot.queue.push_fifo(e) {
                fw.ready.insert(p);
            }
        }
        let n_free = fw.slots[p.index()].as_ref().unwrap().queue.n_free();
        (ok, n_free, fw.trace.clone())
    });

    if delivered {
        fw::emit(
            &hook,
            ao::POST,
            &[sender, p.raw(), e.sig.raw() as u8, e.pool_id, n_free as u8],
        );
    } else {
        fw::emit(
            &hook,
            ao::POST_ATTEMPT,
            &[sender, p.raw(), e.sig.raw() as u8, margin as u8],
        );
        // recycle the undeliverable event to avoid a leak
        pool::gc(e);
    }
    delivered
}

pub(crate) fn post_lifo(target: AoId, e: Evt) {
    let p = target.prio;
    let (n_free, hook) = fw::with(|fw| {
        require!(MODULE, 102, fw.slots[p.index()].is_some());
        if e.is_dynamic() {
            fw.evt_ref_inc(&e);
        }
        let slot = fw.slots[p.index()].as_mut().unwrap();
        if slot.queue.push_lifo(e) {
            fw.ready.insert(p);
        }
        (slot.queue.n_free(), fw.trace.clone())
    });
    fw::emit(
        &hook,
        ao::POST_LIFO,
        &[p.raw(), e.sig.raw() as u8, e.pool_id, n_free as u8],
    );
}

/// Take the next event out of an AO's queue; called by a kernel once the
/// ready set names the priority, so the queue cannot be empty.
pub(crate) fn queue_get(p: Prio) -> Evt {
    let (e, empty_now, hook) = fw::with(|fw| {
        let slot = fw.slots[p.index()].as_mut();
        require!(MODULE, 300, slot.is_some());
        let slot = slot.unwrap();
        let e = slot.queue.pop();
        // the ready set said there is an event
        require!(MODULE, 301, e.is_some());
        let empty_now = slot.queue.is_empty();
        if empty_now {
            fw.ready.remove(p);
        }
        (e.unwrap(), empty_now, fw.trace.clone())
    });
    let record = if empty_now { ao::GET_LAST } else { ao::GET };
    fw::emit(&hook, record, &[p.raw(), e.sig.raw() as u8, e.pool_id]);
    e
}

/// Implement [`Active`] and [`orbit_hsm::StateMachine`] for a type that
/// embeds an [`ActiveBase`] and an [`orbit_hsm::Hsm`] of itself.
#[macro_export]
macro_rules! impl_active {
    ($ty:ty { base: $base:ident, hsm: $hsm:ident }) => {
        impl $crate::hsm::StateMachine for $ty {
            fn hsm(&mut self) -> &mut $crate::hsm::Hsm<Self> {
                &mut self.$hsm
            }
        }

        impl $crate::active::Active for $ty {
            fn base(&self) -> &$crate::active::ActiveBase {
                &self.$base
            }

            fn base_mut(&mut self) -> &mut $crate::active::ActiveBase {
                &mut self.$base
            }

            fn on_init(&mut self) {
                <Self as $crate::hsm::StateMachine>::init(self);
            }

            fn on_event(&mut self, e: &$crate::Evt) {
                <Self as $crate::hsm::StateMachine>::dispatch(self, e);
            }
        }
    };
}
