//! Time events.
//!
//! A time event is created once, bound to a tick rate, a signal and a
//! delivery target, and then armed and disarmed any number of times. Armed
//! events of one rate form a singly linked list threaded by slot index; the
//! periodic tick source walks the list, decrements counters and posts the
//! signal of every event that expires.
//!
//! Disarming is lazy and safe from any context: it only clears the counter
//! and flags the event; the next tick unlinks it. This keeps the tick walk
//! the only writer of the list structure.

use orbit_core::{require, Evt, Prio, Signal, MAX_TICK_RATE, NO_MARGIN};
use orbit_trace::records::time;

use crate::active::{self, AoId};
use crate::fw::{self, Framework};
use crate::pubsub;

const MODULE: &str = "time";

/// Where an expired time event delivers its signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Post to one active object.
    Unicast(AoId),
    /// Publish to every subscriber of the signal.
    Broadcast,
}

pub(crate) struct TimeEvtSlot {
    pub(crate) sig: Signal,
    pub(crate) rate: u8,
    pub(crate) target: Target,
    /// Ticks to expiry; 0 means disarmed.
    pub(crate) ctr: u32,
    /// Reload value; 0 for one-shot.
    pub(crate) interval: u32,
    pub(crate) next: Option<u16>,
    /// Whether the slot sits in its rate's list (possibly pending unlink).
    pub(crate) linked: bool,
    pub(crate) was_disarmed: bool,
}

/// Handle to one statically registered time event.
#[derive(Debug, Clone, Copy)]
pub struct TimeEvt {
    idx: u16,
}

impl TimeEvt {
    /// Register a time event for tick `rate`, delivering `sig` to `target`
    /// on expiry. Time events are never deregistered.
    pub fn new(rate: u8, sig: Signal, target: Target) -> TimeEvt {
        require!(
            MODULE,
            100,
            (rate as usize) < MAX_TICK_RATE && !sig.is_reserved()
        );
        fw::with(|fw| {
            // the slot table is sized at compile time
            require!(MODULE, 101, !fw.tevts.is_full());
            let idx = fw.tevts.len() as u16;
            let _ = fw.tevts.push(TimeEvtSlot {
                sig,
                rate,
                target,
                ctr: 0,
                interval: 0,
                next: None,
                linked: false,
                was_disarmed: false,
            });
            TimeEvt { idx }
        })
    }

    /// Arm a disarmed time event to fire after `ctr` ticks, and every
    /// `interval` ticks after that if given. Arming an armed event is a
    /// contract violation; use [`TimeEvt::rearm`] to adjust one in flight.
    pub fn arm(&self, ctr: u32, interval: Option<u32>) {
        require!(MODULE, 201, ctr > 0);
        let hook = fw::with(|fw| {
            let slot = &mut fw.tevts[self.idx as usize];
            // must be disarmed
            require!(MODULE, 200, slot.ctr == 0);
            slot.ctr = ctr;
            slot.interval = interval.unwrap_or(0);
            slot.was_disarmed = false;
            if !slot.linked {
                slot.linked = true;
                let rate = slot.rate as usize;
                slot.next = fw.tevt_head[rate];
                fw.tevt_head[rate] = Some(self.idx);
            }
            fw.trace.clone()
        });
        fw::emit(&hook, time::ARM, &[self.idx as u8, ctr as u8]);
    }

    /// Disarm; idempotent and callable from any context. Returns whether
    /// the event was still armed.
    pub fn disarm(&self) -> bool {
        let (was_armed, hook) = fw::with(|fw| {
            let slot = &mut fw.tevts[self.idx as usize];
            let was_armed = slot.ctr != 0;
            slot.ctr = 0;
            slot.was_disarmed = true;
            (was_armed, fw.trace.clone())
        });
        fw::emit(&hook, time::DISARM, &[self.idx as u8, was_armed as u8]);
        was_armed
    }

    /// Update the countdown in place, arming the event if it was disarmed.
    /// Returns whether it was still armed.
    pub fn rearm(&self, ctr: u32, interval: Option<u32>) -> bool {
        require!(MODULE, 301, ctr > 0);
        let (was_armed, hook) = fw::with(|fw| {
            let slot = &mut fw.tevts[self.idx as usize];
            let was_armed = slot.ctr != 0;
            slot.ctr = ctr;
            slot.interval = interval.unwrap_or(0);
            slot.was_disarmed = false;
            if !slot.linked {
                slot.linked = true;
                let rate = slot.rate as usize;
                slot.next = fw.tevt_head[rate];
                fw.tevt_head[rate] = Some(self.idx);
            }
            (was_armed, fw.trace.clone())
        });
        fw::emit(&hook, time::REARM, &[self.idx as u8, was_armed as u8]);
        was_armed
    }

    /// Remaining ticks to expiry; 0 when disarmed.
    pub fn ctr(&self) -> u32 {
        fw::with(|fw| fw.tevts[self.idx as usize].ctr)
    }
}

/// Lazily disarm every unicast time event owned by the given priority.
/// Runs inside the caller's critical section; part of stopping an AO.
pub(crate) fn disarm_owned(fw: &mut Framework, prio: Prio) {
    for slot in fw.tevts.iter_mut() {
        if let Target::Unicast(id) = slot.target {
            if id.prio == prio && slot.ctr != 0 {
                slot.ctr = 0;
                slot.was_disarmed = true;
            }
        }
    }
}

/// Process one tick of the given rate: age every armed time event of that
/// rate, deliver the expired ones, unlink the dead ones.
///
/// Called from the periodic tick source (interrupt or timer task);
/// `sender` identifies it in trace records.
pub fn tick(rate: u8, sender: u8) {
    require!(MODULE, 400, (rate as usize) < MAX_TICK_RATE);

    // phase one, inside the critical section: age the list, reload the
    // periodic events, unlink the expired one-shots and the lazily
    // disarmed, and collect what fired
    let (fired, hook) = fw::with(|fw| {
        let mut fired: alloc::vec::Vec<(Target, Signal, u16)> = alloc::vec::Vec::new();
        let mut prev: Option<u16> = None;
        let mut cur = fw.tevt_head[rate as usize];

        while let Some(i) = cur {
            let next = fw.tevts[i as usize].next;
            let slot = &mut fw.tevts[i as usize];

            if slot.ctr == 0 {
                // disarmed since the last tick; unlink now
                slot.linked = false;
                slot.next = None;
                match prev {
                    None => fw.tevt_head[rate as usize] = next,
                    Some(p) => fw.tevts[p as usize].next = next,
                }
            } else {
                slot.ctr -= 1;
                if slot.ctr == 0 {
                    if slot.interval != 0 {
                        slot.ctr = slot.interval;
                        prev = Some(i);
                    } else {
                        // one-shot: retire from the list
                        slot.linked = false;
                        slot.next = None;
                        slot.was_disarmed = true;
                        match prev {
                            None => fw.tevt_head[rate as usize] = next,
                            Some(p) => fw.tevts[p as usize].next = next,
                        }
                    }
                    fired.push((fw.tevts[i as usize].target, fw.tevts[i as usize].sig, i));
                } else {
                    prev = Some(i);
                }
            }
            cur = next;
        }
        (fired, fw.trace.clone())
    });

    // phase two, outside: deliver
    for (target, sig, idx) in fired {
        fw::emit(&hook, time::FIRE, &[idx as u8, sig.raw() as u8, sender]);
        match target {
            Target::Unicast(id) => {
                let _ = active::post_margin(id, Evt::of(sig), NO_MARGIN, sender);
            }
            Target::Broadcast => pubsub::publish(Evt::of(sig)),
        }
    }
}
