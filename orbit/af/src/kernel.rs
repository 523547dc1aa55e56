//! The interface a kernel implementation drives.
//!
//! A kernel's event loop repeats one cycle: ask [`next_ready`] for the
//! highest-priority active object above the scheduler-lock ceiling, take
//! its behavior out with [`take_behavior`], pull one event with
//! [`queue_get`], dispatch, garbage-collect the event, and put the
//! behavior back. While the behavior is out, posting into the object's
//! queue keeps working; dispatching it again is impossible.

use orbit_core::{require, Evt, Prio};

use crate::active::{self, Active};
use crate::fw;

const MODULE: &str = "kernel";

/// Highest-priority ready active object above the lock ceiling, if any.
pub fn next_ready() -> Option<Prio> {
    fw::with(|fw| {
        fw.ready
            .find_max()
            .filter(|p| p.raw() > fw.lock_ceiling)
    })
}

/// Take the behavior of the AO at `p` for one dispatch. Faults if it is
/// already out or the AO never started.
pub fn take_behavior(p: Prio) -> &'static mut dyn Active {
    let b = fw::with(|fw| fw.behaviors[p.index()].take());
    // a ready AO must have its behavior in place
    require!(MODULE, 320, b.is_some());
    b.unwrap()
}

/// Return a behavior after its dispatch. Dropped silently when the AO
/// stopped itself during the dispatch.
pub fn put_behavior(p: Prio, b: &'static mut dyn Active) {
    fw::with(|fw| {
        if fw.slots[p.index()].is_some() {
            fw.behaviors[p.index()] = Some(b);
        }
    });
}

/// Pull the next event for the AO at `p`; the ready set must name `p`.
pub fn queue_get(p: Prio) -> Evt {
    active::queue_get(p)
}
