//! The framework value and its critical-section gate.
//!
//! Exactly one [`Framework`] exists per process, behind a
//! `critical_section::Mutex`. Every core operation enters the critical
//! section once, mutates, and leaves before doing anything of unbounded
//! duration (dispatching, tracing, recursing into another operation).

use core::cell::RefCell;

use critical_section::Mutex;
use orbit_core::{PrioSet, MAX_ACTIVE, MAX_POOL, MAX_TICK_RATE, MAX_TIME_EVENTS};
use orbit_trace::TraceHook;

use crate::active::{Active, AoSlot};
use crate::pool::EvtPool;
use crate::time::TimeEvtSlot;

const SLOTS: usize = MAX_ACTIVE as usize + 1;

pub(crate) struct Framework {
    /// Registered event pools, in strictly ascending block size.
    pub(crate) pools: heapless::Vec<EvtPool, MAX_POOL>,
    /// Per-priority queue slots; index 0 is unused.
    pub(crate) slots: [Option<AoSlot>; SLOTS],
    /// Per-priority behavior objects, taken out for the duration of a
    /// dispatch so run-to-completion is structural.
    pub(crate) behaviors: [Option<&'static mut dyn Active>; SLOTS],
    /// Priorities with a non-empty queue.
    pub(crate) ready: PrioSet,
    /// One subscriber set per signal in `0..max_pub_signal`.
    pub(crate) subscribers: alloc::vec::Vec<PrioSet>,
    pub(crate) max_pub_signal: u16,
    /// Time-event slots; armed ones are threaded into per-rate lists.
    pub(crate) tevts: heapless::Vec<TimeEvtSlot, MAX_TIME_EVENTS>,
    pub(crate) tevt_head: [Option<u16>; MAX_TICK_RATE],
    /// Scheduler-lock ceiling; 0 when unlocked.
    pub(crate) lock_ceiling: u8,
    pub(crate) trace: Option<TraceHook>,
}

impl Framework {
    pub(crate) const fn new() -> Self {
        const NO_SLOT: Option<AoSlot> = None;
        const NO_BEHAVIOR: Option<&'static mut dyn Active> = None;
        Framework {
            pools: heapless::Vec::new(),
            slots: [NO_SLOT; SLOTS],
            behaviors: [NO_BEHAVIOR; SLOTS],
            ready: PrioSet::new(),
            subscribers: alloc::vec::Vec::new(),
            max_pub_signal: 0,
            tevts: heapless::Vec::new(),
            tevt_head: [None; MAX_TICK_RATE],
            lock_ceiling: 0,
            trace: None,
        }
    }
}

static FW: Mutex<RefCell<Framework>> = Mutex::new(RefCell::new(Framework::new()));

/// Run `f` on the framework inside the critical section.
pub(crate) fn with<R>(f: impl FnOnce(&mut Framework) -> R) -> R {
    critical_section::with(|cs| f(&mut FW.borrow_ref_mut(cs)))
}

/// Borrow the framework inside an already-entered critical section, for
/// operations that must also touch state of their own without leaving it.
pub(crate) fn borrow_mut(cs: critical_section::CriticalSection<'_>) -> core::cell::RefMut<'_, Framework> {
    FW.borrow_ref_mut(cs)
}

/// Emit a trace record through a hook cloned out of the critical section.
/// Backend failures are the backend's problem, not the caller's.
pub(crate) fn emit(hook: &Option<TraceHook>, id: u8, data: &[u8]) {
    if let Some(hook) = hook {
        let _ = hook(id, data, true);
    }
}
