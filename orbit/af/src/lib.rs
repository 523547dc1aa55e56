#![doc = r#"# orbit-af

The active-object framework: everything between the state-machine engine
and a kernel. It owns the event memory model (tiered fixed-block pools with
reference counting and automatic recycling), the per-object event queues,
the priority-indexed registry of active objects, publish-subscribe
multicast, time events, and the scheduler-lock ceiling.

All shared state lives in one framework value behind a critical section;
every mutating operation is a short, constant-time region and never blocks.
Posting and publishing are safe from interrupt context.

## Module overview
- [`pool`]   – event pools, allocation, garbage collection, references.
- [`queue`]  – the bounded front+ring event queue and [`queue::RawQueue`].
- [`active`] – active objects: registration, posting, deferral.
- [`pubsub`] – signal subscription and multicast publish.
- [`time`]   – time events and the tick processing.
- [`sched`]  – the priority-ceiling scheduler lock.
- [`kernel`] – the interface a kernel implementation drives.
"#]
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

pub mod active;
mod fw;
pub mod kernel;
pub mod pool;
pub mod pubsub;
pub mod queue;
pub mod sched;
pub mod time;

pub use orbit_core::{
    Error, Evt, Prio, PrioSet, Result, Signal, MAX_ACTIVE, MAX_NEST_DEPTH, MAX_POOL,
    MAX_TICK_RATE, MAX_TIME_EVENTS, NO_MARGIN,
};
pub use orbit_hsm as hsm;
pub use orbit_trace::{TraceHook, TraceResult};

pub use active::{start, Active, ActiveBase, AoId};
pub use pool::{delete_ref, gc, new_evt, new_evt_with, new_ref, pool_init};
pub use pubsub::{ps_init, publish};
pub use time::{tick, Target, TimeEvt};

/// Reset the framework to its power-on state: no pools, no active objects,
/// no subscriptions, no armed time events, scheduler unlocked.
///
/// Must run before any other framework call and completes before the first
/// interrupt may post.
pub fn init() {
    fw::with(|fw| *fw = fw::Framework::new());
}

/// Install the trace hook observing framework instrumentation points.
pub fn set_trace_hook(hook: TraceHook) {
    fw::with(|fw| fw.trace = Some(hook));
}

/// Remove the trace hook.
pub fn clear_trace_hook() {
    fw::with(|fw| fw.trace = None);
}

/// Emit a record through the framework's trace hook. Kernel crates use
/// this for their scheduler records; a missing hook makes it a no-op.
pub fn trace_emit(id: u8, data: &[u8]) {
    let hook = fw::with(|fw| fw.trace.clone());
    fw::emit(&hook, id, data);
}
