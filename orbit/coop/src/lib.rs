#![doc = r#"# orbit-coop

The cooperative kernel: a single-stack, priority-based event loop with
run-to-completion semantics. Each cycle picks the highest-priority active
object whose queue holds events (and whose priority clears the scheduler
lock ceiling), dispatches exactly one event, and recycles it. When nothing
is ready, the loop calls the idle hook, the natural place for a
wait-for-interrupt or a host sleep.

Preemption never happens between events: an interrupt may post at any
time, but dispatching resumes only when the current run-to-completion step
finishes.
"#]
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

use core::cell::RefCell;

use critical_section::Mutex;
use orbit_af::kernel;
use orbit_core::Prio;
use orbit_trace::records::sched;

/// Called with nothing ready to run. On bare metal this is where the CPU
/// waits for the next interrupt; the hook must not dispatch events.
pub type IdleHook = fn();

#[derive(Default)]
struct Coop {
    idle: Option<IdleHook>,
    stop_code: Option<i32>,
    /// Previously scheduled priority, for the scheduler trace records.
    prev_prio: u8,
}

static COOP: Mutex<RefCell<Coop>> = Mutex::new(RefCell::new(Coop {
    idle: None,
    stop_code: None,
    prev_prio: 0,
}));

fn with_coop<R>(f: impl FnOnce(&mut Coop) -> R) -> R {
    critical_section::with(|cs| f(&mut COOP.borrow_ref_mut(cs)))
}

/// Install the idle hook.
pub fn set_idle_hook(hook: IdleHook) {
    with_coop(|k| k.idle = Some(hook));
}

/// Reset the kernel state (idle hook, pending stop). Companion of
/// `orbit_af::init`.
pub fn init() {
    with_coop(|k| *k = Coop::default());
}

/// Make [`run`] return `code` once the current run-to-completion step
/// finishes. Callable from handlers and from the idle hook.
pub fn stop(code: i32) {
    with_coop(|k| k.stop_code = Some(code));
}

/// Dispatch one event to the highest-priority ready active object.
/// Returns whether anything was dispatched.
pub fn dispatch_once() -> bool {
    match kernel::next_ready() {
        Some(p) => {
            note_next(p);
            let e = kernel::queue_get(p);
            let behavior = kernel::take_behavior(p);
            behavior.on_event(&e);
            kernel::put_behavior(p, behavior);
            orbit_af::gc(e);
            true
        }
        None => {
            note_idle();
            false
        }
    }
}

/// Drain every ready active object in priority order, then return.
/// The pump for tests and for embedding into a host event loop.
pub fn run_until_idle() {
    while dispatch_once() {}
}

/// The combined event and background loop. Returns the code passed to
/// [`stop`]; without one it loops forever, invoking the idle hook whenever
/// no active object is ready.
pub fn run() -> i32 {
    loop {
        if !dispatch_once() {
            if let Some(code) = with_coop(|k| k.stop_code.take()) {
                return code;
            }
            match with_coop(|k| k.idle) {
                Some(idle) => idle(),
                None => core::hint::spin_loop(),
            }
        } else if let Some(code) = with_coop(|k| k.stop_code.take()) {
            return code;
        }
    }
}

fn note_next(p: Prio) {
    let note = with_coop(|k| {
        if k.prev_prio != p.raw() {
            let prev = k.prev_prio;
            k.prev_prio = p.raw();
            Some(prev)
        } else {
            None
        }
    });
    if let Some(prev) = note {
        emit(sched::NEXT, &[p.raw(), prev]);
    }
}

fn note_idle() {
    let note = with_coop(|k| {
        if k.prev_prio != 0 {
            let prev = k.prev_prio;
            k.prev_prio = 0;
            Some(prev)
        } else {
            None
        }
    });
    if let Some(prev) = note {
        emit(sched::IDLE, &[prev]);
    }
}

fn emit(id: u8, data: &[u8]) {
    // scheduler records ride the framework's trace hook
    orbit_af::trace_emit(id, data);
}
