//! Fatal-assertion funnel.
//!
//! Contract violations (broken preconditions, exhausted no-margin
//! allocations, overflowed entry paths) are not recoverable errors: the
//! framework reports them once through [`raise`] and never returns. An
//! application may install a [`FaultHook`] to log the location and reset
//! the system; after the hook observes the fault, execution still ends in
//! a panic so the contract of "never returns" holds on every target.

use core::cell::Cell;

use critical_section::Mutex;

/// Observer invoked on a fatal fault, before the panic.
///
/// `module` is a stable module identifier and `id` a stable location id,
/// so the pair survives refactors and optimized builds.
pub type FaultHook = fn(module: &'static str, id: u16);

static HOOK: Mutex<Cell<Option<FaultHook>>> = Mutex::new(Cell::new(None));

/// Install the process-wide fault hook. The previous hook is returned.
pub fn set_hook(hook: FaultHook) -> Option<FaultHook> {
    critical_section::with(|cs| HOOK.borrow(cs).replace(Some(hook)))
}

/// Report a fatal contract violation and never return.
pub fn raise(module: &'static str, id: u16) -> ! {
    let hook = critical_section::with(|cs| HOOK.borrow(cs).get());
    if let Some(hook) = hook {
        hook(module, id);
    }
    panic!("fault in {module}:{id}");
}

/// Guard a precondition with a stable `(module, id)` location.
#[macro_export]
macro_rules! require {
    ($module:expr, $id:expr, $cond:expr) => {
        if !$cond {
            $crate::fault::raise($module, $id);
        }
    };
}
