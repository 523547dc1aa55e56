//! Shared test plumbing: the framework state is process-global, so every
//! test takes the serial guard and starts from a fresh framework.

use std::sync::{Mutex, MutexGuard, PoisonError};

static SERIAL: Mutex<()> = Mutex::new(());

pub fn fresh() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
    orbit_af::init();
    guard
}
