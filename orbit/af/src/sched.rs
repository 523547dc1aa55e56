//! Priority-ceiling scheduler lock.
//!
//! Locking raises the ceiling; while it is up, no active object at or
//! below the ceiling is scheduled, even if ready. Unlocking restores the
//! previous ceiling, so nested locks compose as long as each unlock gets
//! the status its lock returned.

use orbit_core::Prio;
use orbit_trace::records::sched;

use crate::fw;

/// Token returned by [`lock`], fed back to [`unlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedStatus {
    /// The lock raised the ceiling; holds the ceiling to restore.
    Locked(u8),
    /// The ceiling was already at or above the requested level.
    Unlocked,
}

/// Raise the scheduler-lock ceiling to `ceiling`.
pub fn lock(ceiling: Prio) -> SchedStatus {
    let (status, hook) = fw::with(|fw| {
        if ceiling.raw() > fw.lock_ceiling {
            let prev = fw.lock_ceiling;
            fw.lock_ceiling = ceiling.raw();
            (SchedStatus::Locked(prev), fw.trace.clone())
        } else {
            (SchedStatus::Unlocked, None)
        }
    });
    if let SchedStatus::Locked(prev) = status {
        fw::emit(&hook, sched::LOCK, &[prev, ceiling.raw()]);
    }
    status
}

/// Restore the ceiling a previous [`lock`] displaced.
pub fn unlock(status: SchedStatus) {
    if let SchedStatus::Locked(prev) = status {
        let (restored, hook) = fw::with(|fw| {
            if fw.lock_ceiling > prev {
                let current = fw.lock_ceiling;
                fw.lock_ceiling = prev;
                (Some(current), fw.trace.clone())
            } else {
                (None, None)
            }
        });
        if let Some(current) = restored {
            fw::emit(&hook, sched::UNLOCK, &[current, prev]);
        }
    }
}

/// The current ceiling; 0 when the scheduler is unlocked.
pub fn ceiling() -> u8 {
    fw::with(|fw| fw.lock_ceiling)
}
