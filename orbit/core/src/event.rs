//! Event handles.
//!
//! An [`Evt`] is a small copyable handle standing in for the "event pointer"
//! of the classic active-object model. A static event carries only its
//! signal (`pool_id == 0`) and is never reference-counted or recycled. A
//! dynamic event names the pool block that holds its header and payload;
//! the reference count lives in that block, not in the handle, so copies of
//! the handle share one count.

use core::fmt;

use crate::signal::Signal;

/// Copyable event handle.
///
/// Invariant: `pool_id == 0` marks a static event; `pool_id > 0` refers to
/// block `slot` of pool index `pool_id - 1`, to which the event must be
/// returned when its reference count drops to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evt {
    /// Signal dispatched to the consuming state machine.
    pub sig: Signal,
    /// One-based pool identifier; zero for static events.
    pub pool_id: u8,
    /// Block index within the owning pool; unused for static events.
    pub slot: u16,
}

impl Evt {
    /// A static event: built-in, immutable, never garbage-collected.
    pub const fn of(sig: Signal) -> Self {
        Evt {
            sig,
            pool_id: 0,
            slot: 0,
        }
    }

    /// Handle for a pool-allocated event. Used by the framework allocator.
    pub const fn from_pool(sig: Signal, pool_id: u8, slot: u16) -> Self {
        Evt { sig, pool_id, slot }
    }

    pub const fn is_dynamic(&self) -> bool {
        self.pool_id != 0
    }
}

impl fmt::Display for Evt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dynamic() {
            write!(f, "Evt({}, pool {}/{})", self.sig, self.pool_id, self.slot)
        } else {
            write!(f, "Evt({}, static)", self.sig)
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Evt {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Evt({}, pool {})", self.sig, self.pool_id);
    }
}
