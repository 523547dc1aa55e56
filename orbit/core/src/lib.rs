#![doc = r#"# orbit-core

Foundation types shared by every crate of the orbit real-time framework:
signals and event handles, active-object priorities with the ready-set
bitmask, the framework error enum, and the fault funnel for contract
violations.

## Module overview
- [`signal`] – signal identifiers and the reserved range.
- [`event`]  – copyable event handles and the static/dynamic split.
- [`prio`]   – validated priorities and the O(1) priority set.
- [`fault`]  – fatal-assertion funnel with a pluggable hook.
"#]
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

#[cfg(test)]
extern crate std;

use core::fmt;

pub mod event;
pub mod fault;
pub mod prio;
pub mod signal;

pub use event::Evt;
pub use prio::{Prio, PrioSet};
pub use signal::Signal;

/// Highest usable active-object priority (priorities run `1..=MAX_ACTIVE`).
pub const MAX_ACTIVE: u8 = 64;

/// Maximum number of registered event pools.
pub const MAX_POOL: usize = 15;

/// Number of independent tick rates served by the time-event lists.
pub const MAX_TICK_RATE: usize = 4;

/// Maximum nesting depth of a state hierarchy, including the leaf.
pub const MAX_NEST_DEPTH: usize = 6;

/// Capacity of the time-event slot table.
pub const MAX_TIME_EVENTS: usize = 64;

/// Margin value meaning "the operation must succeed or it is a fatal fault".
pub const NO_MARGIN: u16 = u16::MAX;

/// Result type used by the fallible (non-fatal) framework operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors reported by operations where the caller is expected to decide.
///
/// Contract violations never surface here; they go through [`fault::raise`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A bounded queue cannot take the event within the requested margin.
    QueueFull,
    /// Priority outside `1..=MAX_ACTIVE`.
    InvalidPriority,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::QueueFull => write!(f, "event queue is full"),
            Error::InvalidPriority => write!(f, "invalid priority level"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Error::QueueFull => defmt::write!(fmt, "QueueFull"),
            Error::InvalidPriority => defmt::write!(fmt, "InvalidPriority"),
        }
    }
}
