#![doc = r#"# orbit-trace

Software-tracing interface of the orbit framework. The framework emits
fixed-format records at its instrumentation points; a backend supplied by
the application decides what to do with them (buffer, stream, drop).

The backend may observe, it must not mutate: hooks run outside critical
sections, after the instrumented operation has already committed, and the
record payload is a copy. A missing hook costs one `Option` check per
instrumentation point.
"#]
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;
#[cfg(test)]
extern crate std;

use alloc::sync::Arc;

use thiserror::Error;

/// Failure reported by a trace backend.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TraceError {
    /// The backend sink is gone (closed socket, detached host, full buffer
    /// in drop-newest mode).
    #[error("trace backend unavailable")]
    Backend,
    /// The record payload exceeds what the backend can frame.
    #[error("trace record too long")]
    RecordTooLong,
}

pub type TraceResult = Result<(), TraceError>;

/// Record sink: `(record id, payload, with timestamp)`.
///
/// The hook is shared by every emitter in the framework and may be called
/// from any context except inside a critical section.
pub type TraceHook = Arc<dyn Fn(u8, &[u8], bool) -> TraceResult + Send + Sync>;

/// Predefined record identifiers, grouped by subsystem.
pub mod records {
    /// Active-object queue operations.
    pub mod ao {
        pub const POST: u8 = 1;
        pub const POST_ATTEMPT: u8 = 2;
        pub const POST_LIFO: u8 = 3;
        pub const GET: u8 = 4;
        pub const GET_LAST: u8 = 5;
        pub const SUBSCRIBE: u8 = 6;
        pub const UNSUBSCRIBE: u8 = 7;
        pub const DEFER: u8 = 8;
        pub const RECALL: u8 = 9;
        pub const START: u8 = 10;
        pub const STOP: u8 = 11;
    }

    /// Event pool operations.
    pub mod evt {
        pub const NEW: u8 = 16;
        pub const NEW_ATTEMPT: u8 = 17;
        pub const GC: u8 = 18;
        pub const GC_ATTEMPT: u8 = 19;
        pub const NEW_REF: u8 = 20;
        pub const DELETE_REF: u8 = 21;
        pub const POOL_INIT: u8 = 22;
    }

    /// Time-event operations.
    pub mod time {
        pub const ARM: u8 = 32;
        pub const DISARM: u8 = 33;
        pub const REARM: u8 = 34;
        pub const FIRE: u8 = 35;
    }

    /// Publish-subscribe operations.
    pub mod ps {
        pub const PUBLISH: u8 = 48;
    }

    /// Scheduler decisions.
    pub mod sched {
        pub const LOCK: u8 = 50;
        pub const UNLOCK: u8 = 51;
        pub const NEXT: u8 = 52;
        pub const IDLE: u8 = 53;
    }
}
