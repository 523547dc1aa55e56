#![doc = r#"# orbit-hsm

Hierarchical state-machine engine with UML-statechart semantics: entry and
exit actions, initial transitions, guarded transitions, transition to
history, and a single-rooted state hierarchy ending at [`top`].

A state is a plain handler function keyed on the event signal. A machine
embeds an [`Hsm`] holding the stable state and the scratch slot handlers
write through their return value; implementing [`StateMachine`] gives a type
the full engine: [`StateMachine::init`], [`StateMachine::dispatch`],
[`StateMachine::is_in`] and [`StateMachine::child_state`].

```ignore
struct Blinky {
    hsm: Hsm<Blinky>,
}

fn off(me: &mut Blinky, e: &Evt) -> Action<Blinky> {
    match e.sig {
        sig if sig == TIMEOUT => tran(on),
        _ => super_state(top),
    }
}
```
"#]
#![no_std]
#![forbid(unsafe_code)]

#[cfg(test)]
extern crate std;

use core::fmt;

use orbit_core::{Evt, Signal};

mod engine;

#[cfg(test)]
mod tests;

/// State-handler function: a pure dispatcher keyed on the event signal.
pub type StateHandler<T> = fn(&mut T, &Evt) -> Action<T>;

/// Outcome of one state-handler invocation.
pub enum Action<T> {
    /// The event was consumed at this level (or an entry/exit ran).
    Handled,
    /// A guard rejected the event; the engine retries the superstate.
    Unhandled,
    /// The event is silently discarded; returned by [`top`] for everything.
    Ignored,
    /// The handler does not know this signal; its superstate might.
    Super(StateHandler<T>),
    /// A state transition to the given target.
    Tran(StateHandler<T>),
    /// A transition to a previously recorded history state.
    TranHist(StateHandler<T>),
}

impl<T> Clone for Action<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Action<T> {}

impl<T> fmt::Debug for Action<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Handled => "Handled",
            Action::Unhandled => "Unhandled",
            Action::Ignored => "Ignored",
            Action::Super(_) => "Super",
            Action::Tran(_) => "Tran",
            Action::TranHist(_) => "TranHist",
        };
        f.write_str(name)
    }
}

/// The ultimate root of every state hierarchy; ignores all events.
pub fn top<T>(_me: &mut T, _e: &Evt) -> Action<T> {
    Action::Ignored
}

/// Handler return helpers, mirroring the statechart vocabulary.
pub fn handled<T>() -> Action<T> {
    Action::Handled
}

pub fn unhandled<T>() -> Action<T> {
    Action::Unhandled
}

pub fn ignored<T>() -> Action<T> {
    Action::Ignored
}

pub fn tran<T>(target: StateHandler<T>) -> Action<T> {
    Action::Tran(target)
}

pub fn tran_hist<T>(history: StateHandler<T>) -> Action<T> {
    Action::TranHist(history)
}

pub fn super_state<T>(parent: StateHandler<T>) -> Action<T> {
    Action::Super(parent)
}

/// State-machine instance data: the stable configuration and the scratch
/// slot the engine threads superstate probes and transition targets through.
///
/// Invariant: outside of [`StateMachine::dispatch`], `state == temp`.
pub struct Hsm<T> {
    pub(crate) state: StateHandler<T>,
    pub(crate) temp: StateHandler<T>,
}

impl<T> Hsm<T> {
    /// A machine that will take `initial` as its top-most initial transition.
    pub const fn new(initial: StateHandler<T>) -> Self {
        Hsm {
            state: top::<T>,
            temp: initial,
        }
    }

    /// The current stable state handler.
    pub fn current(&self) -> StateHandler<T> {
        self.state
    }
}

#[cfg(feature = "defmt")]
impl<T> defmt::Format for Hsm<T> {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Hsm");
    }
}

/// Types that embed an [`Hsm`] and want the engine's provided behavior.
pub trait StateMachine: Sized {
    /// Access the embedded machine instance data.
    fn hsm(&mut self) -> &mut Hsm<Self>;

    /// Execute the top-most initial transition and drill down into the
    /// hierarchy. Must be called exactly once, before the first `dispatch`.
    fn init(&mut self) {
        engine::init(self);
    }

    /// Dispatch one event as a single run-to-completion step.
    fn dispatch(&mut self, e: &Evt) {
        engine::dispatch(self, e);
    }

    /// Whether the machine is in `state`, directly or via a substate.
    fn is_in(&mut self, state: StateHandler<Self>) -> bool {
        engine::is_in(self, state)
    }

    /// The child of `parent` that is an ancestor of (or is) the current
    /// state. Supports shallow-history bookkeeping in exit actions.
    fn child_state(&mut self, parent: StateHandler<Self>) -> StateHandler<Self> {
        engine::child_state(self, parent)
    }

    /// The current stable state handler.
    fn current_state(&mut self) -> StateHandler<Self> {
        self.hsm().state
    }
}

/// Compare two state handlers for identity.
///
/// Function-pointer comparison identifies the state, not the code; distinct
/// states must use distinct handler functions.
#[inline]
pub(crate) fn same<T>(a: StateHandler<T>, b: StateHandler<T>) -> bool {
    a as usize == b as usize
}

pub(crate) const RESERVED: [Evt; 4] = [
    Evt::of(Signal::EMPTY),
    Evt::of(Signal::ENTRY),
    Evt::of(Signal::EXIT),
    Evt::of(Signal::INIT),
];
