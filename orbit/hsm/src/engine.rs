//! Dispatch, initialization and the hierarchical transition algorithm.
//!
//! The algorithm walks the hierarchy exclusively through handler calls: a
//! probe with [`Signal::EMPTY`] makes a handler report its superstate, so no
//! parallel table of parents exists. Entry paths are bounded by
//! [`MAX_NEST_DEPTH`], which is asserted.

use orbit_core::{require, Signal, MAX_NEST_DEPTH};

use crate::{same, Action, StateHandler, StateMachine, RESERVED};

const MODULE: &str = "hsm";

/// Invoke `state` with the original event, recording superstates and
/// transition targets in the scratch slot.
fn call<T: StateMachine>(me: &mut T, state: StateHandler<T>, e: &orbit_core::Evt) -> Action<T> {
    let r = state(me, e);
    match r {
        Action::Super(parent) => me.hsm().temp = parent,
        Action::Tran(target) | Action::TranHist(target) => me.hsm().temp = target,
        _ => {}
    }
    r
}

/// Invoke `state` with one of the reserved engine events.
fn trig<T: StateMachine>(me: &mut T, state: StateHandler<T>, sig: Signal) -> Action<T> {
    call(me, state, &RESERVED[sig.raw() as usize])
}

fn enter<T: StateMachine>(me: &mut T, state: StateHandler<T>) {
    let _ = trig(me, state, Signal::ENTRY);
}

/// Run the exit action of `state` and leave its superstate in the scratch
/// slot, whether or not the exit action was handled.
fn exit_state<T: StateMachine>(me: &mut T, state: StateHandler<T>) {
    if matches!(trig(me, state, Signal::EXIT), Action::Handled) {
        let _ = trig(me, state, Signal::EMPTY);
    }
}

/// Top-most initial transition plus the drill into the hierarchy.
pub(crate) fn init<T: StateMachine>(me: &mut T) {
    let mut t = me.hsm().state;

    // the constructor must have run and the initial transition not yet taken
    require!(MODULE, 200, same(t, crate::top::<T>));

    let initial = me.hsm().temp;
    let r = call(me, initial, &RESERVED[Signal::INIT.raw() as usize]);

    // the top-most initial transition must be taken
    require!(MODULE, 210, matches!(r, Action::Tran(_)));

    loop {
        let target = me.hsm().temp;
        let mut path: [StateHandler<T>; MAX_NEST_DEPTH] = [target; MAX_NEST_DEPTH];
        let mut ip: usize = 0;

        let _ = trig(me, target, Signal::EMPTY);
        while !same(me.hsm().temp, t) {
            ip += 1;
            require!(MODULE, 220, ip < MAX_NEST_DEPTH);
            path[ip] = me.hsm().temp;
            let probed = path[ip];
            let _ = trig(me, probed, Signal::EMPTY);
        }
        me.hsm().temp = path[0];

        // retrace the entry path outermost-first
        let mut i = ip as isize;
        while i >= 0 {
            enter(me, path[i as usize]);
            i -= 1;
        }

        t = path[0];
        if !matches!(trig(me, t, Signal::INIT), Action::Tran(_)) {
            break;
        }
    }

    me.hsm().state = t;
    me.hsm().temp = t;
}

/// One run-to-completion step.
pub(crate) fn dispatch<T: StateMachine>(me: &mut T, e: &orbit_core::Evt) {
    let mut t = me.hsm().state;

    // the state configuration must be stable
    require!(MODULE, 400, same(t, me.hsm().temp));

    // process the event hierarchically, bubbling through superstates
    let mut s;
    let mut r;
    loop {
        s = me.hsm().temp;
        r = call(me, s, e);
        if matches!(r, Action::Unhandled) {
            // unhandled due to a guard; consult the superstate
            r = trig(me, s, Signal::EMPTY);
        }
        if !matches!(r, Action::Super(_)) {
            break;
        }
    }

    if matches!(r, Action::Tran(_) | Action::TranHist(_)) {
        let mut path: [StateHandler<T>; MAX_NEST_DEPTH] = [t; MAX_NEST_DEPTH];
        path[0] = me.hsm().temp; // transition target
        path[1] = t; // current state
        path[2] = s; // transition source

        // exit from the current state up to (but excluding) the source
        while !same(t, s) {
            exit_state(me, t);
            t = me.hsm().temp;
        }

        let mut ip = transition_path(me, &mut path);

        // execute entry actions outermost-first
        while ip >= 0 {
            enter(me, path[ip as usize]);
            ip -= 1;
        }
        t = path[0];
        me.hsm().temp = t;

        // drill into the target hierarchy with initial transitions
        while matches!(trig(me, t, Signal::INIT), Action::Tran(_)) {
            let mut ip: usize = 0;
            path[0] = me.hsm().temp;
            let probed = path[0];
            let _ = trig(me, probed, Signal::EMPTY);
            while !same(me.hsm().temp, t) {
                ip += 1;
                require!(MODULE, 410, ip < MAX_NEST_DEPTH);
                path[ip] = me.hsm().temp;
                let probed = path[ip];
                let _ = trig(me, probed, Signal::EMPTY);
            }
            me.hsm().temp = path[0];

            let mut i = ip as isize;
            while i >= 0 {
                enter(me, path[i as usize]);
                i -= 1;
            }
            t = path[0];
        }
    }

    me.hsm().state = t;
    me.hsm().temp = t;
}

/// Compute the entry path from the least common ancestor down to the target
/// already stored in `path[0]`, exiting the source as a side effect where
/// the statechart semantics demand it. Returns the index of the outermost
/// entry in `path`, or -1 when nothing is to be entered.
fn transition_path<T: StateMachine>(
    me: &mut T,
    path: &mut [StateHandler<T>; MAX_NEST_DEPTH],
) -> isize {
    let mut ip: isize = -1;
    let mut t = path[0];
    let s = path[2];

    // (a) source == target: transition to self
    if same(s, t) {
        exit_state(me, s);
        return 0;
    }

    let _ = trig(me, t, Signal::EMPTY);
    t = me.hsm().temp;

    // (b) source == superstate of target
    if same(s, t) {
        return 0;
    }

    let _ = trig(me, s, Signal::EMPTY);

    // (c) superstate of source == superstate of target
    if same(me.hsm().temp, t) {
        exit_state(me, s);
        return 0;
    }

    // (d) superstate of source == target
    if same(me.hsm().temp, path[0]) {
        exit_state(me, s);
        return ip;
    }

    // (e) source == an ancestor of the target: record the entry path while
    // climbing from the target
    let mut lca_found = false;
    ip = 1;
    path[1] = t; // superstate of target
    t = me.hsm().temp; // superstate of source

    let mut r = trig(me, path[1], Signal::EMPTY);
    while matches!(r, Action::Super(_)) {
        ip += 1;
        require!(MODULE, 510, (ip as usize) < MAX_NEST_DEPTH);
        path[ip as usize] = me.hsm().temp;
        if same(me.hsm().temp, s) {
            lca_found = true;
            ip -= 1; // do not enter the source
            r = Action::Handled;
        } else {
            let probed = me.hsm().temp;
            r = trig(me, probed, Signal::EMPTY);
        }
    }
    if lca_found {
        return ip;
    }

    // (f) superstate of source == an ancestor of the target
    require!(MODULE, 520, (ip as usize) < MAX_NEST_DEPTH);
    exit_state(me, s);

    let mut iq = ip;
    while iq >= 0 {
        if same(t, path[iq as usize]) {
            return iq - 1; // do not enter the LCA
        }
        iq -= 1;
    }

    // (g) climb the source's ancestors, matching each against the recorded
    // target path; the first match is the LCA
    loop {
        exit_state(me, t);
        t = me.hsm().temp;
        let mut iq = ip;
        while iq >= 0 {
            if same(t, path[iq as usize]) {
                return iq - 1; // do not enter the LCA
            }
            iq -= 1;
        }
    }
}

/// Bottom-up scan for `state` in the active configuration.
pub(crate) fn is_in<T: StateMachine>(me: &mut T, state: StateHandler<T>) -> bool {
    // the state configuration must be stable
    require!(MODULE, 600, same(me.hsm().temp, me.hsm().state));

    let mut found = false;
    loop {
        if same(me.hsm().temp, state) {
            found = true;
            break;
        }
        let probed = me.hsm().temp;
        if !matches!(trig(me, probed, Signal::EMPTY), Action::Super(_)) {
            break; // reached top
        }
    }

    let stable = me.hsm().state;
    me.hsm().temp = stable;
    found
}

/// The child of `parent` on the path to the current state.
pub(crate) fn child_state<T: StateMachine>(
    me: &mut T,
    parent: StateHandler<T>,
) -> StateHandler<T> {
    let mut child = me.hsm().state;
    let mut found = false;

    let stable = me.hsm().state;
    me.hsm().temp = stable;
    loop {
        let current = me.hsm().temp;
        if same(current, parent) {
            found = true;
            break;
        }
        child = current;
        if !matches!(trig(me, current, Signal::EMPTY), Action::Super(_)) {
            break; // reached top
        }
    }
    me.hsm().temp = stable;

    // the child must be confirmed
    require!(MODULE, 810, found);
    child
}
