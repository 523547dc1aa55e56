//! Statechart semantics of the dispatch engine, exercised through the
//! classic six-state test machine (`s`, `s1`, `s11`, `s2`, `s21`, `s211`)
//! with signals `A..=I`. Every entry/exit action appends to a trace log and
//! the tests compare the observed traces against UML statechart semantics.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::vec::Vec;

use orbit_core::{Evt, Signal};

use crate::{
    handled, same, super_state, top, tran, tran_hist, unhandled, Action, Hsm, StateHandler,
    StateMachine,
};

const A: Signal = Signal::new(4);
const B: Signal = Signal::new(5);
const C: Signal = Signal::new(6);
const D: Signal = Signal::new(7);
const E: Signal = Signal::new(8);
const F: Signal = Signal::new(9);
const G: Signal = Signal::new(10);
const H: Signal = Signal::new(11);
const I: Signal = Signal::new(12);
const RESTORE: Signal = Signal::new(13);

struct Toy {
    hsm: Hsm<Toy>,
    foo: bool,
    hist: StateHandler<Toy>,
    log: Vec<&'static str>,
}

impl StateMachine for Toy {
    fn hsm(&mut self) -> &mut Hsm<Self> {
        &mut self.hsm
    }
}

impl Toy {
    fn new() -> Self {
        Toy {
            hsm: Hsm::new(initial),
            foo: false,
            hist: top::<Toy>,
            log: Vec::new(),
        }
    }

    fn started() -> Self {
        let mut me = Toy::new();
        me.init();
        me.log.clear();
        me
    }

    fn take_log(&mut self) -> Vec<&'static str> {
        core::mem::take(&mut self.log)
    }

    fn assert_stable(&mut self, expected: StateHandler<Toy>) {
        assert!(same(self.hsm.state, expected));
        assert!(same(self.hsm.temp, expected));
    }
}

fn initial(me: &mut Toy, _e: &Evt) -> Action<Toy> {
    me.foo = false;
    tran(s2)
}

fn s(me: &mut Toy, e: &Evt) -> Action<Toy> {
    match e.sig {
        Signal::ENTRY => {
            me.log.push("s-ENTRY");
            handled()
        }
        Signal::EXIT => {
            me.log.push("s-EXIT");
            handled()
        }
        Signal::INIT => tran(s11),
        E => tran(s11),
        I if me.foo => {
            me.foo = false;
            handled()
        }
        RESTORE => tran_hist(me.hist),
        _ => super_state(top),
    }
}

fn s1(me: &mut Toy, e: &Evt) -> Action<Toy> {
    match e.sig {
        Signal::ENTRY => {
            me.log.push("s1-ENTRY");
            handled()
        }
        Signal::EXIT => {
            me.log.push("s1-EXIT");
            handled()
        }
        Signal::INIT => tran(s11),
        A => tran(s1),
        B => tran(s11),
        C => tran(s2),
        D if !me.foo => {
            me.foo = true;
            tran(s)
        }
        F => tran(s211),
        I => handled(),
        _ => super_state(s),
    }
}

fn s11(me: &mut Toy, e: &Evt) -> Action<Toy> {
    match e.sig {
        Signal::ENTRY => {
            me.log.push("s11-ENTRY");
            handled()
        }
        Signal::EXIT => {
            me.log.push("s11-EXIT");
            handled()
        }
        D if me.foo => {
            me.foo = false;
            tran(s1)
        }
        D => unhandled(),
        G => tran(s211),
        H if !me.foo => {
            me.foo = true;
            handled()
        }
        H => {
            me.foo = false;
            tran(s)
        }
        _ => super_state(s1),
    }
}

fn s2(me: &mut Toy, e: &Evt) -> Action<Toy> {
    match e.sig {
        Signal::ENTRY => {
            me.log.push("s2-ENTRY");
            handled()
        }
        Signal::EXIT => {
            me.log.push("s2-EXIT");
            me.hist = me.child_state(s2);
            handled()
        }
        Signal::INIT => tran(s211),
        C => tran(s1),
        F => tran(s11),
        I if !me.foo => {
            me.foo = true;
            handled()
        }
        I => unhandled(),
        _ => super_state(s),
    }
}

fn s21(me: &mut Toy, e: &Evt) -> Action<Toy> {
    match e.sig {
        Signal::ENTRY => {
            me.log.push("s21-ENTRY");
            handled()
        }
        Signal::EXIT => {
            me.log.push("s21-EXIT");
            handled()
        }
        Signal::INIT => tran(s211),
        B => tran(s211),
        G => tran(s1),
        _ => super_state(s2),
    }
}

fn s211(me: &mut Toy, e: &Evt) -> Action<Toy> {
    match e.sig {
        Signal::ENTRY => {
            me.log.push("s211-ENTRY");
            handled()
        }
        Signal::EXIT => {
            me.log.push("s211-EXIT");
            handled()
        }
        D => tran(s21),
        H => tran(s),
        _ => super_state(s21),
    }
}

#[test]
fn initial_transition_drills_to_s211() {
    let mut me = Toy::new();
    me.init();
    assert_eq!(
        me.take_log(),
        ["s-ENTRY", "s2-ENTRY", "s21-ENTRY", "s211-ENTRY"]
    );
    me.assert_stable(s211);
}

#[test]
fn g_in_s211_crosses_to_the_sibling_branch() {
    let mut me = Toy::started();
    me.dispatch(&Evt::of(G));
    assert_eq!(
        me.take_log(),
        ["s211-EXIT", "s21-EXIT", "s2-EXIT", "s1-ENTRY", "s11-ENTRY"]
    );
    me.assert_stable(s11);
}

#[test]
fn guarded_h_is_internal_first_and_a_transition_second() {
    let mut me = Toy::started();
    me.dispatch(&Evt::of(G)); // park in s11
    me.take_log();

    me.dispatch(&Evt::of(H));
    assert_eq!(me.take_log(), Vec::<&str>::new());
    assert!(me.foo);
    me.assert_stable(s11);

    me.dispatch(&Evt::of(H));
    assert_eq!(
        me.take_log(),
        ["s11-EXIT", "s1-EXIT", "s1-ENTRY", "s11-ENTRY"]
    );
    me.assert_stable(s11);
}

#[test]
fn self_transition_exits_and_reenters_the_source() {
    let mut me = Toy::started();
    me.dispatch(&Evt::of(G)); // park in s11
    me.take_log();

    // A is handled in s1 as a transition to itself
    me.dispatch(&Evt::of(A));
    assert_eq!(
        me.take_log(),
        ["s11-EXIT", "s1-EXIT", "s1-ENTRY", "s11-ENTRY"]
    );
    me.assert_stable(s11);
}

#[test]
fn sibling_transition_through_the_common_superstate() {
    let mut me = Toy::started();
    me.dispatch(&Evt::of(G)); // park in s11
    me.take_log();

    me.dispatch(&Evt::of(C));
    assert_eq!(
        me.take_log(),
        ["s11-EXIT", "s1-EXIT", "s2-ENTRY", "s21-ENTRY", "s211-ENTRY"]
    );
    me.assert_stable(s211);
}

#[test]
fn transition_from_an_ancestor_does_not_exit_it() {
    let mut me = Toy::started();
    me.dispatch(&Evt::of(G)); // park in s11
    me.take_log();

    // E is handled in s, an ancestor of the target s11
    me.dispatch(&Evt::of(E));
    assert_eq!(
        me.take_log(),
        ["s11-EXIT", "s1-EXIT", "s1-ENTRY", "s11-ENTRY"]
    );
    me.assert_stable(s11);
}

#[test]
fn deep_transition_into_the_other_branch() {
    let mut me = Toy::started();
    me.dispatch(&Evt::of(G)); // park in s11
    me.take_log();

    // F in s1 targets the s211 leaf three levels down the other branch
    me.dispatch(&Evt::of(F));
    assert_eq!(
        me.take_log(),
        ["s11-EXIT", "s1-EXIT", "s2-ENTRY", "s21-ENTRY", "s211-ENTRY"]
    );
    me.assert_stable(s211);
}

#[test]
fn transition_to_an_ancestor_runs_its_initial() {
    let mut me = Toy::started();
    // H in s211 targets s, the grandparent's parent
    me.dispatch(&Evt::of(H));
    assert_eq!(
        me.take_log(),
        ["s211-EXIT", "s21-EXIT", "s2-EXIT", "s1-ENTRY", "s11-ENTRY"]
    );
    me.assert_stable(s11);
}

#[test]
fn guarded_d_falls_through_to_the_superstate() {
    let mut me = Toy::started();
    me.dispatch(&Evt::of(G)); // park in s11, foo == false
    me.take_log();

    // s11's guard rejects D, s1 takes it to s, whose initial re-enters s11
    me.dispatch(&Evt::of(D));
    assert_eq!(
        me.take_log(),
        ["s11-EXIT", "s1-EXIT", "s1-ENTRY", "s11-ENTRY"]
    );
    assert!(me.foo);

    // now s11's guard accepts D
    me.dispatch(&Evt::of(D));
    assert_eq!(me.take_log(), ["s11-EXIT", "s11-ENTRY"]);
    assert!(!me.foo);
    me.assert_stable(s11);
}

#[test]
fn internal_transitions_leave_the_configuration_alone() {
    let mut me = Toy::started();
    me.dispatch(&Evt::of(I)); // s2's guard takes it
    assert_eq!(me.take_log(), Vec::<&str>::new());
    assert!(me.foo);
    me.assert_stable(s211);

    me.dispatch(&Evt::of(I)); // s2 rejects, s takes it
    assert_eq!(me.take_log(), Vec::<&str>::new());
    assert!(!me.foo);
    me.assert_stable(s211);
}

#[test]
fn ignored_signals_do_not_move_the_machine() {
    let mut me = Toy::started();
    me.dispatch(&Evt::of(Signal::new(100)));
    assert_eq!(me.take_log(), Vec::<&str>::new());
    me.assert_stable(s211);
}

#[test]
fn is_in_reports_the_whole_active_branch() {
    let mut me = Toy::started();
    assert!(me.is_in(s211));
    assert!(me.is_in(s21));
    assert!(me.is_in(s2));
    assert!(me.is_in(s));
    assert!(me.is_in(top::<Toy>));
    assert!(!me.is_in(s1));
    assert!(!me.is_in(s11));
    me.assert_stable(s211);
}

#[test]
fn child_state_walks_one_level_below_the_parent() {
    let mut me = Toy::started();
    assert!(same(me.child_state(s), s2));
    assert!(same(me.child_state(s2), s21));
    assert!(same(me.child_state(s21), s211));
    me.assert_stable(s211);
}

#[test]
fn history_transition_restores_the_recorded_child() {
    let mut me = Toy::started();
    // leaving s2 records its shallow history (s21) in the exit action
    me.dispatch(&Evt::of(C));
    me.assert_stable(s11);
    me.take_log();

    me.dispatch(&Evt::of(RESTORE));
    assert_eq!(
        me.take_log(),
        ["s11-EXIT", "s1-EXIT", "s2-ENTRY", "s21-ENTRY", "s211-ENTRY"]
    );
    me.assert_stable(s211);
}

#[test]
fn double_init_is_a_contract_violation() {
    let mut me = Toy::new();
    me.init();
    let outcome = catch_unwind(AssertUnwindSafe(|| me.init()));
    assert!(outcome.is_err());
}
