//! Shared test plumbing for kernel-level scenarios: a serial guard around
//! the process-global framework, plus a reusable collector active object.
#![allow(dead_code)] // each test binary uses a different subset

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use orbit_af::hsm::{handled, super_state, top, tran, Action, Hsm};
use orbit_af::{impl_active, start, ActiveBase, AoId, Evt, Prio, Signal};

static SERIAL: Mutex<()> = Mutex::new(());

pub fn fresh() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
    orbit_af::init();
    orbit_coop::init();
    guard
}

/// Shared log of `(priority, signal)` deliveries, in dispatch order.
pub type Log = Arc<Mutex<Vec<(u8, u16)>>>;

pub fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

/// Control signal: a collector receiving it drops all its subscriptions.
pub const UNSUB_ALL: Signal = Signal::new(31);

/// An active object that records every user signal it dispatches.
pub struct Collector {
    base: ActiveBase,
    hsm: Hsm<Collector>,
    log: Log,
    subs: Vec<Signal>,
}

fn collector_initial(me: &mut Collector, _e: &Evt) -> Action<Collector> {
    for &sig in me.subs.iter() {
        me.base.subscribe(sig);
    }
    tran(collecting)
}

fn collecting(me: &mut Collector, e: &Evt) -> Action<Collector> {
    if e.sig.is_reserved() {
        return if e.sig == Signal::ENTRY || e.sig == Signal::EXIT {
            handled()
        } else {
            super_state(top)
        };
    }
    if e.sig == UNSUB_ALL {
        me.base.unsubscribe_all();
        return handled();
    }
    let prio = me.base.prio().raw();
    me.log.lock().unwrap().push((prio, e.sig.raw()));
    handled()
}

impl_active!(Collector { base: base, hsm: hsm });

/// Leak a collector into a started active object at `prio`.
pub fn start_collector(prio: u8, queue_len: u16, log: &Log) -> AoId {
    start_subscriber(prio, queue_len, log, &[])
}

/// A collector that subscribes to `subs` in its initial transition.
pub fn start_subscriber(prio: u8, queue_len: u16, log: &Log, subs: &[Signal]) -> AoId {
    let ao = Box::leak(Box::new(Collector {
        base: ActiveBase::new(),
        hsm: Hsm::new(collector_initial),
        log: Arc::clone(log),
        subs: subs.to_vec(),
    }));
    start(ao, Prio::new(prio).unwrap(), queue_len)
}
