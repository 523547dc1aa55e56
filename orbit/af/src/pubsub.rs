//! Publish-subscribe event delivery.
//!
//! One priority set per signal maps publishers to subscribers. Publishing
//! multicasts by reference: the event's count grows by one per subscriber
//! queue it enters, plus a keep-alive reference the publisher holds for the
//! duration of the multicast so a zero-subscriber publish (or a subscriber
//! consuming faster than the loop posts) cannot recycle the event early.
//!
//! The multicast runs with the scheduler locked up to the highest
//! subscriber priority, so no subscriber starts handling the event before
//! every equal-or-lower-priority subscriber has it queued. Higher-priority
//! non-subscribers are unaffected.

use orbit_core::{require, Evt, Prio, PrioSet, Signal, NO_MARGIN};
use orbit_trace::records::{ao, ps};

use crate::active::{self, AoId};
use crate::fw;
use crate::pool;
use crate::sched;

const MODULE: &str = "ps";

/// Size the subscriber table for signals in `0..max_signal`. Must run once,
/// before any subscription or publish.
pub fn ps_init(max_signal: u16) {
    require!(MODULE, 100, max_signal > Signal::USER.raw());
    fw::with(|fw| {
        fw.subscribers = alloc::vec![PrioSet::EMPTY; max_signal as usize];
        fw.max_pub_signal = max_signal;
    });
}

pub(crate) fn subscribe(p: Prio, sig: Signal) {
    let hook = fw::with(|fw| {
        // user signal within the published range, on a started object
        require!(
            MODULE,
            300,
            !sig.is_reserved() && sig.raw() < fw.max_pub_signal && fw.slots[p.index()].is_some()
        );
        fw.subscribers[sig.raw() as usize].insert(p);
        fw.trace.clone()
    });
    fw::emit(&hook, ao::SUBSCRIBE, &[p.raw(), sig.raw() as u8]);
}

pub(crate) fn unsubscribe(p: Prio, sig: Signal) {
    let hook = fw::with(|fw| {
        require!(
            MODULE,
            400,
            !sig.is_reserved() && sig.raw() < fw.max_pub_signal
        );
        fw.subscribers[sig.raw() as usize].remove(p);
        fw.trace.clone()
    });
    fw::emit(&hook, ao::UNSUBSCRIBE, &[p.raw(), sig.raw() as u8]);
}

pub(crate) fn unsubscribe_all(p: Prio) {
    fw::with(|fw| {
        for subs in fw.subscribers.iter_mut() {
            subs.remove(p);
        }
    });
}

/// Multicast an event to every subscriber of its signal.
///
/// Safe from any context, including interrupts. Each subscriber receives
/// the same event by reference; it is recycled once the last subscriber's
/// dispatch completes. Publishing to a signal without subscribers recycles
/// a dynamic event immediately.
pub fn publish(e: Evt) {
    let (subs, hook) = fw::with(|fw| {
        // the published signal must be within the configured range
        require!(MODULE, 100, e.sig.raw() < fw.max_pub_signal);
        if e.is_dynamic() {
            // keep-alive reference for the duration of the multicast
            fw.evt_ref_inc(&e);
        }
        (fw.subscribers[e.sig.raw() as usize], fw.trace.clone())
    });
    fw::emit(&hook, ps::PUBLISH, &[e.sig.raw() as u8, e.pool_id]);

    if subs.not_empty() {
        let ceiling = subs.find_max().unwrap();
        let status = sched::lock(ceiling);

        let mut remaining = subs;
        while let Some(p) = remaining.find_max() {
            // delivery to a subscriber must succeed
            let _ = active::post_margin(AoId { prio: p }, e, NO_MARGIN, 0);
            remaining.remove(p);
        }

        sched::unlock(status);
    }

    // drop the keep-alive reference; recycles on zero subscribers
    pool::gc(e);
}
