//! Raw thread-safe queues: ordering, margins, and the interaction with the
//! event memory model.

mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};

use orbit_af::pool::pool_free;
use orbit_af::queue::RawQueue;
use orbit_af::{gc, new_evt, pool_init, Evt, Signal, NO_MARGIN};

const SIG: Signal = Signal::new(Signal::USER.raw());

fn sig(n: u16) -> Evt {
    Evt::of(Signal::new(Signal::USER.raw() + n))
}

#[test]
fn fifo_order_across_the_critical_section() {
    let _guard = common::fresh();
    let q = RawQueue::new(4);

    for n in 0..5 {
        assert!(q.post(sig(n), 0).is_ok());
    }
    for n in 0..5 {
        assert_eq!(q.get(), Some(sig(n)));
    }
    assert_eq!(q.get(), None);
}

#[test]
fn lifo_posts_jump_to_the_front() {
    let _guard = common::fresh();
    let q = RawQueue::new(4);

    assert!(q.post(sig(1), 0).is_ok());
    q.post_lifo(sig(2));
    assert!(q.post(sig(3), 0).is_ok());

    assert_eq!(q.get(), Some(sig(2)));
    assert_eq!(q.get(), Some(sig(1)));
    assert_eq!(q.get(), Some(sig(3)));
}

#[test]
fn margin_refusal_is_an_error_and_recycles() {
    let _guard = common::fresh();
    pool_init(16, 2);
    let q = RawQueue::new(2); // capacity 3

    // margin of 1: at most two events may occupy the queue
    let a = new_evt(8, NO_MARGIN, SIG).unwrap();
    let b = new_evt(8, NO_MARGIN, SIG).unwrap();
    assert!(q.post(a, 1).is_ok());
    assert!(q.post(b, 1).is_ok());
    assert_eq!(pool_free(1), 0);

    // refused post must gc its event; both blocks are queue-held, so the
    // pool balance is untouched
    let c = Evt::of(SIG);
    assert!(q.post(c, 1).is_err());
    assert_eq!(pool_free(1), 0);

    // draining gives the references back to us
    gc(q.get().unwrap());
    gc(q.get().unwrap());
    assert_eq!(pool_free(1), 2);
}

#[test]
fn failed_post_recycles_a_dynamic_event() {
    let _guard = common::fresh();
    pool_init(16, 2);
    let q = RawQueue::new(0); // capacity 1

    let a = new_evt(8, NO_MARGIN, SIG).unwrap();
    let b = new_evt(8, NO_MARGIN, SIG).unwrap();
    assert!(q.post(a, 0).is_ok());
    assert!(q.post(b, 0).is_err());
    // b went back to its pool right away
    assert_eq!(pool_free(1), 1);

    gc(q.get().unwrap());
    assert_eq!(pool_free(1), 2);
}

#[test]
fn no_margin_overflow_is_fatal() {
    let _guard = common::fresh();
    let q = RawQueue::new(0);
    assert!(q.post(sig(1), NO_MARGIN).is_ok());
    let outcome = catch_unwind(AssertUnwindSafe(|| q.post(sig(2), NO_MARGIN)));
    assert!(outcome.is_err());
}

#[test]
fn lifo_overflow_is_fatal() {
    let _guard = common::fresh();
    let q = RawQueue::new(0);
    q.post_lifo(sig(1));
    let outcome = catch_unwind(AssertUnwindSafe(|| q.post_lifo(sig(2))));
    assert!(outcome.is_err());
}

#[test]
fn watermark_counts_the_front_slot() {
    let _guard = common::fresh();
    let q = RawQueue::new(2);
    assert_eq!(q.n_free(), 3);
    let _ = q.post(sig(1), 0);
    let _ = q.post(sig(2), 0);
    assert_eq!(q.n_free(), 1);
    assert_eq!(q.n_min(), 1);
    let _ = q.get();
    let _ = q.get();
    assert_eq!(q.n_free(), 3);
    assert_eq!(q.n_min(), 1);
}
