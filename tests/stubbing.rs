//! End-to-end stubbing behavior: terminal queues, side effects, spies, and
//! stub lifecycle.

mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use molt::prelude::*;

use common::{AdderSpy, Combiner, CombinerMock};

fn s(v: &str) -> String {
    v.to_string()
}

#[test]
fn test_then_return_literal_args() {
    let engine = Engine::new();
    let mock = CombinerMock::new(&engine);

    engine
        .when(|| mock.combine(s("a"), s("b")))
        .unwrap()
        .then_return(s("stubbed"));

    assert_eq!(mock.combine(s("a"), s("b")), "stubbed");
    // different arguments fall through to the default
    assert_eq!(mock.combine(s("a"), s("c")), "");
}

#[test]
fn test_terminal_queue_retains_last() {
    let engine = Engine::new();
    let mock = CombinerMock::new(&engine);

    engine
        .when(|| mock.length(s("x")))
        .unwrap()
        .then_return(1usize)
        .then_return(2usize)
        .then_return(3usize);

    assert_eq!(mock.length(s("x")), 1);
    assert_eq!(mock.length(s("x")), 2);
    assert_eq!(mock.length(s("x")), 3);
    assert_eq!(mock.length(s("x")), 3);
    assert_eq!(mock.length(s("x")), 3);
}

#[test]
fn test_then_throw_propagates_as_thrown_panic() {
    let engine = Engine::new();
    let mock = CombinerMock::new(&engine);

    engine
        .when(|| mock.length(s("boom")))
        .unwrap()
        .then_throw(s("kaboom"));

    let outcome = catch_unwind(AssertUnwindSafe(|| mock.length(s("boom"))));
    let payload = outcome.unwrap_err();
    let thrown = payload.downcast_ref::<Thrown>().expect("Thrown payload");
    assert_eq!(thrown.0.downcast_ref::<String>().map(String::as_str), Some("kaboom"));
}

#[test]
fn test_then_answer_computes_from_actual_args() {
    let engine = Engine::new();
    let mock = CombinerMock::new(&engine);
    let m = engine.matchers();

    engine
        .when(|| mock.combine(m.any(), m.any()))
        .unwrap()
        .then_answer(|args| {
            let a = args[0].extract::<String>().unwrap_or_default();
            let b = args[1].extract::<String>().unwrap_or_default();
            Value::of(format!("{a}+{b}"))
        });

    assert_eq!(mock.combine(s("x"), s("y")), "x+y");
    assert_eq!(mock.combine(s("1"), s("2")), "1+2");
}

#[test]
fn test_then_delegate_routes_to_target() {
    struct Upcaser;
    impl DelegateTarget for Upcaser {
        fn invoke(&self, _sig: &MethodSig, args: &[Value]) -> Value {
            let a = args[0].extract::<String>().unwrap_or_default();
            Value::of(a.to_uppercase())
        }
    }

    let engine = Engine::new();
    let mock = CombinerMock::new(&engine);
    let m = engine.matchers();

    engine
        .when(|| mock.combine(m.any(), m.any()))
        .unwrap()
        .then_delegate(Arc::new(Upcaser));

    assert_eq!(mock.combine(s("hello"), s("ignored")), "HELLO");
}

#[test]
fn test_then_do_runs_before_every_terminal() {
    let engine = Engine::new();
    let mock = CombinerMock::new(&engine);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    engine
        .when(|| mock.length(s("x")))
        .unwrap()
        .then_do(move |args| {
            sink.lock()
                .unwrap()
                .push(args[0].extract::<String>().unwrap_or_default());
        })
        .then_return(7usize);

    assert_eq!(mock.length(s("x")), 7);
    assert_eq!(mock.length(s("x")), 7);
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[test]
fn test_side_effects_without_terminal_yield_default() {
    let engine = Engine::new();
    let mock = CombinerMock::new(&engine);
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&hits);
    engine
        .when(|| mock.length(s("x")))
        .unwrap()
        .then_do(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    assert_eq!(mock.length(s("x")), 0);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_fresh_when_discards_previous_slot() {
    let engine = Engine::new();
    let mock = CombinerMock::new(&engine);

    engine
        .when(|| mock.length(s("x")))
        .unwrap()
        .then_return(1usize)
        .then_return(2usize);
    assert_eq!(mock.length(s("x")), 1);

    // restubbing the pairing starts from scratch: the queued 2 is gone
    engine
        .when(|| mock.length(s("x")))
        .unwrap()
        .then_return(9usize);
    assert_eq!(mock.length(s("x")), 9);
    assert_eq!(mock.length(s("x")), 9);
}

#[test]
fn test_unstubbed_returns_zero_defaults() {
    let engine = Engine::new();
    let mock = CombinerMock::new(&engine);

    assert_eq!(mock.combine(s("a"), s("b")), "");
    assert_eq!(mock.length(s("a")), 0);
    mock.notify(1); // unit-returning, must not panic
}

#[test]
fn test_registered_default_override_applies_to_unstubbed_calls() {
    let engine = Engine::new();
    let mock = CombinerMock::new(&engine);

    engine.default_values().register::<usize>(|| 42usize);
    assert_eq!(mock.length(s("a")), 42);

    engine.default_values().remove::<usize>();
    assert_eq!(mock.length(s("a")), 0);
}

#[test]
fn test_spy_calls_through_when_unstubbed() {
    let engine = Engine::new();
    let spy = AdderSpy::new(&engine);

    assert_eq!(spy.add(2, 3), 5);

    // stubbing wins over call-through
    engine.when(|| spy.add(2, 3)).unwrap().then_return(99i32);
    assert_eq!(spy.add(2, 3), 99);
    // non-matching args still call through
    assert_eq!(spy.add(1, 1), 2);
}

#[test]
fn test_then_call_original_on_spy() {
    let engine = Engine::new();
    let spy = AdderSpy::new(&engine);
    let m = engine.matchers();

    engine
        .when(|| spy.add(m.any(), m.any()))
        .unwrap()
        .then_return(0i32)
        .then_call_original();

    assert_eq!(spy.add(4, 4), 0);
    assert_eq!(spy.add(4, 4), 8);
}

#[test]
fn test_then_call_original_without_body_panics_with_invalid_stubbing() {
    let engine = Engine::new();
    let mock = CombinerMock::new(&engine);

    engine
        .when(|| mock.length(s("x")))
        .unwrap()
        .then_call_original();

    let payload = catch_unwind(AssertUnwindSafe(|| mock.length(s("x")))).unwrap_err();
    match payload.downcast_ref::<Error>() {
        Some(Error::InvalidStubbing(_)) => {}
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[test]
fn test_original_panic_propagates_and_is_recorded() {
    let engine = Engine::new();
    let spy = AdderSpy::new(&engine);

    let payload = catch_unwind(AssertUnwindSafe(|| spy.explode())).unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>().copied(), Some("adder exploded"));

    // the call is still in history, failure and all
    engine
        .assert_mock(|| spy.explode())
        .unwrap()
        .was_called_once()
        .unwrap();
}

#[test]
fn test_reset_mock_clears_stubs_and_history() {
    let engine = Engine::new();
    let mock = CombinerMock::new(&engine);

    engine
        .when(|| mock.length(s("x")))
        .unwrap()
        .then_return(5usize);
    assert_eq!(mock.length(s("x")), 5);

    engine.reset_mock(mock.mock_handle());

    assert_eq!(mock.length(s("x")), 0);
    engine
        .assert_mock(|| mock.length(s("x")))
        .unwrap()
        .was_called_once()
        .unwrap();
}

#[test]
fn test_reset_mock_leaves_other_mocks_alone() {
    let engine = Engine::new();
    let a = CombinerMock::new(&engine);
    let b = CombinerMock::new(&engine);

    engine.when(|| a.length(s("x"))).unwrap().then_return(1usize);
    engine.when(|| b.length(s("x"))).unwrap().then_return(2usize);

    engine.reset_mock(a.mock_handle());

    assert_eq!(a.length(s("x")), 0);
    assert_eq!(b.length(s("x")), 2);
}

#[test]
fn test_when_without_mocked_call_fails() {
    let engine = Engine::new();

    let err = engine.when(|| 41 + 1).unwrap_err();
    assert!(matches!(err, Error::InvalidMockInvocation(_)));
}

#[test]
fn test_when_selects_last_call_in_body() {
    let engine = Engine::new();
    let mock = CombinerMock::new(&engine);

    engine
        .when(|| {
            mock.length(s("first"));
            mock.length(s("second"))
        })
        .unwrap()
        .then_return(7usize);

    assert_eq!(mock.length(s("second")), 7);
    assert_eq!(mock.length(s("first")), 0);
}

#[test]
fn test_monitored_calls_are_not_recorded() {
    let engine = Engine::new();
    let mock = CombinerMock::new(&engine);

    engine
        .when(|| mock.length(s("x")))
        .unwrap()
        .then_return(1usize);

    engine
        .assert_mock(|| mock.length(s("x")))
        .unwrap()
        .was_not_called()
        .unwrap();
}

#[test]
fn test_two_engines_are_independent() {
    let alpha = Engine::new();
    let beta = Engine::new();
    let mock_a = CombinerMock::new(&alpha);
    let mock_b = CombinerMock::new(&beta);

    alpha
        .when(|| mock_a.length(s("x")))
        .unwrap()
        .then_return(1usize);

    assert_eq!(mock_a.length(s("x")), 1);
    assert_eq!(mock_b.length(s("x")), 0);

    beta.assert_mock(|| mock_b.length(s("x")))
        .unwrap()
        .was_called_once()
        .unwrap();
}
