//! Cross-thread behavior: shared stubbing, isolated histories and matcher
//! state.

mod common;

use std::sync::Arc;
use std::thread;

use molt::prelude::*;

use common::{Combiner, CombinerMock};

fn s(v: &str) -> String {
    v.to_string()
}

#[test]
fn test_stubbing_is_visible_across_threads() {
    let engine = Engine::new();
    let mock = Arc::new(CombinerMock::new(&engine));

    engine
        .when(|| mock.length(s("shared")))
        .unwrap()
        .then_return(7usize);

    let worker = Arc::clone(&mock);
    let observed = thread::spawn(move || worker.length(s("shared")))
        .join()
        .unwrap();
    assert_eq!(observed, 7);
}

#[test]
fn test_histories_are_per_thread() {
    let engine = Engine::new();
    let mock = Arc::new(CombinerMock::new(&engine));

    let worker = Arc::clone(&mock);
    thread::spawn(move || worker.notify(1)).join().unwrap();

    // the worker's call is invisible to this thread's history
    engine
        .assert_mock(|| mock.notify(1))
        .unwrap()
        .was_not_called()
        .unwrap();

    mock.notify(1);
    engine
        .assert_mock(|| mock.notify(1))
        .unwrap()
        .was_called_once()
        .unwrap();
}

#[test]
fn test_verification_runs_on_the_calling_thread() {
    let engine = Engine::new();
    let mock = Arc::new(CombinerMock::new(&engine));

    let worker_engine = engine.clone();
    let worker = Arc::clone(&mock);
    thread::spawn(move || {
        worker.notify(9);
        worker_engine
            .assert_mock(|| worker.notify(9))
            .unwrap()
            .was_called_once()
            .unwrap();
    })
    .join()
    .unwrap();
}

#[test]
fn test_monitoring_blocks_do_not_interfere_across_threads() {
    let engine = Engine::new();
    let mock = Arc::new(CombinerMock::new(&engine));

    let mut handles = Vec::new();
    for i in 0..4usize {
        let engine = engine.clone();
        let mock = Arc::clone(&mock);
        handles.push(thread::spawn(move || {
            let m = engine.matchers();
            engine
                .when(|| mock.length(m.starts_with(&format!("t{i}"))))
                .unwrap()
                .then_return(i + 10);
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // the last slot installed for the pairing wins; whichever it is, its own
    // prefix resolves and the stack on this thread is untouched
    let hit = (0..4usize).find(|i| mock.length(format!("t{i}-probe")) == i + 10);
    assert!(hit.is_some());

    engine
        .when(|| mock.length(s("x")))
        .unwrap()
        .then_return(99usize);
    assert_eq!(mock.length(s("x")), 99);
}

#[test]
fn test_reset_affects_only_the_calling_context() {
    let engine = Engine::new();
    let mock = Arc::new(CombinerMock::new(&engine));

    mock.notify(1);

    let worker_engine = engine.clone();
    let worker = Arc::clone(&mock);
    thread::spawn(move || {
        worker.notify(1);
        worker_engine.reset();
        worker_engine
            .assert_mock(|| worker.notify(1))
            .unwrap()
            .was_not_called()
            .unwrap();
    })
    .join()
    .unwrap();

    // the worker's reset did not touch this thread's history
    engine
        .assert_mock(|| mock.notify(1))
        .unwrap()
        .was_called_once()
        .unwrap();
}

#[test]
fn test_concurrent_calls_on_shared_stub() {
    let engine = Engine::new();
    let mock = Arc::new(CombinerMock::new(&engine));
    let m = engine.matchers();

    engine
        .when(|| mock.length(m.any()))
        .unwrap()
        .then_answer(|args| {
            let len = args[0]
                .extract::<String>()
                .map(|s| s.len())
                .unwrap_or_default();
            Value::of(len)
        });

    let mut handles = Vec::new();
    for i in 0..8usize {
        let mock = Arc::clone(&mock);
        handles.push(thread::spawn(move || {
            let input = "x".repeat(i);
            assert_eq!(mock.length(input), i);
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}
