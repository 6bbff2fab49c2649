//! Hand-written substitutes shared by the integration tests.
//!
//! These follow the interception contract end to end: each method erases its
//! arguments, routes through [`MockHandle::invoke`] with its exact
//! signature, and returns the converted result. `CombinerMock` is a plain
//! mock; `AdderSpy` is a call-through substitute carrying real method
//! bodies.

#![allow(dead_code)]

use molt::prelude::*;

pub trait Combiner {
    fn combine(&self, a: String, b: String) -> String;
    fn length(&self, s: String) -> usize;
    fn notify(&self, n: i32);
}

pub struct CombinerMock {
    handle: MockHandle,
}

impl CombinerMock {
    pub fn new(engine: &Engine) -> Self {
        CombinerMock {
            handle: engine.register_mock("Combiner", false),
        }
    }
}

impl Combiner for CombinerMock {
    fn combine(&self, a: String, b: String) -> String {
        self.handle.invoke(
            sig!(combine(String, String) -> String),
            vec![Value::of(a), Value::of(b)],
            None,
        )
    }

    fn length(&self, s: String) -> usize {
        self.handle
            .invoke(sig!(length(String) -> usize), vec![Value::of(s)], None)
    }

    fn notify(&self, n: i32) {
        self.handle
            .invoke::<()>(sig!(notify(i32)), vec![Value::of(n)], None)
    }
}

impl Mock for CombinerMock {
    fn mock_handle(&self) -> &MockHandle {
        &self.handle
    }
}

/// A call-through substitute: unstubbed calls run the original bodies.
pub struct AdderSpy {
    handle: MockHandle,
}

impl AdderSpy {
    pub fn new(engine: &Engine) -> Self {
        AdderSpy {
            handle: engine.register_mock("Adder", true),
        }
    }

    pub fn add(&self, a: i32, b: i32) -> i32 {
        let original = |args: &[Value]| -> Value {
            let a = args[0].extract::<i32>().unwrap_or_default();
            let b = args[1].extract::<i32>().unwrap_or_default();
            Value::of(a + b)
        };
        self.handle.invoke(
            sig!(add(i32, i32) -> i32),
            vec![Value::of(a), Value::of(b)],
            Some(&original),
        )
    }

    /// An original body that always panics, for failure-path tests.
    pub fn explode(&self) -> i32 {
        let original = |_args: &[Value]| -> Value { panic!("adder exploded") };
        self.handle
            .invoke(sig!(explode() -> i32), Vec::new(), Some(&original))
    }
}

impl Mock for AdderSpy {
    fn mock_handle(&self) -> &MockHandle {
        &self.handle
    }
}
