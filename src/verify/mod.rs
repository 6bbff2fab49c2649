//! Verification of recorded calls against monitored templates.
//!
//! [`Verifier`] checks one selected call against the calling context's
//! history; [`MultiVerifier`] checks a group of calls, including ordering.
//! Verification never consumes history — every check re-reads the same
//! recorded calls, so repeated and overlapping assertions are fine.
//!
//! Failures are [`VerifyError`] values, not engine faults: a failed
//! assertion is an expected, caller-visible outcome, and its rendering
//! (`once`/`twice`/`n times`) is part of the public behavior.

use std::fmt;

use thiserror::Error;

use crate::engine::Engine;
use crate::invocation::CallTemplate;

/// Renders a call count the way the assertion messages spell them.
#[must_use]
pub fn readable_times(n: usize) -> String {
    match n {
        0 => "zero times".to_string(),
        1 => "once".to_string(),
        2 => "twice".to_string(),
        n => format!("{n} times"),
    }
}

fn render_sequence(expected: &[String], exclusive: &bool) -> String {
    let mode = if *exclusive {
        "exclusively in order"
    } else {
        "in order"
    };
    format!("expected calls {mode}: [{}]", expected.join(", "))
}

fn render_compound(failures: &[VerifyError]) -> String {
    let rendered: Vec<String> = failures.iter().map(VerifyError::to_string).collect();
    format!(
        "{} verification failure(s): {}",
        failures.len(),
        rendered.join("; ")
    )
}

/// A failed verification.
///
/// Distinct from [`Error`](crate::Error): verification failures are normal
/// outcomes of assertion methods, while `Error` covers misuse of the engine
/// itself.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// A single call's observed count did not satisfy the requested
    /// cardinality.
    #[error("{call} was expected to be called {expected}, but was called {}", readable_times(*.actual))]
    CallCount {
        /// Rendering of the call being verified, e.g. `Greeter.greet("hi")`.
        call: String,
        /// Rendering of the requested cardinality, e.g. `exactly twice`.
        expected: String,
        /// The observed number of matching calls.
        actual: usize,
    },

    /// A group of calls happened, but not in the required order (or, for the
    /// exclusive form, with extraneous matching calls in between).
    #[error("{}", render_sequence(.expected, .exclusive))]
    OutOfOrder {
        /// Renderings of the expected calls, in the required order.
        expected: Vec<String>,
        /// Whether the exclusive (no other matching calls) form was used.
        exclusive: bool,
    },

    /// Several independent checks failed in one group assertion.
    #[error("{}", render_compound(.failures))]
    Compound {
        /// The individual failures, in template order.
        failures: Vec<VerifyError>,
    },
}

/// A call-count requirement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cardinality {
    /// At least this many matching calls.
    AtLeast(usize),
    /// Exactly this many matching calls.
    Exactly(usize),
    /// At most this many matching calls.
    AtMost(usize),
}

impl Cardinality {
    /// Whether an observed count satisfies this requirement.
    #[must_use]
    pub fn accepts(&self, observed: usize) -> bool {
        match *self {
            Cardinality::AtLeast(n) => observed >= n,
            Cardinality::Exactly(n) => observed == n,
            Cardinality::AtMost(n) => observed <= n,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Cardinality::AtLeast(n) => write!(f, "at least {}", readable_times(n)),
            Cardinality::Exactly(n) => write!(f, "exactly {}", readable_times(n)),
            Cardinality::AtMost(n) => write!(f, "at most {}", readable_times(n)),
        }
    }
}

fn render_call(engine: &Engine, template: &CallTemplate) -> String {
    match engine.receiver_name(template.receiver()) {
        Some(name) => format!("{name}.{template}"),
        None => format!("{}.{template}", template.receiver()),
    }
}

fn count_matches(engine: &Engine, template: &CallTemplate) -> usize {
    engine.with_history(|history| {
        history
            .iter()
            .filter(|invocation| template.matches(invocation))
            .count()
    })
}

fn check_count(
    engine: &Engine,
    template: &CallTemplate,
    cardinality: Cardinality,
) -> Result<(), VerifyError> {
    let observed = count_matches(engine, template);
    if cardinality.accepts(observed) {
        Ok(())
    } else {
        Err(VerifyError::CallCount {
            call: render_call(engine, template),
            expected: cardinality.to_string(),
            actual: observed,
        })
    }
}

/// Call-count assertions for one selected call, returned by
/// [`Engine::assert_mock`].
///
/// Methods return `&Self` on success so assertions chain:
///
/// ```rust,ignore
/// engine
///     .assert_mock(|| mock.greet(m.any()))?
///     .was_called()?
///     .was_called_at_most(3)?;
/// ```
#[derive(Debug)]
pub struct Verifier<'e> {
    engine: &'e Engine,
    template: CallTemplate,
}

impl<'e> Verifier<'e> {
    pub(crate) fn new(engine: &'e Engine, template: CallTemplate) -> Self {
        Verifier { engine, template }
    }

    fn check(&self, cardinality: Cardinality) -> Result<&Self, VerifyError> {
        check_count(self.engine, &self.template, cardinality)?;
        Ok(self)
    }

    /// The number of recorded calls matching the selected template.
    #[must_use]
    pub fn call_count(&self) -> usize {
        count_matches(self.engine, &self.template)
    }

    /// Asserts the call happened at least once.
    pub fn was_called(&self) -> Result<&Self, VerifyError> {
        self.check(Cardinality::AtLeast(1))
    }

    /// Asserts the call happened exactly `n` times.
    pub fn was_called_times(&self, n: usize) -> Result<&Self, VerifyError> {
        self.check(Cardinality::Exactly(n))
    }

    /// Asserts the call never happened.
    pub fn was_not_called(&self) -> Result<&Self, VerifyError> {
        self.check(Cardinality::Exactly(0))
    }

    /// Asserts the call happened exactly once.
    pub fn was_called_once(&self) -> Result<&Self, VerifyError> {
        self.check(Cardinality::Exactly(1))
    }

    /// Asserts the call happened exactly twice.
    pub fn was_called_twice(&self) -> Result<&Self, VerifyError> {
        self.check(Cardinality::Exactly(2))
    }

    /// Asserts the call happened at least `n` times.
    pub fn was_called_at_least(&self, n: usize) -> Result<&Self, VerifyError> {
        self.check(Cardinality::AtLeast(n))
    }

    /// Asserts the call happened at most `n` times.
    pub fn was_called_at_most(&self, n: usize) -> Result<&Self, VerifyError> {
        self.check(Cardinality::AtMost(n))
    }
}

/// Group assertions over several selected calls, returned by
/// [`Engine::assert_mocks`].
///
/// The templates are held in the order the monitoring block made them; the
/// ordered assertions read that order as the required one.
#[derive(Debug)]
pub struct MultiVerifier<'e> {
    engine: &'e Engine,
    templates: Vec<CallTemplate>,
}

impl<'e> MultiVerifier<'e> {
    pub(crate) fn new(engine: &'e Engine, templates: Vec<CallTemplate>) -> Self {
        MultiVerifier { engine, templates }
    }

    fn check_each(&self, cardinality: Cardinality) -> Result<&Self, VerifyError> {
        let mut failures: Vec<VerifyError> = self
            .templates
            .iter()
            .filter_map(|template| check_count(self.engine, template, cardinality).err())
            .collect();

        match failures.len() {
            0 => Ok(self),
            1 => Err(failures.remove(0)),
            _ => Err(VerifyError::Compound { failures }),
        }
    }

    fn rendered_templates(&self) -> Vec<String> {
        self.templates
            .iter()
            .map(|template| render_call(self.engine, template))
            .collect()
    }

    /// Asserts every selected call happened at least once.
    pub fn were_all_called(&self) -> Result<&Self, VerifyError> {
        self.check_each(Cardinality::AtLeast(1))
    }

    /// Asserts every selected call happened exactly `n` times.
    pub fn were_all_called_times(&self, n: usize) -> Result<&Self, VerifyError> {
        self.check_each(Cardinality::Exactly(n))
    }

    /// Asserts none of the selected calls happened.
    pub fn were_none_called(&self) -> Result<&Self, VerifyError> {
        self.check_each(Cardinality::Exactly(0))
    }

    /// Asserts every selected call happened at least once, in any order.
    pub fn in_any_order(&self) -> Result<&Self, VerifyError> {
        self.check_each(Cardinality::AtLeast(1))
    }

    /// Asserts the selected calls happened in the selection order, allowing
    /// unrelated calls in between.
    ///
    /// Matching is a greedy subsequence scan: each history entry may satisfy
    /// at most one template, and templates must be satisfied front to back.
    pub fn in_that_order(&self) -> Result<&Self, VerifyError> {
        let satisfied = self.engine.with_history(|history| {
            let mut next = 0;
            for invocation in history {
                if next < self.templates.len() && self.templates[next].matches(invocation) {
                    next += 1;
                }
            }
            next == self.templates.len()
        });

        if satisfied {
            Ok(self)
        } else {
            Err(VerifyError::OutOfOrder {
                expected: self.rendered_templates(),
                exclusive: false,
            })
        }
    }

    /// Asserts the selected calls happened in the selection order with no
    /// other call matching *any* of the templates before, between, or after
    /// them.
    ///
    /// History entries matching none of the templates are ignored, but the
    /// matching ones must be exactly the selected sequence and must be
    /// contiguous in the history.
    pub fn exclusively_in_that_order(&self) -> Result<&Self, VerifyError> {
        let satisfied = self.engine.with_history(|history| {
            let relevant: Vec<usize> = history
                .iter()
                .enumerate()
                .filter(|(_, invocation)| {
                    self.templates.iter().any(|t| t.matches(invocation))
                })
                .map(|(index, _)| index)
                .collect();

            if relevant.len() != self.templates.len() {
                return false;
            }
            let contiguous = relevant
                .windows(2)
                .all(|pair| pair[1] == pair[0] + 1);
            if !contiguous {
                return false;
            }
            relevant
                .iter()
                .zip(self.templates.iter())
                .all(|(&index, template)| template.matches(&history[index]))
        });

        if satisfied {
            Ok(self)
        } else {
            Err(VerifyError::OutOfOrder {
                expected: self.rendered_templates(),
                exclusive: true,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::invocation::{ArgSpec, Invocation};
    use crate::types::{MethodSig, TypeDesc, Value};

    fn greet_sig() -> MethodSig {
        MethodSig::new("greet", vec![TypeDesc::of::<i32>()], TypeDesc::of::<()>())
    }

    fn record(engine: &Engine, handle: &crate::mock::MockHandle, n: i32) {
        let invocation = Arc::new(Invocation::new(
            handle.id(),
            greet_sig(),
            vec![Value::of(n)],
        ));
        engine.core().contexts.with(|cx| cx.recorder.record(invocation));
    }

    fn template(handle: &crate::mock::MockHandle, n: i32) -> CallTemplate {
        CallTemplate::new(
            handle.id(),
            greet_sig(),
            vec![ArgSpec::Literal(Value::of(n))],
        )
    }

    #[test]
    fn test_readable_times() {
        assert_eq!(readable_times(0), "zero times");
        assert_eq!(readable_times(1), "once");
        assert_eq!(readable_times(2), "twice");
        assert_eq!(readable_times(7), "7 times");
    }

    #[test]
    fn test_cardinality_accepts() {
        assert!(Cardinality::AtLeast(2).accepts(2));
        assert!(Cardinality::AtLeast(2).accepts(5));
        assert!(!Cardinality::AtLeast(2).accepts(1));

        assert!(Cardinality::Exactly(0).accepts(0));
        assert!(!Cardinality::Exactly(0).accepts(1));

        assert!(Cardinality::AtMost(1).accepts(0));
        assert!(!Cardinality::AtMost(1).accepts(2));
    }

    #[test]
    fn test_call_count_failure_message() {
        let engine = Engine::new();
        let handle = engine.register_mock("Greeter", false);
        record(&engine, &handle, 1);

        let verifier = Verifier::new(&engine, template(&handle, 1));
        let err = verifier.was_called_twice().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Greeter.greet(1)"), "{message}");
        assert!(message.contains("exactly twice"), "{message}");
        assert!(message.contains("called once"), "{message}");
    }

    #[test]
    fn test_verification_does_not_consume_history() {
        let engine = Engine::new();
        let handle = engine.register_mock("Greeter", false);
        record(&engine, &handle, 1);

        let verifier = Verifier::new(&engine, template(&handle, 1));
        assert!(verifier.was_called_once().is_ok());
        assert!(verifier.was_called_once().is_ok());
        assert!(verifier.was_called().is_ok());
    }

    #[test]
    fn test_in_that_order_allows_interleaving() {
        let engine = Engine::new();
        let handle = engine.register_mock("Greeter", false);
        record(&engine, &handle, 1);
        record(&engine, &handle, 9);
        record(&engine, &handle, 2);

        let multi =
            MultiVerifier::new(&engine, vec![template(&handle, 1), template(&handle, 2)]);
        assert!(multi.in_that_order().is_ok());

        let reversed =
            MultiVerifier::new(&engine, vec![template(&handle, 2), template(&handle, 1)]);
        assert!(reversed.in_that_order().is_err());
    }

    #[test]
    fn test_exclusive_order_rejects_interleaving_relevant_call() {
        let engine = Engine::new();
        let handle = engine.register_mock("Greeter", false);
        record(&engine, &handle, 1);
        record(&engine, &handle, 2);
        record(&engine, &handle, 1);

        // the extra matching call makes the exclusive form fail
        let multi =
            MultiVerifier::new(&engine, vec![template(&handle, 2), template(&handle, 1)]);
        assert!(multi.exclusively_in_that_order().is_err());
        // the non-exclusive form is satisfied by the subsequence 2, 1
        assert!(multi.in_that_order().is_ok());
    }

    #[test]
    fn test_exclusive_order_ignores_irrelevant_calls() {
        let engine = Engine::new();
        let handle = engine.register_mock("Greeter", false);
        record(&engine, &handle, 9);
        record(&engine, &handle, 1);
        record(&engine, &handle, 2);
        record(&engine, &handle, 9);

        let multi =
            MultiVerifier::new(&engine, vec![template(&handle, 1), template(&handle, 2)]);
        assert!(multi.exclusively_in_that_order().is_ok());
    }

    #[test]
    fn test_exclusive_order_requires_contiguity() {
        let engine = Engine::new();
        let handle = engine.register_mock("Greeter", false);
        record(&engine, &handle, 1);
        record(&engine, &handle, 9);
        record(&engine, &handle, 2);

        let multi =
            MultiVerifier::new(&engine, vec![template(&handle, 1), template(&handle, 2)]);
        assert!(multi.exclusively_in_that_order().is_err());
    }

    #[test]
    fn test_compound_failure_aggregates() {
        let engine = Engine::new();
        let handle = engine.register_mock("Greeter", false);

        let multi =
            MultiVerifier::new(&engine, vec![template(&handle, 1), template(&handle, 2)]);
        match multi.were_all_called().unwrap_err() {
            VerifyError::Compound { failures } => assert_eq!(failures.len(), 2),
            other => panic!("unexpected error: {other}"),
        }

        let single = MultiVerifier::new(&engine, vec![template(&handle, 1)]);
        assert!(matches!(
            single.were_all_called().unwrap_err(),
            VerifyError::CallCount { .. }
        ));
    }

    #[test]
    fn test_were_none_called() {
        let engine = Engine::new();
        let handle = engine.register_mock("Greeter", false);

        let multi = MultiVerifier::new(&engine, vec![template(&handle, 1)]);
        assert!(multi.were_none_called().is_ok());

        record(&engine, &handle, 1);
        assert!(multi.were_none_called().is_err());
    }
}
