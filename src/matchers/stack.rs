use crate::matchers::{Matcher, MatcherKind};
use crate::{Error, Result};

/// The per-context ordered stack of matcher placeholders.
///
/// Placeholder expressions execute before the call that consumes their
/// results, in left-to-right argument order, so the stack grows bottom-up in
/// argument order: the bottom entry belongs to the first argument.
///
/// The stack is drained at every monitored call. A drain is consistent only
/// when the stack is empty (all-literal call) or holds exactly one matcher
/// per argument (fully matcher-driven call); anything in between resets the
/// stack and raises [`Error::InconsistentMatchers`] so later calls start
/// clean.
#[derive(Debug, Default)]
pub struct MatcherStack {
    entries: Vec<Matcher>,
}

impl MatcherStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        MatcherStack::default()
    }

    /// Pushes a matcher. Always succeeds.
    pub fn push(&mut self, matcher: Matcher) {
        self.entries.push(matcher);
    }

    /// The number of matchers currently on the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no matchers are on the stack.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pops exactly `count` entries for a composite matcher's constructor.
    ///
    /// Entries are popped LIFO and returned re-reversed, so the result is in
    /// source (argument-evaluation) order: the matcher pushed first is the
    /// first child. Fails with [`Error::IllegalMatcherState`] naming the
    /// offending combinator when fewer than `count` entries are present; the
    /// entries already on the stack are left untouched in that case.
    pub fn pop_composite_children(
        &mut self,
        combinator: MatcherKind,
        count: usize,
    ) -> Result<Vec<Matcher>> {
        if self.entries.len() < count {
            return Err(Error::IllegalMatcherState(format!(
                "{combinator} requires {count} matcher(s) on the stack, but found {}",
                self.entries.len()
            )));
        }

        Ok(self.entries.split_off(self.entries.len() - count))
    }

    /// Drains the stack for a monitored call of the given arity.
    ///
    /// Returns `None` for an all-literal call (empty stack) or
    /// `Some(matchers)` in argument order for a fully matcher-driven call.
    /// Any other stack size empties the stack first, then fails with
    /// [`Error::InconsistentMatchers`].
    pub fn drain_for_call(&mut self, arity: usize) -> Result<Option<Vec<Matcher>>> {
        match self.entries.len() {
            0 => Ok(None),
            n if n == arity => Ok(Some(std::mem::take(&mut self.entries))),
            n => {
                self.entries.clear();
                Err(Error::InconsistentMatchers {
                    expected: arity,
                    actual: n,
                })
            }
        }
    }

    /// Empties the stack, returning true when entries were discarded.
    pub fn clear(&mut self) -> bool {
        let dirty = !self.entries.is_empty();
        self.entries.clear();
        dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    #[test]
    fn test_push_and_drain_in_argument_order() {
        let mut stack = MatcherStack::new();
        stack.push(Matcher::equal(1i32));
        stack.push(Matcher::equal(2i32));

        let drained = stack.drain_for_call(2).unwrap().unwrap();
        assert_eq!(drained.len(), 2);
        // bottom of stack = first argument
        assert!(drained[0].matches(&Value::of(1i32)));
        assert!(drained[1].matches(&Value::of(2i32)));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_drain_empty_stack_is_literal_call() {
        let mut stack = MatcherStack::new();
        assert!(stack.drain_for_call(3).unwrap().is_none());
    }

    #[test]
    fn test_drain_partial_stack_fails_and_resets() {
        let mut stack = MatcherStack::new();
        stack.push(Matcher::any());

        let err = stack.drain_for_call(2).unwrap_err();
        assert!(matches!(
            err,
            Error::InconsistentMatchers {
                expected: 2,
                actual: 1
            }
        ));
        // contract: the stack is reset before the error propagates
        assert!(stack.is_empty());
    }

    #[test]
    fn test_drain_overfull_stack_fails_and_resets() {
        let mut stack = MatcherStack::new();
        stack.push(Matcher::any());
        stack.push(Matcher::any());
        stack.push(Matcher::any());

        let err = stack.drain_for_call(2).unwrap_err();
        assert!(matches!(
            err,
            Error::InconsistentMatchers {
                expected: 2,
                actual: 3
            }
        ));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_pop_composite_children_in_source_order() {
        let mut stack = MatcherStack::new();
        stack.push(Matcher::equal(1i32));
        stack.push(Matcher::equal(2i32));
        stack.push(Matcher::equal(3i32));

        let children = stack
            .pop_composite_children(MatcherKind::And, 2)
            .unwrap();
        assert_eq!(children.len(), 2);
        assert!(children[0].matches(&Value::of(2i32)));
        assert!(children[1].matches(&Value::of(3i32)));
        // the earlier entry is untouched
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_pop_composite_children_underflow() {
        let mut stack = MatcherStack::new();
        stack.push(Matcher::any());

        let err = stack
            .pop_composite_children(MatcherKind::Or, 2)
            .unwrap_err();
        match err {
            Error::IllegalMatcherState(msg) => {
                assert!(msg.contains("or"));
                assert!(msg.contains('2'));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // consumed nothing
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_clear_reports_dirtiness() {
        let mut stack = MatcherStack::new();
        assert!(!stack.clear());
        stack.push(Matcher::any());
        assert!(stack.clear());
        assert!(stack.is_empty());
    }
}
