//! Argument matchers and the per-context matcher stack.
//!
//! A [`Matcher`] is a predicate over a single positional argument, substituted
//! for a literal value inside a stubbing or verification call expression. The
//! fluent placeholder functions live on
//! [`Matchers`](crate::engine::Matchers); this module holds the predicates
//! themselves and the [`MatcherStack`] protocol they ride on.
//!
//! Composite matchers (`and`/`or`/`not`) own child matchers popped from the
//! stack at construction time. Children are stored in argument-evaluation
//! order: the placeholder expressions execute left to right, so the matcher
//! pushed first is the first child.

mod stack;

pub use stack::MatcherStack;

use std::fmt;
use std::sync::Arc;

use crate::types::Value;
use crate::{Error, Result};

/// The kind tag of a [`Matcher`], used in diagnostics.
#[derive(Clone, Copy, PartialEq, Eq, Debug, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum MatcherKind {
    /// Matches any argument.
    Any,
    /// Structural equality against a captured value.
    Eq,
    /// Structural inequality against a captured value.
    NotEq,
    /// Strictly less than a captured bound.
    Lt,
    /// Strictly greater than a captured bound.
    Gt,
    /// The argument's concrete type is the captured type.
    InstanceOf,
    /// Structural equality against any one of a captured list of values.
    AnyOf,
    /// All child matchers match.
    And,
    /// At least one child matcher matches.
    Or,
    /// The child matcher does not match.
    Not,
    /// A string argument matches a compiled regular expression.
    Regex,
    /// A string argument starts with a captured prefix.
    StartsWith,
    /// A string argument ends with a captured suffix.
    EndsWith,
    /// A user-supplied predicate.
    Custom,
}

#[derive(Clone)]
enum Node {
    Pred {
        test: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
        desc: Arc<str>,
    },
    All(Vec<Matcher>),
    AnyOne(Vec<Matcher>),
    Negate(Box<Matcher>),
}

/// A predicate over one positional argument.
///
/// Constructed through the associated functions below, usually indirectly via
/// the fluent placeholder API on [`Matchers`](crate::engine::Matchers).
#[derive(Clone)]
pub struct Matcher {
    kind: MatcherKind,
    node: Node,
}

impl Matcher {
    fn pred(
        kind: MatcherKind,
        desc: impl Into<Arc<str>>,
        test: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Matcher {
            kind,
            node: Node::Pred {
                test: Arc::new(test),
                desc: desc.into(),
            },
        }
    }

    /// Matches any argument.
    #[must_use]
    pub fn any() -> Self {
        Matcher::pred(MatcherKind::Any, "any()", |_| true)
    }

    /// Matches arguments structurally equal to `expected`.
    pub fn equal<T>(expected: T) -> Self
    where
        T: PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        let captured = Value::of(expected);
        let desc = format!("eq({captured})");
        Matcher::pred(MatcherKind::Eq, desc, move |actual| {
            captured.structurally_eq(actual)
        })
    }

    /// Matches arguments not structurally equal to `expected`.
    ///
    /// An argument of a different concrete type is never equal, so it
    /// matches.
    pub fn not_equal<T>(expected: T) -> Self
    where
        T: PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        let captured = Value::of(expected);
        let desc = format!("neq({captured})");
        Matcher::pred(MatcherKind::NotEq, desc, move |actual| {
            !captured.structurally_eq(actual)
        })
    }

    /// Matches arguments strictly less than `bound`.
    ///
    /// Arguments of a different concrete type do not match.
    pub fn less_than<T>(bound: T) -> Self
    where
        T: PartialOrd + fmt::Debug + Send + Sync + 'static,
    {
        let desc = format!("lt({bound:?})");
        Matcher::pred(MatcherKind::Lt, desc, move |actual| {
            actual.downcast_ref::<T>().is_some_and(|a| *a < bound)
        })
    }

    /// Matches arguments strictly greater than `bound`.
    pub fn greater_than<T>(bound: T) -> Self
    where
        T: PartialOrd + fmt::Debug + Send + Sync + 'static,
    {
        let desc = format!("gt({bound:?})");
        Matcher::pred(MatcherKind::Gt, desc, move |actual| {
            actual.downcast_ref::<T>().is_some_and(|a| *a > bound)
        })
    }

    /// Matches arguments whose concrete type is exactly `T`.
    #[must_use]
    pub fn instance_of<T: 'static>() -> Self {
        let desc = format!("instanceOf::<{}>()", std::any::type_name::<T>());
        Matcher::pred(MatcherKind::InstanceOf, desc, |actual| actual.is::<T>())
    }

    /// Matches arguments structurally equal to any of `values`.
    pub fn any_of<T>(values: Vec<T>) -> Self
    where
        T: PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        let captured: Vec<Value> = values.into_iter().map(Value::of).collect();
        let rendered: Vec<String> = captured.iter().map(ToString::to_string).collect();
        let desc = format!("anyOf({})", rendered.join(", "));
        Matcher::pred(MatcherKind::AnyOf, desc, move |actual| {
            captured.iter().any(|v| v.structurally_eq(actual))
        })
    }

    /// Matches string arguments against a regular expression.
    ///
    /// Non-string arguments do not match. Fails with
    /// [`Error::InvalidMatcher`] when the pattern does not compile.
    pub fn regex(pattern: &str) -> Result<Self> {
        let re = regex::Regex::new(pattern)
            .map_err(|e| Error::InvalidMatcher(format!("bad regex pattern {pattern:?}: {e}")))?;
        let desc = format!("regexMatch({pattern:?})");
        Ok(Matcher::pred(MatcherKind::Regex, desc, move |actual| {
            actual.as_str().is_some_and(|s| re.is_match(s))
        }))
    }

    /// Matches string arguments starting with `prefix`.
    pub fn starts_with(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let desc = format!("startsWith({prefix:?})");
        Matcher::pred(MatcherKind::StartsWith, desc, move |actual| {
            actual.as_str().is_some_and(|s| s.starts_with(&prefix))
        })
    }

    /// Matches string arguments ending with `suffix`.
    pub fn ends_with(suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        let desc = format!("endsWith({suffix:?})");
        Matcher::pred(MatcherKind::EndsWith, desc, move |actual| {
            actual.as_str().is_some_and(|s| s.ends_with(&suffix))
        })
    }

    /// Wraps a user-supplied predicate. `desc` appears in diagnostics.
    pub fn custom(desc: &str, test: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Matcher::pred(MatcherKind::Custom, format!("custom({desc})"), test)
    }

    /// Composes children into a conjunction. All must match.
    #[must_use]
    pub fn all_of(children: Vec<Matcher>) -> Self {
        Matcher {
            kind: MatcherKind::And,
            node: Node::All(children),
        }
    }

    /// Composes children into a disjunction. At least one must match.
    #[must_use]
    pub fn one_of(children: Vec<Matcher>) -> Self {
        Matcher {
            kind: MatcherKind::Or,
            node: Node::AnyOne(children),
        }
    }

    /// Negates a child matcher.
    #[must_use]
    pub fn negate(child: Matcher) -> Self {
        Matcher {
            kind: MatcherKind::Not,
            node: Node::Negate(Box::new(child)),
        }
    }

    /// The kind tag of this matcher.
    #[must_use]
    pub fn kind(&self) -> MatcherKind {
        self.kind
    }

    /// Tests the matcher against an actual argument.
    #[must_use]
    pub fn matches(&self, actual: &Value) -> bool {
        match &self.node {
            Node::Pred { test, .. } => test(actual),
            Node::All(children) => children.iter().all(|m| m.matches(actual)),
            Node::AnyOne(children) => children.iter().any(|m| m.matches(actual)),
            Node::Negate(child) => !child.matches(actual),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, name: &str, children: &[Matcher]) -> fmt::Result {
            write!(f, "{name}(")?;
            for (i, c) in children.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{c}")?;
            }
            write!(f, ")")
        }

        match &self.node {
            Node::Pred { desc, .. } => write!(f, "{desc}"),
            Node::All(children) => join(f, "and", children),
            Node::AnyOne(children) => join(f, "or", children),
            Node::Negate(child) => write!(f, "not({child})"),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matcher({self})")
    }
}
