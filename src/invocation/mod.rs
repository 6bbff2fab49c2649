//! Invocations, call templates, and argument matching.
//!
//! An [`Invocation`] is one real, permanently recorded call: receiver
//! identity, exact method signature, the positional arguments, and (once the
//! call completes) its outcome. A [`CallTemplate`] is the monitored-block
//! counterpart: the same receiver/signature pair, but with each argument
//! position holding either a literal value or a [`Matcher`].
//!
//! Matching between a template and an invocation is the single rule shared by
//! stub resolution and verification: identical receivers, equal signatures,
//! and every position satisfied.

mod recorder;

pub use recorder::InvocationRecorder;

use std::fmt;
use std::sync::OnceLock;

use crate::matchers::Matcher;
use crate::types::{MethodSig, Value};

/// Identity of one mock instance, issued by the engine at registration.
///
/// Comparison is identity, never structural: two distinct receivers are
/// different even when their mocked types or states are "equal".
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiverId(u64);

impl ReceiverId {
    pub(crate) fn new(raw: u64) -> Self {
        ReceiverId(raw)
    }
}

impl fmt::Debug for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReceiverId({})", self.0)
    }
}

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mock#{}", self.0)
    }
}

/// What a completed call did: returned a value or raised a failure.
#[derive(Clone, Debug)]
pub enum Outcome {
    /// The call completed normally with this value.
    Returned(Value),
    /// The call failed, propagating this value to the caller.
    Raised(Value),
}

/// One recorded call on a mock.
///
/// Created at call time, given its [`Outcome`] exactly once when the effect
/// completes, then held immutably in the recorder's history. Equality for
/// matching purposes ignores the outcome.
#[derive(Debug)]
pub struct Invocation {
    receiver: ReceiverId,
    sig: MethodSig,
    args: Vec<Value>,
    outcome: OnceLock<Outcome>,
}

impl Invocation {
    pub(crate) fn new(receiver: ReceiverId, sig: MethodSig, args: Vec<Value>) -> Self {
        debug_assert_eq!(args.len(), sig.arity());
        Invocation {
            receiver,
            sig,
            args,
            outcome: OnceLock::new(),
        }
    }

    /// The receiver the call was made on.
    #[must_use]
    pub fn receiver(&self) -> ReceiverId {
        self.receiver
    }

    /// The exact signature of the invoked method.
    #[must_use]
    pub fn sig(&self) -> &MethodSig {
        &self.sig
    }

    /// The positional arguments, in declaration order.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Attaches the call's outcome. Later attempts are ignored; the first
    /// outcome wins.
    pub fn record_outcome(&self, outcome: Outcome) {
        let _ = self.outcome.set(outcome);
    }

    /// The outcome, if the call has completed.
    #[must_use]
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.get()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.sig.name())?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

/// One argument position of a [`CallTemplate`]: a literal or a matcher.
#[derive(Clone)]
pub enum ArgSpec {
    /// A literal value, compared structurally against the actual argument.
    Literal(Value),
    /// A matcher predicate applied to the actual argument.
    Matcher(Matcher),
}

impl ArgSpec {
    /// Tests this position against an actual argument.
    #[must_use]
    pub fn satisfied_by(&self, actual: &Value) -> bool {
        match self {
            ArgSpec::Literal(expected) => expected.structurally_eq(actual),
            ArgSpec::Matcher(matcher) => matcher.matches(actual),
        }
    }
}

impl fmt::Display for ArgSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgSpec::Literal(v) => write!(f, "{v}"),
            ArgSpec::Matcher(m) => write!(f, "{m}"),
        }
    }
}

impl fmt::Debug for ArgSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArgSpec({self})")
    }
}

/// Positional matching of a template argument list against actual arguments.
///
/// Lists of different lengths never match. Each position must be satisfied:
/// literals compare structurally, matchers run their predicate. A template
/// recorded without matchers is all-literal, so the whole comparison falls
/// back to structural equality.
#[must_use]
pub fn args_match(template: &[ArgSpec], actual: &[Value]) -> bool {
    template.len() == actual.len()
        && template
            .iter()
            .zip(actual.iter())
            .all(|(spec, arg)| spec.satisfied_by(arg))
}

/// A call captured inside a monitoring block, used as a stubbing or
/// verification query template.
#[derive(Clone, Debug)]
pub struct CallTemplate {
    receiver: ReceiverId,
    sig: MethodSig,
    args: Vec<ArgSpec>,
}

impl CallTemplate {
    pub(crate) fn new(receiver: ReceiverId, sig: MethodSig, args: Vec<ArgSpec>) -> Self {
        CallTemplate {
            receiver,
            sig,
            args,
        }
    }

    /// The receiver the template selects.
    #[must_use]
    pub fn receiver(&self) -> ReceiverId {
        self.receiver
    }

    /// The exact signature the template selects.
    #[must_use]
    pub fn sig(&self) -> &MethodSig {
        &self.sig
    }

    /// The per-position argument specifications.
    #[must_use]
    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    /// Whether a recorded invocation matches this template.
    #[must_use]
    pub fn matches(&self, invocation: &Invocation) -> bool {
        self.receiver == invocation.receiver()
            && self.sig == *invocation.sig()
            && args_match(&self.args, invocation.args())
    }
}

impl fmt::Display for CallTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.sig.name())?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}
