//! Call-time routing: the single path every intercepted method runs through.

use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::invocation::{ArgSpec, CallTemplate, Invocation, Outcome};
use crate::mock::MockHandle;
use crate::stubs::{StubAction, StubKey};
use crate::types::{MethodSig, Value};
use crate::{Error, Result};

use super::Engine;

/// The routed result of one intercepted call, consumed by the substitute's
/// interception shim.
#[derive(Debug)]
pub enum Dispatch {
    /// A concrete result was produced; the shim converts it to the method's
    /// return type.
    Value(Value),
    /// A configured failure applies; the shim propagates it to the caller as
    /// a panic carrying [`Thrown`].
    Raised(Value),
    /// No behavior applied (unstubbed call, or a call captured by a
    /// monitoring block); the shim falls back to a type default.
    Unstubbed,
}

/// Panic payload used to propagate a stubbed failure out of a mocked call.
///
/// Callers that stub failures with
/// [`then_throw`](crate::stubs::Stubber::then_throw) observe them as panics
/// whose payload downcasts to `Thrown`; the carried [`Value`] is the stubbed
/// failure value.
#[derive(Debug)]
pub struct Thrown(
    /// The stubbed failure value.
    pub Value,
);

/// How the context phase routed the call.
enum Routed {
    /// Captured as a template by the active monitoring block.
    Monitored,
    /// A real call, now recorded in this context's history.
    Real(Arc<Invocation>),
}

impl Engine {
    /// Routes one intercepted call.
    ///
    /// Inside a monitoring block the call is captured as a template (with
    /// matcher placeholders substituted for the affected argument positions)
    /// and nothing is recorded or resolved. Outside one, the call is recorded
    /// and resolved against the stub registry: side effects first, then the
    /// terminal action, then the outcome attached to the history entry.
    ///
    /// `original` is the substitute's real method body, when one exists; it
    /// backs `then_call_original()` and the unstubbed path of call-through
    /// mocks.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidMockInvocation`] for unrecognized receivers or arity
    /// mismatches, [`Error::InconsistentMatchers`] for broken matcher usage
    /// at a monitored call, [`Error::InvalidStubbing`] when
    /// `then_call_original()` fires without an original body. The shim turns
    /// every `Err` into a panic; monitoring blocks catch engine-error panics
    /// and surface them as their own `Err`.
    pub fn dispatch(
        &self,
        handle: &MockHandle,
        sig: &MethodSig,
        args: Vec<Value>,
        original: Option<&dyn Fn(&[Value]) -> Value>,
    ) -> Result<Dispatch> {
        if !self.recognizes(handle.id()) {
            return Err(Error::InvalidMockInvocation(format!(
                "receiver {} is not registered with this engine",
                handle.id()
            )));
        }
        if args.len() != sig.arity() {
            return Err(Error::InvalidMockInvocation(format!(
                "{} expects {} argument(s), got {}",
                sig,
                sig.arity(),
                args.len()
            )));
        }

        let routed = self.route(handle, sig, args)?;
        let invocation = match routed {
            Routed::Monitored => return Ok(Dispatch::Unstubbed),
            Routed::Real(invocation) => invocation,
        };

        let key = StubKey {
            receiver: handle.id(),
            sig: sig.clone(),
        };
        let resolved = self.stub_registry().resolve(&key, invocation.args());

        let Some((side_effects, terminal)) = resolved else {
            return self.unstubbed(handle, &invocation, original);
        };

        // Side effects always run before the terminal, outside any lock.
        for effect in &side_effects {
            effect(invocation.args());
        }

        match terminal {
            Some(StubAction::Return(value)) => {
                invocation.record_outcome(Outcome::Returned(value.clone()));
                Ok(Dispatch::Value(value))
            }
            Some(StubAction::Throw(failure)) => {
                invocation.record_outcome(Outcome::Raised(failure.clone()));
                Ok(Dispatch::Raised(failure))
            }
            Some(StubAction::CallOriginal) => self.run_original(&invocation, original),
            Some(StubAction::Delegate(target)) => {
                let value = target.invoke(invocation.sig(), invocation.args());
                invocation.record_outcome(Outcome::Returned(value.clone()));
                Ok(Dispatch::Value(value))
            }
            Some(StubAction::Answer(answer)) => {
                let value = answer(invocation.args());
                invocation.record_outcome(Outcome::Returned(value.clone()));
                Ok(Dispatch::Value(value))
            }
            None => self.unstubbed(handle, &invocation, original),
        }
    }

    /// The context phase: drain the matcher stack, then either capture a
    /// template (monitoring) or record a real invocation. One store access,
    /// released before any user code runs.
    fn route(&self, handle: &MockHandle, sig: &MethodSig, args: Vec<Value>) -> Result<Routed> {
        self.core().contexts.with(|cx| {
            let matchers = cx.matcher_stack.drain_for_call(sig.arity())?;

            if cx.monitoring() {
                let specs: Vec<ArgSpec> = match matchers {
                    Some(matchers) => matchers.into_iter().map(ArgSpec::Matcher).collect(),
                    None => args.into_iter().map(ArgSpec::Literal).collect(),
                };
                cx.record_monitored(CallTemplate::new(handle.id(), sig.clone(), specs));
                return Ok(Routed::Monitored);
            }

            let invocation = Arc::new(Invocation::new(handle.id(), sig.clone(), args));
            cx.recorder.record(Arc::clone(&invocation));
            Ok(Routed::Real(invocation))
        })
    }

    /// The fallthrough for calls no stub claims: call-through mocks run the
    /// original body, everything else yields an engine default (or defers to
    /// the shim's type default when the table has no entry).
    fn unstubbed(
        &self,
        handle: &MockHandle,
        invocation: &Arc<Invocation>,
        original: Option<&dyn Fn(&[Value]) -> Value>,
    ) -> Result<Dispatch> {
        if handle.call_through() && original.is_some() {
            return self.run_original(invocation, original);
        }

        match self.default_values().value_for(&invocation.sig().ret()) {
            Some(value) => {
                invocation.record_outcome(Outcome::Returned(value.clone()));
                Ok(Dispatch::Value(value))
            }
            None => Ok(Dispatch::Unstubbed),
        }
    }

    /// Runs the original method body, recording its outcome either way. A
    /// panicking body has its payload recorded as a raised outcome and is
    /// then propagated unchanged to the caller.
    fn run_original(
        &self,
        invocation: &Arc<Invocation>,
        original: Option<&dyn Fn(&[Value]) -> Value>,
    ) -> Result<Dispatch> {
        let Some(original) = original else {
            return Err(Error::InvalidStubbing(format!(
                "{} has no original body to call through to",
                invocation.sig()
            )));
        };

        match catch_unwind(AssertUnwindSafe(|| original(invocation.args()))) {
            Ok(value) => {
                invocation.record_outcome(Outcome::Returned(value.clone()));
                Ok(Dispatch::Value(value))
            }
            Err(payload) => {
                invocation.record_outcome(Outcome::Raised(panic_note(payload.as_ref())));
                resume_unwind(payload);
            }
        }
    }
}

/// Best-effort description of a panic payload, for the history entry of a
/// call whose original body panicked.
fn panic_note(payload: &(dyn std::any::Any + Send)) -> Value {
    if let Some(thrown) = payload.downcast_ref::<Thrown>() {
        return thrown.0.clone();
    }
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return Value::of((*message).to_string());
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return Value::of(message.clone());
    }
    Value::of("panic with non-string payload".to_string())
}
