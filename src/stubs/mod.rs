//! The stub registry and the fluent stubbing surface.
//!
//! Stubbing state is keyed by (receiver, method signature). Each pairing owns
//! at most one [`StubSlot`]: the argument template captured by the `when(...)`
//! block, a FIFO queue of terminal actions, and a list of side-effect actions
//! that run before whichever terminal applies. Starting a fresh `when(...)`
//! chain on a pairing discards the old slot entirely before the new chain is
//! appended.
//!
//! The registry itself is shared mutable state across execution contexts —
//! stubbing configured on one thread is observable from calls made on any
//! other — so every slot access goes through the concurrent map's per-entry
//! locking.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::engine::Engine;
use crate::invocation::{args_match, ArgSpec, CallTemplate, ReceiverId};
use crate::types::{MethodSig, Value};

/// The kind tag of a terminal stub action, used in diagnostics.
#[derive(Clone, Copy, PartialEq, Eq, Debug, strum::Display)]
#[strum(serialize_all = "camelCase")]
pub enum StubKind {
    /// Return a canned value.
    Return,
    /// Raise a canned failure.
    Throw,
    /// Invoke the substitute's original method body.
    CallOriginal,
    /// Invoke the same method on a delegate target.
    Delegate,
    /// Compute the result from the actual arguments.
    Answer,
}

/// A target object stubbed calls can be delegated to.
///
/// The engine invokes [`invoke`](DelegateTarget::invoke) with the intercepted
/// call's signature and actual arguments, and records/returns the result as
/// if the mock had produced it.
pub trait DelegateTarget: Send + Sync {
    /// Handles one delegated call.
    fn invoke(&self, sig: &MethodSig, args: &[Value]) -> Value;
}

/// A computed-answer callback: actual arguments in, result out.
pub type AnswerFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// A side-effect action, run before the terminal effect of a matching call.
pub type SideEffectFn = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// One queued terminal behavior.
#[derive(Clone)]
pub(crate) enum StubAction {
    Return(Value),
    Throw(Value),
    CallOriginal,
    Delegate(Arc<dyn DelegateTarget>),
    Answer(AnswerFn),
}

impl StubAction {
    pub(crate) fn kind(&self) -> StubKind {
        match self {
            StubAction::Return(_) => StubKind::Return,
            StubAction::Throw(_) => StubKind::Throw,
            StubAction::CallOriginal => StubKind::CallOriginal,
            StubAction::Delegate(_) => StubKind::Delegate,
            StubAction::Answer(_) => StubKind::Answer,
        }
    }
}

impl fmt::Debug for StubAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StubAction::Return(v) | StubAction::Throw(v) => {
                write!(f, "{}({v})", self.kind())
            }
            StubAction::CallOriginal => write!(f, "{}()", self.kind()),
            StubAction::Delegate(_) | StubAction::Answer(_) => {
                write!(f, "{}(..)", self.kind())
            }
        }
    }
}

/// Registry key: one (receiver, signature) pairing.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub(crate) struct StubKey {
    pub(crate) receiver: ReceiverId,
    pub(crate) sig: MethodSig,
}

/// The configured behavior queue for one pairing.
pub(crate) struct StubSlot {
    template: Vec<ArgSpec>,
    terminals: VecDeque<StubAction>,
    side_effects: Vec<SideEffectFn>,
}

impl fmt::Debug for StubSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubSlot")
            .field("template", &self.template)
            .field("terminals", &self.terminals)
            .field("side_effects", &self.side_effects.len())
            .finish()
    }
}

impl StubSlot {
    fn new(template: Vec<ArgSpec>) -> Self {
        StubSlot {
            template,
            terminals: VecDeque::new(),
            side_effects: Vec::new(),
        }
    }

    fn matches(&self, args: &[Value]) -> bool {
        args_match(&self.template, args)
    }

    /// Takes the next terminal: popped one-shot while more remain, retained
    /// (cloned in place) once it is the sole survivor.
    fn take_terminal(&mut self) -> Option<StubAction> {
        if self.terminals.len() > 1 {
            self.terminals.pop_front()
        } else {
            self.terminals.front().cloned()
        }
    }
}

/// The shared stub registry: one slot per (receiver, signature) pairing.
pub(crate) struct StubRegistry {
    slots: DashMap<StubKey, StubSlot>,
}

impl StubRegistry {
    pub(crate) fn new() -> Self {
        StubRegistry {
            slots: DashMap::new(),
        }
    }

    /// Replaces the pairing's slot with a fresh one for `template`.
    pub(crate) fn install(&self, key: StubKey, template: Vec<ArgSpec>) {
        self.slots.insert(key, StubSlot::new(template));
    }

    pub(crate) fn append_terminal(&self, key: &StubKey, action: StubAction) {
        if let Some(mut slot) = self.slots.get_mut(key) {
            slot.terminals.push_back(action);
        }
    }

    pub(crate) fn append_side_effect(&self, key: &StubKey, action: SideEffectFn) {
        if let Some(mut slot) = self.slots.get_mut(key) {
            slot.side_effects.push(action);
        }
    }

    /// Resolves a real call against the pairing's slot.
    ///
    /// Returns `None` when no slot exists or its template rejects the
    /// arguments. Otherwise returns the side effects to run plus the terminal
    /// to apply (which may be absent when only side effects were configured).
    /// The slot lock is released before the caller runs any user code.
    pub(crate) fn resolve(
        &self,
        key: &StubKey,
        args: &[Value],
    ) -> Option<(Vec<SideEffectFn>, Option<StubAction>)> {
        let mut slot = self.slots.get_mut(key)?;
        if !slot.matches(args) {
            return None;
        }

        let effects = slot.side_effects.clone();
        let terminal = slot.take_terminal();
        Some((effects, terminal))
    }

    /// Discards every slot configured for one receiver.
    pub(crate) fn purge_receiver(&self, receiver: ReceiverId) {
        self.slots.retain(|key, _| key.receiver != receiver);
    }

    /// Discards all slots.
    pub(crate) fn clear(&self) {
        self.slots.clear();
    }
}

impl fmt::Debug for StubRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubRegistry")
            .field("pairings", &self.slots.len())
            .finish()
    }
}

/// The fluent stubbing surface returned by [`Engine::when`].
///
/// Each `then_*` call appends to the pairing's FIFO queue; the first call of
/// a chain discards whatever was previously configured for the pairing. The
/// head of the queue is consumed one-shot per matching call until a single
/// entry remains, which is then retained for every later call — so a lone
/// `then_return(x)` behaves forever, and a chain
/// `then_return(x).then_return(y)` yields `x`, then `y`, then `y` again.
pub struct Stubber<'e> {
    engine: &'e Engine,
    template: CallTemplate,
    installed: bool,
}

impl<'e> Stubber<'e> {
    pub(crate) fn new(engine: &'e Engine, template: CallTemplate) -> Self {
        Stubber {
            engine,
            template,
            installed: false,
        }
    }

    fn key(&self) -> StubKey {
        StubKey {
            receiver: self.template.receiver(),
            sig: self.template.sig().clone(),
        }
    }

    fn ensure_slot(&mut self) -> StubKey {
        let key = self.key();
        if !self.installed {
            self.engine
                .stub_registry()
                .install(key.clone(), self.template.args().to_vec());
            self.installed = true;
        }
        key
    }

    fn push_terminal(mut self, action: StubAction) -> Self {
        let key = self.ensure_slot();
        self.engine.stub_registry().append_terminal(&key, action);
        self
    }

    /// Queues a canned return value.
    pub fn then_return<T>(self, value: T) -> Self
    where
        T: PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        self.push_terminal(StubAction::Return(Value::of(value)))
    }

    /// Queues a canned failure, propagated to the caller as a panic carrying
    /// [`Thrown`](crate::engine::Thrown).
    pub fn then_throw<T>(self, failure: T) -> Self
    where
        T: PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        self.push_terminal(StubAction::Throw(Value::of(failure)))
    }

    /// Queues a call-through to the substitute's original method body.
    ///
    /// Fails at call time with
    /// [`Error::InvalidStubbing`](crate::Error::InvalidStubbing) when the
    /// intercepted method has no original body.
    pub fn then_call_original(self) -> Self {
        self.push_terminal(StubAction::CallOriginal)
    }

    /// Queues delegation of matching calls to `target`.
    pub fn then_delegate(self, target: Arc<dyn DelegateTarget>) -> Self {
        self.push_terminal(StubAction::Delegate(target))
    }

    /// Queues an answer computed from the actual arguments.
    pub fn then_answer(self, answer: impl Fn(&[Value]) -> Value + Send + Sync + 'static) -> Self {
        self.push_terminal(StubAction::Answer(Arc::new(answer)))
    }

    /// Adds a side-effect action, run on every matching call before its
    /// terminal effect, whichever terminal that is.
    pub fn then_do(mut self, action: impl Fn(&[Value]) + Send + Sync + 'static) -> Self {
        let key = self.ensure_slot();
        self.engine
            .stub_registry()
            .append_side_effect(&key, Arc::new(action));
        self
    }
}

impl fmt::Debug for Stubber<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stubber({})", self.template)
    }
}
