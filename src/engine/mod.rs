//! The engine: owner of all mocking state and entry point for callers.
//!
//! An [`Engine`] value owns the per-context state store, the shared stub
//! registry, the receiver registry, and the default-value table. Nothing is
//! global — multiple engines coexist in one process, each blind to the
//! others' mocks.
//!
//! # Monitoring blocks
//!
//! [`Engine::when`], [`Engine::assert_mock`], and [`Engine::assert_mocks`]
//! run their body inside a *monitoring session*: calls made on mocks inside
//! the body are captured as templates instead of being recorded for real,
//! and matcher placeholders evaluated inside the body ride the per-context
//! [`MatcherStack`](crate::matchers::MatcherStack). Engine errors raised
//! while the body runs unwind out of the template expression and are
//! surfaced as `Err`; any *other* panic from the body is swallowed, because
//! the body exists only to select a call and its value is never used.

mod context;
mod dispatch;

pub use dispatch::{Dispatch, Thrown};

pub(crate) use context::ContextStore;

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::invocation::{CallTemplate, Invocation, ReceiverId};
use crate::matchers::{Matcher, MatcherKind};
use crate::mock::MockHandle;
use crate::stubs::{StubRegistry, Stubber};
use crate::types::{DefaultValueProvider, Value};
use crate::verify::{MultiVerifier, Verifier};
use crate::{Error, Result};

pub(crate) struct EngineCore {
    pub(crate) contexts: ContextStore,
    pub(crate) stubs: StubRegistry,
    defaults: DefaultValueProvider,
    recognized: DashMap<ReceiverId, Arc<str>>,
    next_receiver: AtomicU64,
}

/// A mocking engine.
///
/// Cheap to clone; clones share state. See the [module docs](self) for the
/// monitoring-block protocol.
///
/// ```rust
/// use molt::prelude::*;
///
/// let engine = Engine::new();
/// let handle = engine.register_mock("Greeter", false);
/// assert_eq!(handle.name(), "Greeter");
/// ```
#[derive(Clone)]
pub struct Engine {
    core: Arc<EngineCore>,
}

impl Engine {
    /// Creates an engine with empty state and the built-in default values.
    #[must_use]
    pub fn new() -> Self {
        Engine {
            core: Arc::new(EngineCore {
                contexts: ContextStore::new(),
                stubs: StubRegistry::new(),
                defaults: DefaultValueProvider::new(),
                recognized: DashMap::new(),
                next_receiver: AtomicU64::new(1),
            }),
        }
    }

    /// Registers a new substitute instance with this engine.
    ///
    /// Called by substitute constructors (generated or hand-written). The
    /// returned [`MockHandle`] carries the receiver identity every
    /// intercepted method routes through. `call_through` selects the spy
    /// policy: unstubbed calls on a call-through mock run the original body
    /// when one is supplied, instead of returning a default value. The
    /// policy is fixed at construction, by design.
    #[must_use]
    pub fn register_mock(&self, name: &str, call_through: bool) -> MockHandle {
        let id = ReceiverId::new(self.core.next_receiver.fetch_add(1, Ordering::Relaxed));
        let name: Arc<str> = name.into();
        self.core.recognized.insert(id, Arc::clone(&name));
        MockHandle::new(self.clone(), id, name, call_through)
    }

    /// Whether `receiver` was issued by this engine.
    #[must_use]
    pub fn recognizes(&self, receiver: ReceiverId) -> bool {
        self.core.recognized.contains_key(&receiver)
    }

    /// The matcher-placeholder surface for this engine.
    #[must_use]
    pub fn matchers(&self) -> Matchers<'_> {
        Matchers { engine: self }
    }

    /// The default-value provider consulted for unstubbed calls.
    #[must_use]
    pub fn default_values(&self) -> &DefaultValueProvider {
        &self.core.defaults
    }

    /// Runs `body` in a monitoring session and builds a [`Stubber`] from the
    /// last call it selected.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidMockInvocation`] when the body made no call on a mock
    /// of this engine; [`Error::InconsistentMatchers`] /
    /// [`Error::IllegalMatcherState`] / [`Error::InvalidMatcher`] when
    /// matcher usage inside the body was broken.
    pub fn when<R>(&self, body: impl FnOnce() -> R) -> Result<Stubber<'_>> {
        let mut templates = self.monitored_block(body)?;
        match templates.pop() {
            Some(template) => Ok(Stubber::new(self, template)),
            None => Err(Error::InvalidMockInvocation(
                "when() body made no call on a mock owned by this engine".to_string(),
            )),
        }
    }

    /// Runs `body` in a monitoring session and builds a [`Verifier`] from
    /// the last call it selected.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Engine::when`].
    pub fn assert_mock<R>(&self, body: impl FnOnce() -> R) -> Result<Verifier<'_>> {
        let mut templates = self.monitored_block(body)?;
        match templates.pop() {
            Some(template) => Ok(Verifier::new(self, template)),
            None => Err(Error::InvalidMockInvocation(
                "assert_mock() body made no call on a mock owned by this engine".to_string(),
            )),
        }
    }

    /// Runs `body` in a monitoring session and builds a [`MultiVerifier`]
    /// from *all* calls it selected, in call order.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Engine::when`].
    pub fn assert_mocks<R>(&self, body: impl FnOnce() -> R) -> Result<MultiVerifier<'_>> {
        let templates = self.monitored_block(body)?;
        if templates.is_empty() {
            return Err(Error::InvalidMockInvocation(
                "assert_mocks() body made no call on a mock owned by this engine".to_string(),
            ));
        }
        Ok(MultiVerifier::new(self, templates))
    }

    /// Clears the calling context's recorded state: history, the
    /// last-invocation slot, and any leftover matcher stack.
    ///
    /// Stubbing is left in place — use [`Engine::reset_mock`] to discard a
    /// mock's configured behavior. Resetting is always explicit and must not
    /// race in-flight calls on the same receivers.
    pub fn reset(&self) {
        self.core.contexts.with(|cx| cx.reset());
    }

    /// Discards one mock's stub slots *and* purges its entries from the
    /// calling context's history, so `was_not_called()` holds afterwards.
    pub fn reset_mock(&self, handle: &MockHandle) {
        self.core.stubs.purge_receiver(handle.id());
        self.core
            .contexts
            .with(|cx| cx.recorder.purge_receiver(handle.id()));
    }

    /// All invocations recorded for one (receiver, signature) pairing on the
    /// calling context, in insertion order.
    #[must_use]
    pub fn query(
        &self,
        handle: &MockHandle,
        sig: &crate::types::MethodSig,
    ) -> Vec<Arc<Invocation>> {
        self.core
            .contexts
            .with(|cx| cx.recorder.query(handle.id(), sig))
    }

    pub(crate) fn stub_registry(&self) -> &StubRegistry {
        &self.core.stubs
    }

    pub(crate) fn core(&self) -> &EngineCore {
        &self.core
    }

    pub(crate) fn with_history<R>(&self, f: impl FnOnce(&[Arc<Invocation>]) -> R) -> R {
        self.core.contexts.with(|cx| f(cx.recorder.history()))
    }

    pub(crate) fn receiver_name(&self, receiver: ReceiverId) -> Option<Arc<str>> {
        self.core
            .recognized
            .get(&receiver)
            .map(|name| Arc::clone(&name))
    }

    /// Runs `body` with a monitored frame pushed, enforcing matcher-stack
    /// hygiene at entry and exit, and converting engine-error panics raised
    /// inside the body into `Err`.
    fn monitored_block<R>(&self, body: impl FnOnce() -> R) -> Result<Vec<CallTemplate>> {
        let entry_leftover = self.core.contexts.with(|cx| {
            let leftover = cx.matcher_stack.len();
            cx.matcher_stack.clear();
            if leftover == 0 {
                cx.start_monitored_frame();
            }
            leftover
        });
        if entry_leftover > 0 {
            return Err(Error::InconsistentMatchers {
                expected: 0,
                actual: entry_leftover,
            });
        }

        let outcome = catch_unwind(AssertUnwindSafe(body));

        let (templates, exit_leftover) = self.core.contexts.with(|cx| {
            let templates = cx.end_monitored_frame();
            let leftover = cx.matcher_stack.len();
            cx.matcher_stack.clear();
            (templates, leftover)
        });

        if let Err(payload) = outcome {
            match payload.downcast::<Error>() {
                Ok(engine_error) => return Err(*engine_error),
                // the body's value is never used; unrelated panics raised
                // while selecting the call must not leak
                Err(_swallowed) => {}
            }
        }

        if exit_leftover > 0 {
            return Err(Error::InconsistentMatchers {
                expected: 0,
                actual: exit_leftover,
            });
        }

        Ok(templates)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("mocks", &self.core.recognized.len())
            .field("stubs", &self.core.stubs)
            .finish()
    }
}

/// Fluent matcher placeholders, scoped to one engine.
///
/// Each placeholder call pushes a [`Matcher`] onto the calling context's
/// matcher stack and returns a throwaway `T::default()` so it can stand in
/// for a real argument inside the call expression. Placeholders are only
/// meaningful inside a monitoring block; calling one outside panics with a
/// usage message.
///
/// Composite placeholders (`and`/`or`/`not`) pop their children — the
/// placeholder expressions evaluated just before them — back off the stack
/// and push the composed matcher.
#[derive(Clone, Copy)]
pub struct Matchers<'e> {
    engine: &'e Engine,
}

impl Matchers<'_> {
    fn register(&self, matcher: Matcher) {
        self.engine.core.contexts.with(|cx| {
            if !cx.monitoring() {
                panic!(
                    "attempt to register matcher '{matcher}' outside a when()/assert_mock[s]() block"
                );
            }
            cx.matcher_stack.push(matcher);
        });
    }

    fn compose(&self, kind: MatcherKind, count: usize) {
        let result: Result<()> = self.engine.core.contexts.with(|cx| {
            if !cx.monitoring() {
                panic!(
                    "attempt to compose {kind} matcher outside a when()/assert_mock[s]() block"
                );
            }
            let mut children = cx.matcher_stack.pop_composite_children(kind, count)?;
            let composite = match kind {
                MatcherKind::And => Matcher::all_of(children),
                MatcherKind::Or => Matcher::one_of(children),
                MatcherKind::Not => match children.pop() {
                    Some(child) => Matcher::negate(child),
                    None => unreachable!("pop_composite_children returned too few entries"),
                },
                _ => unreachable!("{kind} is not a composite matcher"),
            };
            cx.matcher_stack.push(composite);
            Ok(())
        });
        if let Err(err) = result {
            std::panic::panic_any(err);
        }
    }

    /// Matches any argument at this position.
    pub fn any<T: Default>(&self) -> T {
        self.register(Matcher::any());
        T::default()
    }

    /// Matches arguments structurally equal to `expected`.
    pub fn eq<T>(&self, expected: T) -> T
    where
        T: PartialEq + fmt::Debug + Default + Send + Sync + 'static,
    {
        self.register(Matcher::equal(expected));
        T::default()
    }

    /// Matches arguments not structurally equal to `expected`.
    pub fn neq<T>(&self, expected: T) -> T
    where
        T: PartialEq + fmt::Debug + Default + Send + Sync + 'static,
    {
        self.register(Matcher::not_equal(expected));
        T::default()
    }

    /// Matches arguments strictly less than `bound`.
    pub fn lt<T>(&self, bound: T) -> T
    where
        T: PartialOrd + fmt::Debug + Default + Send + Sync + 'static,
    {
        self.register(Matcher::less_than(bound));
        T::default()
    }

    /// Matches arguments strictly greater than `bound`.
    pub fn gt<T>(&self, bound: T) -> T
    where
        T: PartialOrd + fmt::Debug + Default + Send + Sync + 'static,
    {
        self.register(Matcher::greater_than(bound));
        T::default()
    }

    /// Matches arguments whose concrete type is exactly `T`.
    pub fn instance_of<T: Default + 'static>(&self) -> T {
        self.register(Matcher::instance_of::<T>());
        T::default()
    }

    /// Matches arguments structurally equal to any of `values`.
    pub fn any_of<T>(&self, values: Vec<T>) -> T
    where
        T: PartialEq + fmt::Debug + Default + Send + Sync + 'static,
    {
        self.register(Matcher::any_of(values));
        T::default()
    }

    /// Composes the two placeholders evaluated just before into a
    /// conjunction over this position.
    pub fn and<T: Default>(&self, _first: T, _second: T) -> T {
        self.compose(MatcherKind::And, 2);
        T::default()
    }

    /// Composes the two placeholders evaluated just before into a
    /// disjunction over this position.
    pub fn or<T: Default>(&self, _first: T, _second: T) -> T {
        self.compose(MatcherKind::Or, 2);
        T::default()
    }

    /// Negates the placeholder evaluated just before.
    pub fn not<T: Default>(&self, _inner: T) -> T {
        self.compose(MatcherKind::Not, 1);
        T::default()
    }

    /// Matches string arguments against a regular expression.
    ///
    /// # Panics
    ///
    /// Panics (surfaced as [`Error::InvalidMatcher`] from the enclosing
    /// monitoring block) when the pattern does not compile.
    pub fn regex(&self, pattern: &str) -> String {
        match Matcher::regex(pattern) {
            Ok(matcher) => self.register(matcher),
            Err(err) => std::panic::panic_any(err),
        }
        String::new()
    }

    /// Matches string arguments starting with `prefix`.
    pub fn starts_with(&self, prefix: &str) -> String {
        self.register(Matcher::starts_with(prefix));
        String::new()
    }

    /// Matches string arguments ending with `suffix`.
    pub fn ends_with(&self, suffix: &str) -> String {
        self.register(Matcher::ends_with(suffix));
        String::new()
    }

    /// Matches arguments satisfying a user-supplied predicate. `desc`
    /// appears in diagnostics.
    pub fn custom<T: Default>(
        &self,
        desc: &str,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> T {
        self.register(Matcher::custom(desc, predicate));
        T::default()
    }
}

impl fmt::Debug for Matchers<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matchers")
    }
}
