use std::sync::{Mutex, PoisonError};
use std::thread::{self, ThreadId};

use dashmap::DashMap;

use crate::invocation::{CallTemplate, InvocationRecorder};
use crate::matchers::MatcherStack;

/// All engine state belonging to one logical execution context.
///
/// A context is an OS thread: `when(...)`/`assert_mock(...)` correlate "the
/// most recent call in *this* context" with the configuration chain that
/// follows, so none of this state may bleed across threads.
#[derive(Debug, Default)]
pub(crate) struct ContextState {
    /// The matcher-placeholder stack for the active monitoring block.
    pub(crate) matcher_stack: MatcherStack,
    /// Monitored-call frames; a stack, so monitoring blocks may nest.
    monitored_frames: Vec<Vec<CallTemplate>>,
    /// The permanent call log for this context.
    pub(crate) recorder: InvocationRecorder,
}

impl ContextState {
    /// True while at least one monitoring block is active on this context.
    pub(crate) fn monitoring(&self) -> bool {
        !self.monitored_frames.is_empty()
    }

    pub(crate) fn start_monitored_frame(&mut self) {
        self.monitored_frames.push(Vec::new());
    }

    /// Pops the innermost frame, yielding its captured templates in call
    /// order. Empty when the frame saw no mocked calls.
    pub(crate) fn end_monitored_frame(&mut self) -> Vec<CallTemplate> {
        self.monitored_frames.pop().unwrap_or_default()
    }

    /// Appends a template to the innermost active frame.
    pub(crate) fn record_monitored(&mut self, template: CallTemplate) {
        if let Some(frame) = self.monitored_frames.last_mut() {
            frame.push(template);
        }
    }

    /// Clears everything: stack, frames, and recorded history.
    pub(crate) fn reset(&mut self) {
        self.matcher_stack.clear();
        self.monitored_frames.clear();
        self.recorder.reset();
    }
}

/// The per-context state store: an isolated [`ContextState`] per thread.
///
/// Each context's mutex is only ever contended by its own thread; the map
/// exists so one engine value can serve arbitrarily many threads without any
/// global. The lock is never held across user code — dispatch takes what it
/// needs, releases, then runs effects.
pub(crate) struct ContextStore {
    contexts: DashMap<ThreadId, Mutex<ContextState>>,
}

impl ContextStore {
    pub(crate) fn new() -> Self {
        ContextStore {
            contexts: DashMap::new(),
        }
    }

    /// Runs `f` against the calling thread's state, creating it on first use.
    ///
    /// Calls must never nest — the closure must not re-enter the store.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut ContextState) -> R) -> R {
        let entry = self
            .contexts
            .entry(thread::current().id())
            .or_insert_with(|| Mutex::new(ContextState::default()));
        let mut guard = entry.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl std::fmt::Debug for ContextStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextStore")
            .field("contexts", &self.contexts.len())
            .finish()
    }
}
