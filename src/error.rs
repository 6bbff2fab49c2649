use thiserror::Error;

/// The generic Error type, which provides coverage for all engine faults this
/// library can potentially return.
///
/// This enum covers the failure modes of the invocation lifecycle: monitoring
/// blocks, matcher-stack handling, and stub configuration/resolution. Each
/// variant provides specific context to enable appropriate error handling.
///
/// Verification failures are deliberately *not* part of this enum — they are
/// expected, caller-visible outcomes of normal use and live in
/// [`VerifyError`](crate::verify::VerifyError).
///
/// # Error Categories
///
/// ## Monitoring Errors
/// - [`Error::InvalidMockInvocation`] - A monitoring block selected no mocked
///   call, or a call reached the engine from an unrecognized receiver
///
/// ## Matcher Errors
/// - [`Error::InconsistentMatchers`] - Matcher-stack size mismatch at a
///   monitored call
/// - [`Error::IllegalMatcherState`] - Composite matcher built with too few
///   stack entries
/// - [`Error::InvalidMatcher`] - A matcher could not be constructed
///
/// ## Stubbing Errors
/// - [`Error::InvalidStubbing`] - A configured behavior cannot be applied to
///   the intercepted call
/// - [`Error::TypeMismatch`] - A stubbed value does not fit the intercepted
///   method's return type
#[derive(Error, Debug)]
pub enum Error {
    /// A monitoring block made no call on any substitute generated by this
    /// engine, or an intercepted call carried a receiver the engine does not
    /// recognize.
    ///
    /// Fatal to the monitoring block that raised it; the engine's state is
    /// left clean for subsequent blocks.
    #[error("invalid mock invocation: {0}")]
    InvalidMockInvocation(String),

    /// The matcher stack held a number of entries that is neither zero nor
    /// the monitored call's arity.
    ///
    /// The stack is reset to empty *before* this error propagates, so
    /// subsequent, unrelated monitoring blocks are unaffected.
    ///
    /// # Fields
    ///
    /// * `expected` - The monitored call's declared arity
    /// * `actual` - The number of matchers actually found on the stack
    #[error("inconsistent matchers: expected 0 or {expected} matcher(s) for this call, found {actual} (did you mix literals and matchers?)")]
    InconsistentMatchers {
        /// The monitored call's declared arity
        expected: usize,
        /// The number of matchers actually found on the stack
        actual: usize,
    },

    /// A composite matcher (`and`/`or`/`not`) was constructed with fewer
    /// child matchers on the stack than the combinator requires.
    ///
    /// Entries already consumed by earlier combinators are not corrupted.
    #[error("illegal matcher state: {0}")]
    IllegalMatcherState(String),

    /// A matcher could not be constructed, e.g. a regular-expression pattern
    /// that does not compile.
    #[error("invalid matcher: {0}")]
    InvalidMatcher(String),

    /// A configured stub cannot be applied to the intercepted call, e.g.
    /// `then_call_original()` on a method with no original body.
    ///
    /// Raised at call time, not at configuration time — the configuration
    /// cannot know in advance whether the intercepted call will require the
    /// original body.
    #[error("invalid stubbing: {0}")]
    InvalidStubbing(String),

    /// A stubbed value could not be converted to the intercepted method's
    /// concrete return type. This indicates a stubbing/generation mismatch,
    /// not an engine fault in the strict sense.
    #[error("type mismatch: stubbed value of type `{actual}` cannot be returned as `{expected}`")]
    TypeMismatch {
        /// The return type the intercepted method expects
        expected: &'static str,
        /// The concrete type of the configured value
        actual: &'static str,
    },
}
