//! # molt Prelude
//!
//! This module provides a convenient prelude for the most commonly used types
//! and traits from the molt library. Import this module to get quick access
//! to the essential pieces for stubbing and verifying mocked calls.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all engine operations
pub use crate::Error;

/// The result type used throughout molt
pub use crate::Result;

/// Verification failures (distinct from engine errors)
pub use crate::verify::VerifyError;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The mocking engine: owner of all state, entry point for every operation
pub use crate::engine::Engine;

/// The fluent matcher-placeholder surface
pub use crate::engine::Matchers;

// ================================================================================================
// Substitutes
// ================================================================================================

/// The substitute-side contract and per-mock identity
pub use crate::mock::{Mock, MockHandle};

/// The routed result of an intercepted call, and the stubbed-failure panic payload
pub use crate::engine::{Dispatch, Thrown};

// ================================================================================================
// Data Model
// ================================================================================================

/// Erased argument/return values and type descriptors
pub use crate::types::{DefaultValueProvider, MethodSig, TypeDesc, Value};

/// Recorded calls and the templates that select them
pub use crate::invocation::{ArgSpec, CallTemplate, Invocation, Outcome, ReceiverId};

// ================================================================================================
// Stubbing and Verification
// ================================================================================================

/// The fluent stubbing chain and its extension points
pub use crate::stubs::{AnswerFn, DelegateTarget, SideEffectFn, StubKind, Stubber};

/// Argument matchers
pub use crate::matchers::{Matcher, MatcherKind};

/// Call-count and ordering assertions
pub use crate::verify::{Cardinality, MultiVerifier, Verifier};

// ================================================================================================
// Macros
// ================================================================================================

/// Function-like construction of [`MethodSig`] values
pub use crate::sig;
