//! Mock handles and the substitute-side interception contract.
//!
//! The engine never sees user trait objects. A *substitute* — generated or
//! hand-written — implements the mocked trait by routing every method through
//! its [`MockHandle`]: erase the arguments to [`Value`]s, call
//! [`MockHandle::invoke`] with the method's [`MethodSig`], and return the
//! result. The handle carries everything the engine needs to identify the
//! receiver; the substitute carries everything the engine cannot know (the
//! concrete signatures and, for spies, the original method bodies).
//!
//! A minimal hand-written substitute:
//!
//! ```rust
//! use molt::prelude::*;
//!
//! struct GreeterMock {
//!     handle: MockHandle,
//! }
//!
//! impl GreeterMock {
//!     fn new(engine: &Engine) -> Self {
//!         GreeterMock {
//!             handle: engine.register_mock("Greeter", false),
//!         }
//!     }
//!
//!     fn greet(&self, name: String) -> String {
//!         self.handle
//!             .invoke(sig!(greet(String) -> String), vec![Value::of(name)], None)
//!     }
//! }
//!
//! impl Mock for GreeterMock {
//!     fn mock_handle(&self) -> &MockHandle {
//!         &self.handle
//!     }
//! }
//!
//! let engine = Engine::new();
//! let mock = GreeterMock::new(&engine);
//! assert_eq!(mock.greet("world".to_string()), String::default());
//! ```

use std::fmt;
use std::panic::panic_any;
use std::sync::Arc;

use crate::engine::{Dispatch, Engine, Thrown};
use crate::invocation::ReceiverId;
use crate::types::{MethodSig, Value};
use crate::Error;

/// Implemented by every substitute, exposing its engine-side identity.
pub trait Mock {
    /// The handle this substitute routes its intercepted calls through.
    fn mock_handle(&self) -> &MockHandle;
}

/// One mock instance's connection to its engine.
///
/// Handles are created by [`Engine::register_mock`] and embedded in the
/// substitute. Identity is the handle's [`ReceiverId`]; two handles for the
/// same mocked type are still distinct mocks.
pub struct MockHandle {
    engine: Engine,
    id: ReceiverId,
    name: Arc<str>,
    call_through: bool,
}

impl MockHandle {
    pub(crate) fn new(engine: Engine, id: ReceiverId, name: Arc<str>, call_through: bool) -> Self {
        MockHandle {
            engine,
            id,
            name,
            call_through,
        }
    }

    /// The engine this mock is registered with.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// This mock's receiver identity.
    #[must_use]
    pub fn id(&self) -> ReceiverId {
        self.id
    }

    /// The display name given at registration, used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether unstubbed calls run the original method body (spy policy).
    #[must_use]
    pub fn call_through(&self) -> bool {
        self.call_through
    }

    /// Routes one intercepted call and converts the result back to the
    /// method's concrete return type.
    ///
    /// This is the whole shim contract: substitutes erase their arguments,
    /// call `invoke`, and return the result. `original` is the real method
    /// body where one exists (spies and `then_call_original()` need it).
    ///
    /// # Panics
    ///
    /// Stubbed failures propagate as panics carrying [`Thrown`]. Engine
    /// errors ([`Error`]) also propagate as panics; inside a monitoring
    /// block the engine catches those and surfaces them as the block's
    /// `Err`, outside one they fail the test loudly.
    pub fn invoke<R>(
        &self,
        sig: MethodSig,
        args: Vec<Value>,
        original: Option<&dyn Fn(&[Value]) -> Value>,
    ) -> R
    where
        R: Clone + Default + 'static,
    {
        match self.engine.dispatch(self, &sig, args, original) {
            Ok(Dispatch::Value(value)) => match value.extract::<R>() {
                Some(result) => result,
                None => panic_any(Error::TypeMismatch {
                    expected: std::any::type_name::<R>(),
                    actual: value.type_name(),
                }),
            },
            Ok(Dispatch::Raised(failure)) => panic_any(Thrown(failure)),
            Ok(Dispatch::Unstubbed) => self
                .engine
                .default_values()
                .provide::<R>()
                .unwrap_or_default(),
            Err(err) => panic_any(err),
        }
    }
}

impl fmt::Debug for MockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("call_through", &self.call_through)
            .finish()
    }
}

impl fmt::Display for MockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
