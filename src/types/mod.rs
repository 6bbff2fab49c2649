//! Dynamically typed values and type descriptors.
//!
//! Mocked methods are erased at the engine boundary: every argument and return
//! value travels through the engine as a [`Value`], a reference-counted
//! `dyn Any` container that additionally captures structural equality and a
//! `Debug` rendering at construction time. [`TypeDesc`] is the lightweight
//! type descriptor used to key method signatures and the default-value
//! override table.
//!
//! # Key Components
//!
//! - [`Value`] - Type-erased argument/return container
//! - [`TypeDesc`] - `TypeId` plus human-readable name for one Rust type
//! - [`MethodSig`] - Exact method key: name, parameter shapes, return shape
//! - [`DefaultValueProvider`] - Fallback values for unstubbed calls

mod defaults;
mod signature;

pub use defaults::DefaultValueProvider;
pub use signature::MethodSig;

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A type-erased, shareable value.
///
/// Wraps any `T: PartialEq + Debug + Send + Sync + 'static` behind an
/// `Arc<dyn Any>`, capturing two pieces of behavior that `dyn Any` alone
/// cannot offer:
///
/// - **structural equality** against other [`Value`]s of the same concrete
///   type (values of different concrete types never compare equal), and
/// - a **`Debug` rendering** taken at construction time, so diagnostics can
///   print arguments without knowing their types.
///
/// Cloning a [`Value`] is cheap; the payload is shared, never copied.
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
    eq: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
    repr: Arc<str>,
}

impl Value {
    /// Wraps a concrete value.
    pub fn of<T>(value: T) -> Self
    where
        T: PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        let repr: Arc<str> = format!("{value:?}").into();
        let inner: Arc<T> = Arc::new(value);
        let probe = Arc::clone(&inner);
        let eq: Arc<dyn Fn(&Value) -> bool + Send + Sync> =
            Arc::new(move |other: &Value| other.downcast_ref::<T>().is_some_and(|b| *probe == *b));

        Value {
            inner,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            eq,
            repr,
        }
    }

    /// The unit value, used as the recorded result of `()`-returning methods.
    #[must_use]
    pub fn unit() -> Self {
        Value::of(())
    }

    /// Borrows the payload as `T`, if the payload is a `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Clones the payload out as an owned `T`, if the payload is a `T`.
    #[must_use]
    pub fn extract<T: Clone + 'static>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    /// Returns true if the payload is a `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// The `TypeId` of the wrapped value.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The type name of the wrapped value, as reported by `std::any::type_name`.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Structural equality against another [`Value`].
    ///
    /// True only when `other` wraps the same concrete type and the payloads
    /// compare equal via `PartialEq`. Two `Option::<T>::None` values wrapped
    /// as `Option<T>` therefore compare equal through the ordinary
    /// `PartialEq` impl.
    #[must_use]
    pub fn structurally_eq(&self, other: &Value) -> bool {
        (self.eq)(other)
    }

    /// Borrows the payload as a string slice when it is a `String` or a
    /// `&'static str`. Used by the text-oriented matchers.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| self.downcast_ref::<&'static str>().copied())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repr)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repr)
    }
}

/// A descriptor for one Rust type: its `TypeId` plus a readable name.
///
/// Used as the parameter/return shape inside [`MethodSig`] and as the key of
/// the [`DefaultValueProvider`] override table.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDesc {
    id: TypeId,
    name: &'static str,
}

impl TypeDesc {
    /// The descriptor for `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        TypeDesc {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The `TypeId` this descriptor stands for.
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The fully qualified type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The last path segment of the type name, for compact diagnostics.
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDesc({})", self.name)
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}
