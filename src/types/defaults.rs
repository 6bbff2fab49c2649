use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::types::{TypeDesc, Value};

/// Supplies the value an unstubbed mocked call returns.
///
/// The policy follows the usual "zero-equivalent" rules: `0` for the numeric
/// kinds, `false` for `bool`, `'\0'` for `char`, the empty `String`, and `()`
/// for unit. Anything else falls back to the substitute's own
/// `Default::default()` at the call site, unless an override has been
/// registered here.
///
/// Overrides are keyed by concrete type and may be registered and removed at
/// runtime:
///
/// ```rust
/// use molt::prelude::*;
///
/// let engine = Engine::new();
/// engine.default_values().register::<Vec<i32>>(|| vec![0]);
/// assert_eq!(engine.default_values().provide::<Vec<i32>>(), Some(vec![0]));
///
/// engine.default_values().remove::<Vec<i32>>();
/// assert_eq!(engine.default_values().provide::<Vec<i32>>(), None);
/// ```
pub struct DefaultValueProvider {
    table: DashMap<TypeId, Arc<dyn Fn() -> Value + Send + Sync>>,
}

macro_rules! register_zero_defaults {
    ($provider:expr, $($ty:ty => $zero:expr),+ $(,)?) => {
        $($provider.register::<$ty>(|| $zero);)+
    };
}

impl DefaultValueProvider {
    /// Creates a provider with the zero-equivalent built-ins pre-registered.
    #[must_use]
    pub(crate) fn new() -> Self {
        let provider = DefaultValueProvider {
            table: DashMap::new(),
        };

        register_zero_defaults!(provider,
            i8 => 0, i16 => 0, i32 => 0, i64 => 0, i128 => 0, isize => 0,
            u8 => 0, u16 => 0, u32 => 0, u64 => 0, u128 => 0, usize => 0,
            f32 => 0.0, f64 => 0.0,
            bool => false,
            char => '\0',
            () => (),
            String => String::new(),
        );

        provider
    }

    /// Registers (or replaces) the default value factory for `T`.
    pub fn register<T>(&self, factory: impl Fn() -> T + Send + Sync + 'static)
    where
        T: PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        self.table
            .insert(TypeId::of::<T>(), Arc::new(move || Value::of(factory())));
    }

    /// Removes the registered default for `T`, built-ins included.
    pub fn remove<T: 'static>(&self) {
        self.table.remove(&TypeId::of::<T>());
    }

    /// Looks up the default for a type descriptor as an erased [`Value`].
    #[must_use]
    pub fn value_for(&self, desc: &TypeDesc) -> Option<Value> {
        self.table.get(&desc.id()).map(|factory| factory())
    }

    /// Looks up the default for `T` as a concrete value.
    #[must_use]
    pub fn provide<T: Clone + 'static>(&self) -> Option<T> {
        self.value_for(&TypeDesc::of::<T>())
            .and_then(|v| v.extract::<T>())
    }
}

impl fmt::Debug for DefaultValueProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultValueProvider")
            .field("registered", &self.table.len())
            .finish()
    }
}
