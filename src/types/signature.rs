use std::fmt;

use crate::types::TypeDesc;

/// An exact method key: name plus parameter and return shapes.
///
/// Two signatures are the same method if and only if their names, parameter
/// descriptors, and return descriptors are all equal. Overloads therefore get
/// distinct signatures even when they share a name.
///
/// The [`sig!`](crate::sig) macro builds signatures from a function-like
/// notation:
///
/// ```rust
/// use molt::sig;
///
/// let s = sig!(combine(String, String) -> String);
/// assert_eq!(s.name(), "combine");
/// assert_eq!(s.arity(), 2);
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MethodSig {
    name: &'static str,
    params: Vec<TypeDesc>,
    ret: TypeDesc,
}

impl MethodSig {
    /// Creates a signature from its parts.
    #[must_use]
    pub fn new(name: &'static str, params: Vec<TypeDesc>, ret: TypeDesc) -> Self {
        MethodSig { name, params, ret }
    }

    /// The method name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The parameter shapes, in declaration order.
    #[must_use]
    pub fn params(&self) -> &[TypeDesc] {
        &self.params
    }

    /// The return shape.
    #[must_use]
    pub fn ret(&self) -> TypeDesc {
        self.ret
    }

    /// The declared number of parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Debug for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodSig({self})")
    }
}

impl fmt::Display for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}
