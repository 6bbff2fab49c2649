/// Builds a [`MethodSig`](crate::types::MethodSig) from function-like
/// notation.
///
/// The parameter list takes Rust types; the return type defaults to `()`
/// when the arrow is omitted.
///
/// ```rust
/// use molt::sig;
///
/// let combine = sig!(combine(String, String) -> String);
/// assert_eq!(combine.arity(), 2);
///
/// let ping = sig!(ping());
/// assert_eq!(format!("{ping}"), "ping() -> ()");
/// ```
#[macro_export]
macro_rules! sig {
    ($name:ident ( $($param:ty),* $(,)? ) -> $ret:ty) => {
        $crate::types::MethodSig::new(
            stringify!($name),
            vec![$($crate::types::TypeDesc::of::<$param>()),*],
            $crate::types::TypeDesc::of::<$ret>(),
        )
    };
    ($name:ident ( $($param:ty),* $(,)? )) => {
        $crate::sig!($name($($param),*) -> ())
    };
}
