//!
//! Tuple and template literals.
//!
//! - `tuple!("k", 42)` builds a `Tuple`
//! - `template!("k", ?i64)` builds a `Template`; `?Type` marks a capture
//!

#[macro_export]
macro_rules! tuple {
    ($($value:expr),+ $(,)?) => {
        $crate::Tuple::new(vec![$($crate::Value::from($value)),+])
    };
}

#[macro_export]
macro_rules! template {
    (@fields $acc:expr ;) => {
        $acc
    };
    (@fields $acc:expr ; ? $ty:ty $(, $($rest:tt)*)?) => {
        $crate::template!(@fields $acc.capture::<$ty>() ; $($($rest)*)?)
    };
    (@fields $acc:expr ; $value:expr $(, $($rest:tt)*)?) => {
        $crate::template!(@fields $acc.lit($value) ; $($($rest)*)?)
    };
    ($($fields:tt)*) => {
        $crate::template!(@fields $crate::Template::new() ; $($fields)*)
    };
}
