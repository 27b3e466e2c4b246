//!
//! Tuples and Shapes
//!
//! A `Shape` is the ordered list of field kinds of a tuple. It is the
//! partition key of the tuple space: `("k", 42)` has shape `(str,int)` and
//! only ever meets templates of that same shape.
//!

use std::fmt;

use smallvec::SmallVec;

use crate::value::{Value, ValueKind};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape(SmallVec<[ValueKind; 8]>);

impl Shape {
    pub fn new(kinds: impl IntoIterator<Item = ValueKind>) -> Self {
        Self(kinds.into_iter().collect())
    }

    pub fn of(values: &[Value]) -> Self {
        Self::new(values.iter().map(Value::kind))
    }

    pub fn kinds(&self) -> &[ValueKind] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fields(f, self.0.iter())
    }
}

/// `(a,b,c)` without spaces
pub(crate) fn write_fields<I>(f: &mut fmt::Formatter<'_>, fields: I) -> fmt::Result
where
    I: IntoIterator,
    I::Item: fmt::Display,
{
    f.write_str("(")?;
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{field}")?;
    }
    f.write_str(")")
}

/// An immutable sequence of values
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple(Vec<Value>);

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn shape(&self) -> Shape {
        Shape::of(&self.0)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fields(f, self.0.iter())
    }
}

impl From<Vec<Value>> for Tuple {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

macro_rules! tuple_from_rust_tuple {
    ($($name:ident),+) => {
        impl<$($name),+> From<($($name,)+)> for Tuple
        where
            $($name: Into<Value>),+
        {
            #[allow(non_snake_case)]
            fn from(($($name,)+): ($($name,)+)) -> Self {
                Self(vec![$($name.into()),+])
            }
        }
    };
}

tuple_from_rust_tuple!(A);
tuple_from_rust_tuple!(A, B);
tuple_from_rust_tuple!(A, B, C);
tuple_from_rust_tuple!(A, B, C, D);
tuple_from_rust_tuple!(A, B, C, D, E);
tuple_from_rust_tuple!(A, B, C, D, E, F);
