//!
//! Templates and Matches
//!
//! A template is a tuple pattern whose fields are either literals, which
//! must equal the stored field, or captures, which match any value that
//! reads back as the capture's type (`?u32` skips negative ints). A capture
//! contributes its kind to the template's shape, so
//! `("k", ?i64)` and `("k", 42)` share the shape `(str,int)`.
//!
//! Matching binds a stored tuple to the template; captured values are
//! read back by capture index:
//!
//! ```rust,ignore
//! let m = space.in_(&Template::new().lit("k").capture::<i64>())?;
//! let x: i64 = m.capture(0)?;
//! ```
//!

use std::fmt;

use crate::errors::LindaError;
use crate::tuple::{write_fields, Shape, Tuple};
use crate::value::{TupleType, Value, ValueKind};

/// The Rust type a capture reads back as
#[derive(Clone, Copy)]
pub struct CaptureSlot {
    kind: ValueKind,
    type_name: &'static str,
    fits: fn(&Value) -> bool,
}

fn any_value(_: &Value) -> bool {
    true
}

impl CaptureSlot {
    pub fn of<T: TupleType>() -> Self {
        Self {
            kind: T::KIND,
            type_name: std::any::type_name::<T>(),
            fits: T::fits,
        }
    }

    /// Accepts every value of `kind`
    pub fn any(kind: ValueKind) -> Self {
        Self {
            kind,
            type_name: kind.as_str(),
            fits: any_value,
        }
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn accepts(&self, value: &Value) -> bool {
        value.kind() == self.kind && (self.fits)(value)
    }
}

impl PartialEq for CaptureSlot {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.type_name == other.type_name
    }
}

impl fmt::Debug for CaptureSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CaptureSlot({})", self.type_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Literal(Value),
    Capture(CaptureSlot),
}

impl Field {
    pub fn kind(&self) -> ValueKind {
        match self {
            Field::Literal(value) => value.kind(),
            Field::Capture(slot) => slot.kind(),
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            Field::Literal(expected) => expected == value,
            Field::Capture(slot) => slot.accepts(value),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Literal(value) => write!(f, "{value}"),
            Field::Capture(_) => f.write_str("?"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    fields: Vec<Field>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lit(mut self, value: impl Into<Value>) -> Self {
        self.fields.push(Field::Literal(value.into()));
        self
    }

    /// Capture a field readable as `T`; out-of-range integers don't match
    pub fn capture<T: TupleType>(mut self) -> Self {
        self.fields.push(Field::Capture(CaptureSlot::of::<T>()));
        self
    }

    pub fn capture_kind(mut self, kind: ValueKind) -> Self {
        self.fields.push(Field::Capture(CaptureSlot::any(kind)));
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn shape(&self) -> Shape {
        Shape::new(self.fields.iter().map(Field::kind))
    }

    pub fn matches(&self, tuple: &Tuple) -> bool {
        self.fields.len() == tuple.len()
            && self
                .fields
                .iter()
                .zip(tuple.values())
                .all(|(field, value)| field.accepts(value))
    }

    /// Pair a matched tuple with this template's capture positions
    pub(crate) fn bind(&self, tuple: Tuple) -> Match {
        let captures = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, field)| matches!(field, Field::Capture(_)))
            .map(|(i, _)| i)
            .collect();
        Match { tuple, captures }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fields(f, self.fields.iter())
    }
}

impl From<&Tuple> for Template {
    fn from(tuple: &Tuple) -> Self {
        Self {
            fields: tuple.values().iter().cloned().map(Field::Literal).collect(),
        }
    }
}

/// A tuple found in the space together with the template's capture slots
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    tuple: Tuple,
    captures: Vec<usize>,
}

impl Match {
    /// Value bound to the `index`-th capture of the template
    pub fn capture<T: TupleType>(&self, index: usize) -> Result<T, LindaError> {
        let value = self.captured(index)?;
        if let Some(captured) = T::from_value(value) {
            return Ok(captured);
        }
        if value.kind() == T::KIND {
            return Err(LindaError::CaptureRange {
                index,
                value: value.to_string(),
                target: std::any::type_name::<T>(),
            });
        }
        Err(LindaError::CaptureType {
            index,
            expected: T::KIND,
            found: value.kind(),
        })
    }

    pub fn captured(&self, index: usize) -> Result<&Value, LindaError> {
        self.captures
            .get(index)
            .and_then(|&pos| self.tuple.get(pos))
            .ok_or(LindaError::CaptureOutOfRange {
                index,
                captured: self.captures.len(),
            })
    }

    pub fn capture_count(&self) -> usize {
        self.captures.len()
    }

    pub fn tuple(&self) -> &Tuple {
        &self.tuple
    }

    pub fn into_tuple(self) -> Tuple {
        self.tuple
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_and_int() -> Template {
        Template::new().lit("k").capture::<i64>()
    }

    #[test]
    fn test_capture_takes_kind_into_shape() {
        assert_eq!(key_and_int().shape(), Tuple::from(("k", 42)).shape());
        assert_ne!(
            Template::new().lit("k").capture::<f64>().shape(),
            Tuple::from(("k", 42)).shape()
        );
    }

    #[test]
    fn test_matching() {
        let template = key_and_int();
        assert!(template.matches(&Tuple::from(("k", 42))));
        assert!(!template.matches(&Tuple::from(("j", 42))));
        assert!(!template.matches(&Tuple::from(("k", "42"))));
        assert!(!template.matches(&Tuple::from(("k", 42, 1))));
    }

    #[test]
    fn test_narrow_capture_rejects_out_of_range() {
        let unsigned = Template::new().lit("k").capture::<u32>();
        assert!(unsigned.matches(&Tuple::from(("k", 7))));
        assert!(!unsigned.matches(&Tuple::from(("k", -1))));
        assert!(!unsigned.matches(&Tuple::from(("k", i64::from(u32::MAX) + 1))));

        let any_int = Template::new().lit("k").capture_kind(ValueKind::Int);
        assert!(any_int.matches(&Tuple::from(("k", -1))));
        assert_eq!(any_int.shape(), unsigned.shape());
        assert_ne!(any_int, unsigned);
    }

    #[test]
    fn test_bind_and_read_captures() {
        let template = Template::new()
            .capture::<String>()
            .lit(1)
            .capture::<bool>();
        let m = template.bind(Tuple::from(("name", 1, true)));

        assert_eq!(m.capture_count(), 2);
        assert_eq!(m.capture::<String>(0).unwrap(), "name");
        assert!(m.capture::<bool>(1).unwrap());
        assert_eq!(
            m.capture::<i64>(0),
            Err(LindaError::CaptureType {
                index: 0,
                expected: ValueKind::Int,
                found: ValueKind::Str,
            })
        );
        assert_eq!(
            m.capture::<bool>(2),
            Err(LindaError::CaptureOutOfRange {
                index: 2,
                captured: 2,
            })
        );
    }

    #[test]
    fn test_reading_a_wide_capture_as_narrow_type() {
        let m = Template::new()
            .capture::<i64>()
            .bind(Tuple::from((-1,)));
        assert_eq!(
            m.capture::<u32>(0),
            Err(LindaError::CaptureRange {
                index: 0,
                value: "-1".to_string(),
                target: "u32",
            })
        );
        assert_eq!(m.capture::<i64>(0).unwrap(), -1);
    }

    #[test]
    fn test_display_marks_captures() {
        insta::assert_snapshot!(key_and_int(), @"(k,?)");
        insta::assert_snapshot!(Template::from(&Tuple::from(("a", 'b'))), @"(a,b)");
    }
}
