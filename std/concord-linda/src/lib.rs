//!
//! concord-linda - Linda Tuple Space
//!
//! An associative store of heterogeneous tuples shared between threads,
//! partitioned by shape (the ordered list of field kinds).
//!
//! ## Operations
//!
//! - `out(tuple)` - insert and wake blocked readers of that shape
//! - `in_(template)` / `inp(template)` - remove a match (blocking / probe)
//! - `rd(template)` / `rdp(template)` - read a match (blocking / probe)
//! - `eval(args)` - compute arguments on a background thread, then `out`
//!
//! Templates mix literals with typed captures:
//!
//! ```rust,ignore
//! use concord_linda::{out, in_, template, tuple};
//!
//! out(tuple!("k", 42))?;
//! let m = in_(&template!("k", ?i64))?;
//! assert_eq!(m.capture::<i64>(0)?, 42);
//! ```
//!
//! The free functions operate on `TupleSpace::global()`; independent
//! spaces can be created with `TupleSpace::new()` and passed explicitly.
//!

mod bucket;
pub mod errors;
pub mod eval;
mod macros;
pub mod space;
pub mod template;
pub mod tuple;
pub mod value;

pub use bucket::{OnFound, OnMissing};
pub use errors::LindaError;
pub use eval::{Computed, EvalArg, EvalHandle};
pub use space::TupleSpace;
pub use template::{CaptureSlot, Field, Match, Template};
pub use tuple::{Shape, Tuple};
pub use value::{TupleType, Value, ValueKind};

/// `out` on the global space
pub fn out(tuple: impl Into<Tuple>) -> Result<(), LindaError> {
    TupleSpace::global().out(tuple)
}

/// `in` on the global space
pub fn in_(template: &Template) -> Result<Match, LindaError> {
    TupleSpace::global().in_(template)
}

/// `inp` on the global space
pub fn inp(template: &Template) -> Result<Option<Match>, LindaError> {
    TupleSpace::global().inp(template)
}

/// `rd` on the global space
pub fn rd(template: &Template) -> Result<Match, LindaError> {
    TupleSpace::global().rd(template)
}

/// `rdp` on the global space
pub fn rdp(template: &Template) -> Result<Option<Match>, LindaError> {
    TupleSpace::global().rdp(template)
}

/// `eval` on the global space
pub fn eval(args: Vec<EvalArg>) -> Result<EvalHandle, LindaError> {
    TupleSpace::global().eval(args)
}
