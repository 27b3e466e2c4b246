//!
//! Tuple space error types.
//!
//! A probe that finds nothing is not an error; it returns `Ok(None)`.
//!

use concord_sync::SyncError;
use thiserror::Error;

use crate::tuple::Shape;
use crate::value::ValueKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LindaError {
    #[error("Tuples and templates need at least one field")]
    EmptyTuple,

    #[error("Capture {index} out of range ({captured} captured)")]
    CaptureOutOfRange { index: usize, captured: usize },

    #[error("Capture {index} holds a {found}, not a {expected}")]
    CaptureType {
        index: usize,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("Capture {index} holds {value}, which does not fit in {target}")]
    CaptureRange {
        index: usize,
        value: String,
        target: &'static str,
    },

    #[error("eval argument {position} produced a {produced} where {declared} was declared")]
    EvalKindMismatch {
        position: usize,
        declared: ValueKind,
        produced: ValueKind,
    },

    #[error("eval arguments have shape {found}, expected {expected}")]
    EvalShapeMismatch { expected: Shape, found: Shape },

    #[error("eval task for {shape} panicked")]
    EvalPanicked { shape: Shape },

    #[error("Failed to spawn eval task: {reason}")]
    Spawn { reason: String },

    #[error(transparent)]
    Sync(#[from] SyncError),
}
