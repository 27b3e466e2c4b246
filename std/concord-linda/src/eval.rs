//!
//! Asynchronous Tuple Evaluation
//!
//! `eval` takes a list of arguments, each one of:
//!
//! - `EvalArg::Value` - copied into the result as is
//! - `EvalArg::Thunk` - a closure, called once on the eval thread
//! - `EvalArg::Task` - a `Computed` object, asked for its value on the
//!   eval thread
//!
//! The result shape is made of the *result* kinds, so a thunk returning
//! `i64` contributes `int` to the shape. The bucket for that shape exists
//! as soon as `eval` returns; the tuple lands in it once every argument
//! has been computed.
//!

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::bucket::Bucket;
use crate::errors::LindaError;
use crate::tuple::{Shape, Tuple};
use crate::value::{TupleType, Value, ValueKind};

/// A value produced by running an object
pub trait Computed: Send + 'static {
    /// Kind of the value `compute` returns
    fn kind(&self) -> ValueKind;

    fn compute(self: Box<Self>) -> Value;
}

type Thunk = Box<dyn FnOnce() -> Value + Send>;

pub enum EvalArg {
    Value(Value),
    Thunk { kind: ValueKind, f: Thunk },
    Task(Box<dyn Computed>),
}

impl EvalArg {
    pub fn value(value: impl Into<Value>) -> Self {
        EvalArg::Value(value.into())
    }

    pub fn thunk<T, F>(f: F) -> Self
    where
        T: TupleType,
        F: FnOnce() -> T + Send + 'static,
    {
        EvalArg::Thunk {
            kind: T::KIND,
            f: Box::new(move || f().into_value()),
        }
    }

    pub fn task<C: Computed>(task: C) -> Self {
        EvalArg::Task(Box::new(task))
    }

    /// Kind this argument contributes to the result shape
    pub fn kind(&self) -> ValueKind {
        match self {
            EvalArg::Value(value) => value.kind(),
            EvalArg::Thunk { kind, .. } => *kind,
            EvalArg::Task(task) => task.kind(),
        }
    }

    fn resolve(self) -> Value {
        match self {
            EvalArg::Value(value) => value,
            EvalArg::Thunk { f, .. } => f(),
            EvalArg::Task(task) => task.compute(),
        }
    }
}

impl std::fmt::Debug for EvalArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalArg::Value(value) => f.debug_tuple("Value").field(value).finish(),
            EvalArg::Thunk { kind, .. } => f.debug_struct("Thunk").field("kind", kind).finish(),
            EvalArg::Task(task) => f.debug_struct("Task").field("kind", &task.kind()).finish(),
        }
    }
}

impl From<Value> for EvalArg {
    fn from(value: Value) -> Self {
        EvalArg::Value(value)
    }
}

pub(crate) fn result_shape(args: &[EvalArg]) -> Shape {
    Shape::new(args.iter().map(EvalArg::kind))
}

/// Counts eval tasks that have not published their tuple yet
#[derive(Default)]
pub(crate) struct EvalTracker {
    active: Mutex<usize>,
    idle: Condvar,
}

impl EvalTracker {
    fn active(&self) -> MutexGuard<'_, usize> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) {
        *self.active() += 1;
    }

    fn finish(&self) {
        let mut active = self.active();
        *active = active.saturating_sub(1);
        if *active == 0 {
            self.idle.notify_all();
        }
    }

    pub(crate) fn pending(&self) -> usize {
        *self.active()
    }

    pub(crate) fn wait_idle(&self) {
        let mut active = self.active();
        while *active > 0 {
            active = self.idle.wait(active).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Returns false if tasks were still running at the timeout
    pub(crate) fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        let active = self.active();
        let (active, _) = self
            .idle
            .wait_timeout_while(active, timeout, |n| *n > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *active == 0
    }
}

struct TaskGuard(Arc<EvalTracker>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Completion handle for one `eval`. Dropping it detaches the task.
#[derive(Debug)]
pub struct EvalHandle {
    shape: Shape,
    done: Receiver<Result<Tuple, LindaError>>,
}

impl EvalHandle {
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Wait for the task and return the tuple it published
    pub fn join(self) -> Result<Tuple, LindaError> {
        self.done
            .recv()
            .unwrap_or(Err(LindaError::EvalPanicked { shape: self.shape }))
    }
}

fn compute(args: Vec<EvalArg>) -> Result<Tuple, LindaError> {
    let mut values = Vec::with_capacity(args.len());
    for (position, arg) in args.into_iter().enumerate() {
        let declared = arg.kind();
        let value = arg.resolve();
        if value.kind() != declared {
            return Err(LindaError::EvalKindMismatch {
                position,
                declared,
                produced: value.kind(),
            });
        }
        values.push(value);
    }
    Ok(Tuple::new(values))
}

/// Run `args` on a detached thread and insert the result into `bucket`
pub(crate) fn spawn(
    bucket: Arc<Bucket>,
    args: Vec<EvalArg>,
    tracker: &Arc<EvalTracker>,
) -> Result<EvalHandle, LindaError> {
    let shape = bucket.shape().clone();
    let (tx, rx) = mpsc::channel();

    tracker.begin();
    let guard = TaskGuard(Arc::clone(tracker));
    let task_shape = shape.clone();

    std::thread::Builder::new()
        .name(format!("eval{shape}"))
        .spawn(move || {
            let _guard = guard;
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| compute(args))) {
                Ok(Ok(tuple)) => bucket.insert(tuple.clone()).map(|()| tuple),
                Ok(Err(err)) => Err(err),
                Err(_) => Err(LindaError::EvalPanicked { shape: task_shape }),
            };
            if let Err(err) = &outcome {
                tracing::warn!(shape = %bucket.shape(), error = %err, "eval task failed");
            }
            let _ = tx.send(outcome);
        })
        .map_err(|err| LindaError::Spawn {
            reason: err.to_string(),
        })?;

    Ok(EvalHandle { shape, done: rx })
}
