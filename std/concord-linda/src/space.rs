//!
//! Tuple Space
//!
//! Maps each shape to its bucket. The map lock is held only while a bucket
//! is looked up or created; all tuple traffic then goes through the
//! bucket's own monitor, so unrelated shapes never contend.
//!
//! Buckets are created on first use and never removed. A probe (`inp`,
//! `rdp`) on a shape nobody has used yet returns `Ok(None)` without
//! creating one.
//!
//! ## Operations
//!
//! | call | on match | no match |
//! |------|----------|----------|
//! | `in_` | remove | block |
//! | `inp` | remove | `None` |
//! | `rd` | keep | block |
//! | `rdp` | keep | `None` |
//!

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use indexmap::IndexMap;

use crate::bucket::{Bucket, OnFound, OnMissing};
use crate::errors::LindaError;
use crate::eval::{self, EvalArg, EvalHandle, EvalTracker};
use crate::template::{Match, Template};
use crate::tuple::{Shape, Tuple};

static GLOBAL: OnceLock<TupleSpace> = OnceLock::new();

#[derive(Default)]
pub struct TupleSpace {
    buckets: Mutex<IndexMap<Shape, Arc<Bucket>>>,
    evals: Arc<EvalTracker>,
}

impl TupleSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide space behind the free functions
    pub fn global() -> &'static TupleSpace {
        GLOBAL.get_or_init(TupleSpace::new)
    }

    fn buckets(&self) -> MutexGuard<'_, IndexMap<Shape, Arc<Bucket>>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bucket(&self, shape: &Shape) -> Arc<Bucket> {
        let mut buckets = self.buckets();
        if let Some(bucket) = buckets.get(shape) {
            return Arc::clone(bucket);
        }
        tracing::trace!(shape = %shape, "creating bucket");
        let bucket = Arc::new(Bucket::new(shape.clone()));
        buckets.insert(shape.clone(), Arc::clone(&bucket));
        bucket
    }

    fn existing_bucket(&self, shape: &Shape) -> Option<Arc<Bucket>> {
        self.buckets().get(shape).cloned()
    }

    /// Insert a tuple and wake every reader blocked on its shape
    pub fn out(&self, tuple: impl Into<Tuple>) -> Result<(), LindaError> {
        let tuple = tuple.into();
        if tuple.is_empty() {
            return Err(LindaError::EmptyTuple);
        }
        self.bucket(&tuple.shape()).insert(tuple)
    }

    /// Shared matching routine behind `in_`, `inp`, `rd`, `rdp` and the
    /// timed variants.
    pub fn find(
        &self,
        template: &Template,
        on_found: OnFound,
        on_missing: OnMissing,
        timeout: Option<Duration>,
    ) -> Result<Option<Match>, LindaError> {
        if template.is_empty() {
            return Err(LindaError::EmptyTuple);
        }
        let deadline = timeout.map(|t| Instant::now() + t);
        let shape = template.shape();

        let bucket = match on_missing {
            OnMissing::Return => match self.existing_bucket(&shape) {
                Some(bucket) => bucket,
                None => return Ok(None),
            },
            OnMissing::Block => self.bucket(&shape),
        };

        let found = bucket.find(template, on_found, on_missing, deadline)?;
        Ok(found.map(|tuple| template.bind(tuple)))
    }

    fn wait_for(&self, template: &Template, on_found: OnFound) -> Result<Match, LindaError> {
        loop {
            if let Some(found) = self.find(template, on_found, OnMissing::Block, None)? {
                return Ok(found);
            }
        }
    }

    /// Remove a matching tuple, blocking until one exists
    pub fn in_(&self, template: &Template) -> Result<Match, LindaError> {
        self.wait_for(template, OnFound::Remove)
    }

    /// Remove a matching tuple if one exists right now
    pub fn inp(&self, template: &Template) -> Result<Option<Match>, LindaError> {
        self.find(template, OnFound::Remove, OnMissing::Return, None)
    }

    /// Read a matching tuple without removing it, blocking until one exists
    pub fn rd(&self, template: &Template) -> Result<Match, LindaError> {
        self.wait_for(template, OnFound::Keep)
    }

    /// Read a matching tuple if one exists right now
    pub fn rdp(&self, template: &Template) -> Result<Option<Match>, LindaError> {
        self.find(template, OnFound::Keep, OnMissing::Return, None)
    }

    pub fn in_timeout(
        &self,
        template: &Template,
        timeout: Duration,
    ) -> Result<Option<Match>, LindaError> {
        self.find(template, OnFound::Remove, OnMissing::Block, Some(timeout))
    }

    pub fn rd_timeout(
        &self,
        template: &Template,
        timeout: Duration,
    ) -> Result<Option<Match>, LindaError> {
        self.find(template, OnFound::Keep, OnMissing::Block, Some(timeout))
    }

    /// Compute `args` on a background thread and `out` the result. Returns
    /// as soon as the task is spawned; the result shape's bucket already
    /// exists at that point.
    pub fn eval(&self, args: Vec<EvalArg>) -> Result<EvalHandle, LindaError> {
        if args.is_empty() {
            return Err(LindaError::EmptyTuple);
        }
        let bucket = self.bucket(&eval::result_shape(&args));
        eval::spawn(bucket, args, &self.evals)
    }

    /// Like `eval`, but first checks the arguments against the shape the
    /// caller expects the result to have.
    pub fn eval_as(&self, expected: &Shape, args: Vec<EvalArg>) -> Result<EvalHandle, LindaError> {
        let found = eval::result_shape(&args);
        if found != *expected {
            if let Some((position, (&declared, &produced))) = expected
                .kinds()
                .iter()
                .zip(found.kinds())
                .enumerate()
                .find(|(_, (a, b))| a != b)
            {
                return Err(LindaError::EvalKindMismatch {
                    position,
                    declared,
                    produced,
                });
            }
            return Err(LindaError::EvalShapeMismatch {
                expected: expected.clone(),
                found,
            });
        }
        self.eval(args)
    }

    /// Block until every eval task spawned on this space has finished
    pub fn wait_evals(&self) {
        self.evals.wait_idle();
    }

    /// Bounded `wait_evals`; false if tasks were still running
    pub fn wait_evals_timeout(&self, timeout: Duration) -> bool {
        self.evals.wait_idle_timeout(timeout)
    }

    pub fn pending_evals(&self) -> usize {
        self.evals.pending()
    }

    /// Number of buckets created so far
    pub fn shape_count(&self) -> usize {
        self.buckets().len()
    }

    pub fn shapes(&self) -> Vec<Shape> {
        self.buckets().keys().cloned().collect()
    }

    /// Tuples currently stored under `shape`
    pub fn len_of(&self, shape: &Shape) -> Result<usize, LindaError> {
        match self.existing_bucket(shape) {
            Some(bucket) => bucket.len(),
            None => Ok(0),
        }
    }

    /// Readers currently blocked on `shape`
    pub fn waiters_on(&self, shape: &Shape) -> Result<usize, LindaError> {
        match self.existing_bucket(shape) {
            Some(bucket) => bucket.waiters(),
            None => Ok(0),
        }
    }
}

impl std::fmt::Debug for TupleSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TupleSpace")
            .field("shapes", &self.shape_count())
            .field("pending_evals", &self.pending_evals())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;
    use std::thread;

    #[test]
    fn test_round_trip() {
        let space = TupleSpace::new();
        space.out(("k", 42)).unwrap();

        let template = Template::new().lit("k").capture::<i64>();
        let found = space.in_(&template).unwrap();
        assert_eq!(found.capture::<i64>(0).unwrap(), 42);
        assert!(space.inp(&template).unwrap().is_none());
    }

    #[test]
    fn test_rd_keeps_tuple() {
        let space = TupleSpace::new();
        space.out(("k", 1)).unwrap();
        let template = Template::new().lit("k").capture::<i64>();
        assert!(space.rdp(&template).unwrap().is_some());
        assert!(space.rd(&template).is_ok());
        assert_eq!(space.len_of(&template.shape()).unwrap(), 1);
    }

    #[test]
    fn test_narrow_capture_leaves_out_of_range_tuple() {
        let space = TupleSpace::new();
        space.out(("k", -1)).unwrap();

        let unsigned = Template::new().lit("k").capture::<u32>();
        assert!(space.inp(&unsigned).unwrap().is_none());
        assert!(space.rdp(&unsigned).unwrap().is_none());
        assert_eq!(space.len_of(&unsigned.shape()).unwrap(), 1);

        let signed = Template::new().lit("k").capture::<i64>();
        let found = space.inp(&signed).unwrap().unwrap();
        assert_eq!(found.capture::<i64>(0).unwrap(), -1);
    }

    #[test]
    fn test_probe_on_unknown_shape_creates_no_bucket() {
        let space = TupleSpace::new();
        let template = Template::new().capture::<bool>();
        assert!(space.rdp(&template).unwrap().is_none());
        assert!(space.inp(&template).unwrap().is_none());
        assert_eq!(space.shape_count(), 0);
    }

    #[test]
    fn test_buckets_are_never_evicted() {
        let space = TupleSpace::new();
        space.out(("a",)).unwrap();
        space.in_(&Template::new().lit("a")).unwrap();
        assert_eq!(space.shape_count(), 1);
        assert_eq!(space.len_of(&Shape::new([ValueKind::Str])).unwrap(), 0);
    }

    #[test]
    fn test_empty_tuple_rejected() {
        let space = TupleSpace::new();
        assert_eq!(space.out(Tuple::new(Vec::new())), Err(LindaError::EmptyTuple));
        assert_eq!(space.inp(&Template::new()).unwrap_err(), LindaError::EmptyTuple);
        assert_eq!(space.eval(Vec::new()).unwrap_err(), LindaError::EmptyTuple);
    }

    #[test]
    fn test_timed_read_gives_up() {
        let space = TupleSpace::new();
        let template = Template::new().lit("never").capture::<i64>();
        let found = space.in_timeout(&template, Duration::from_millis(20)).unwrap();
        assert!(found.is_none());
        assert_eq!(space.waiters_on(&template.shape()).unwrap(), 0);
    }

    #[test]
    fn test_eval_as_checks_declared_shape() {
        let space = TupleSpace::new();
        let expected = Shape::new([ValueKind::Str, ValueKind::Float]);
        let err = space
            .eval_as(
                &expected,
                vec![EvalArg::value("x"), EvalArg::thunk(|| 1i64)],
            )
            .unwrap_err();
        assert_eq!(
            err,
            LindaError::EvalKindMismatch {
                position: 1,
                declared: ValueKind::Float,
                produced: ValueKind::Int,
            }
        );
        assert_eq!(space.shape_count(), 0);

        let err = space
            .eval_as(&expected, vec![EvalArg::value("x")])
            .unwrap_err();
        assert!(matches!(err, LindaError::EvalShapeMismatch { .. }));
    }

    #[test]
    fn test_eval_publishes_result() {
        let space = TupleSpace::new();
        let handle = space
            .eval(vec![EvalArg::value("sum"), EvalArg::thunk(|| (1..=10).sum::<i64>())])
            .unwrap();
        assert_eq!(space.shape_count(), 1);

        assert_eq!(handle.join().unwrap(), Tuple::from(("sum", 55)));
        let found = space
            .in_(&Template::new().lit("sum").capture::<i64>())
            .unwrap();
        assert_eq!(found.capture::<i64>(0).unwrap(), 55);
        space.wait_evals();
        assert_eq!(space.pending_evals(), 0);
    }

    #[test]
    fn test_panicking_eval_reported() {
        let space = TupleSpace::new();
        let handle = space
            .eval(vec![EvalArg::thunk(|| -> i64 { panic!("eval failure") })])
            .unwrap();
        assert!(matches!(handle.join(), Err(LindaError::EvalPanicked { .. })));
        space.wait_evals();
        assert_eq!(space.len_of(&Shape::new([ValueKind::Int])).unwrap(), 0);
    }

    #[test]
    fn test_concurrent_producers_and_consumers() {
        let space = Arc::new(TupleSpace::new());
        let template = Template::new().lit("job").capture::<i64>();

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let space = Arc::clone(&space);
                let template = template.clone();
                thread::spawn(move || {
                    (0..25)
                        .map(|_| space.in_(&template).unwrap().capture::<i64>(0).unwrap())
                        .sum::<i64>()
                })
            })
            .collect();

        for i in 0..100i64 {
            space.out(("job", i)).unwrap();
        }

        let total: i64 = consumers.into_iter().map(|c| c.join().unwrap()).sum();
        assert_eq!(total, (0..100).sum::<i64>());
        assert_eq!(space.len_of(&template.shape()).unwrap(), 0);
    }
}
