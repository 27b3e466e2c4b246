//!
//! Shape Buckets
//!
//! One bucket per shape: the tuples of that shape in insertion order plus
//! the condition its blocked readers wait on. Every insert releases all
//! waiters, each of which rescans the bucket; a waiter that loses the race
//! for the new tuple simply waits again.
//!

use std::cell::RefCell;
use std::time::Instant;

use concord_core::diagnostics::{self, TraceEvent};
use concord_sync::{CondFactory, Monitor, Monitorable, RankedCondition};

use crate::errors::LindaError;
use crate::template::Template;
use crate::tuple::{Shape, Tuple};

/// What to do with a matching tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFound {
    Keep,
    Remove,
}

/// What to do when nothing matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMissing {
    Block,
    Return,
}

struct BucketState {
    tuples: RefCell<Vec<Tuple>>,
    arrived: RankedCondition,
}

impl Monitorable for BucketState {
    fn create(conds: &CondFactory) -> Self {
        Self {
            tuples: RefCell::new(Vec::new()),
            arrived: conds.condition(),
        }
    }
}

impl BucketState {
    fn take_first(&self, template: &Template, on_found: OnFound) -> Option<Tuple> {
        let mut tuples = self.tuples.borrow_mut();
        let pos = tuples.iter().position(|t| template.matches(t))?;
        Some(match on_found {
            OnFound::Keep => tuples[pos].clone(),
            OnFound::Remove => tuples.remove(pos),
        })
    }
}

pub(crate) struct Bucket {
    shape: Shape,
    state: Monitor<BucketState>,
}

impl Bucket {
    pub(crate) fn new(shape: Shape) -> Self {
        Self {
            shape,
            state: Monitor::default(),
        }
    }

    pub(crate) fn shape(&self) -> &Shape {
        &self.shape
    }

    pub(crate) fn insert(&self, tuple: Tuple) -> Result<(), LindaError> {
        let state = self.state.enter()?;
        diagnostics::emit(&TraceEvent::TupleInserted { tuple: &tuple });
        state.tuples.borrow_mut().push(tuple);
        state.arrived.signal_all();
        Ok(())
    }

    /// Scan for the first tuple matching `template`. With `OnMissing::Block`
    /// the call waits for inserts until a match appears or `deadline` passes.
    pub(crate) fn find(
        &self,
        template: &Template,
        on_found: OnFound,
        on_missing: OnMissing,
        deadline: Option<Instant>,
    ) -> Result<Option<Tuple>, LindaError> {
        let state = self.state.enter()?;
        loop {
            if let Some(tuple) = state.take_first(template, on_found) {
                let event = match on_found {
                    OnFound::Keep => TraceEvent::TupleMatched { tuple: &tuple },
                    OnFound::Remove => TraceEvent::TupleRemoved { tuple: &tuple },
                };
                diagnostics::emit(&event);
                return Ok(Some(tuple));
            }

            if on_missing == OnMissing::Return {
                return Ok(None);
            }

            diagnostics::emit(&TraceEvent::TupleBlocked { template });
            match deadline {
                None => state.arrived.wait(0)?,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    state.arrived.wait_timeout(0, deadline - now)?;
                }
            }
        }
    }

    pub(crate) fn len(&self) -> Result<usize, LindaError> {
        Ok(self.state.with(|s| s.tuples.borrow().len())?)
    }

    pub(crate) fn waiters(&self) -> Result<usize, LindaError> {
        Ok(self.state.with(|s| s.arrived.len())?)
    }
}
