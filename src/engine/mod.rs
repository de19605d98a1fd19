//! Incremental evaluation engine.
//!
//! Work is expressed as nodes identified by keys. A [`NodeFunction`] computes
//! the value of a key and asks its [`Env`] for the values of other keys. When
//! a dependency has not been computed yet the function returns `Ok(None)`;
//! the [`Evaluator`] then computes the missing dependencies and runs the
//! function again from the start. No worker thread ever waits on another
//! node, so node functions must be pure functions of the values they read.
//!
//! Results, including persistent errors, are memoized by key for the
//! lifetime of the evaluator.

pub mod env;
pub mod error;
pub mod evaluator;

use std::fmt;
use std::hash::Hash;

pub use env::Env;
pub use error::{NodeError, Transience};
pub use evaluator::{EvaluationOptions, EvaluationResult, EvaluationStats, Evaluator};

/// Result of a single node computation.
///
/// `Ok(None)` means a dependency was missing and the node must be restarted.
pub type NodeResult<F> =
    Result<Option<<F as NodeFunction>::Value>, NodeError<<F as NodeFunction>::Error>>;

/// The computation behind every node of a graph.
pub trait NodeFunction: Send + Sync + Sized {
    type Key: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync;
    type Value: Clone + Send + Sync;
    type Error: fmt::Debug + fmt::Display + Send + Sync;

    /// Compute the value of `key`.
    ///
    /// Must return `Ok(None)` only when `env` reported a missing dependency,
    /// and must not keep any state between calls.
    fn compute(&self, key: &Self::Key, env: &mut Env<'_, Self>) -> NodeResult<Self>;

    /// Error reported for `key` when it is part of a dependency cycle.
    fn cycle_error(&self, key: &Self::Key, cycle: &[Self::Key]) -> Self::Error;

    /// Error reported for `key` when it returned no value without any
    /// missing dependency.
    fn incomplete_error(&self, key: &Self::Key) -> Self::Error;
}

/// A memoized node outcome.
pub(crate) enum Entry<F: NodeFunction> {
    Done(F::Value),
    Failed(NodeError<F::Error>),
}

impl<F: NodeFunction> Entry<F> {
    pub(crate) fn is_failed(&self) -> bool {
        matches!(self, Entry::Failed(_))
    }
}

impl<F: NodeFunction> Clone for Entry<F> {
    fn clone(&self) -> Self {
        match self {
            Entry::Done(value) => Entry::Done(value.clone()),
            Entry::Failed(error) => Entry::Failed(error.clone()),
        }
    }
}
