//! The view of the graph a node function sees while it runs.

use std::collections::HashMap;

use crate::engine::{Entry, NodeError, NodeFunction};

/// Dependency access for one node computation.
///
/// Every key requested through the environment is recorded as a dependency
/// of the running node. Keys that have not been computed yet are recorded as
/// missing; the node is restarted once all of them are available.
pub struct Env<'a, F: NodeFunction> {
    memo: &'a HashMap<F::Key, Entry<F>>,
    bubbled: &'a HashMap<F::Key, NodeError<F::Error>>,
    deps: Vec<F::Key>,
    missing: Vec<F::Key>,
}

impl<'a, F: NodeFunction> Env<'a, F> {
    pub(crate) fn new(
        memo: &'a HashMap<F::Key, Entry<F>>,
        bubbled: &'a HashMap<F::Key, NodeError<F::Error>>,
    ) -> Self {
        Env {
            memo,
            bubbled,
            deps: Vec::new(),
            missing: Vec::new(),
        }
    }

    /// Request the value of `key`.
    ///
    /// Returns `Ok(None)` if it is not computed yet, and the dependency's
    /// error if it failed.
    pub fn get(&mut self, key: F::Key) -> Result<Option<F::Value>, NodeError<F::Error>> {
        if !self.deps.contains(&key) {
            self.deps.push(key.clone());
        }

        if let Some(error) = self.bubbled.get(&key) {
            return Err(error.clone());
        }

        match self.memo.get(&key) {
            Some(Entry::Done(value)) => Ok(Some(value.clone())),
            Some(Entry::Failed(error)) => Err(error.clone()),
            None => {
                if !self.missing.contains(&key) {
                    self.missing.push(key);
                }
                Ok(None)
            }
        }
    }

    /// Request several keys at once.
    ///
    /// All keys are requested before anything is returned, so every missing
    /// one is scheduled in the same round. The first error in `keys` order
    /// wins over missing values.
    pub fn get_all(
        &mut self,
        keys: impl IntoIterator<Item = F::Key>,
    ) -> Result<Option<Vec<F::Value>>, NodeError<F::Error>> {
        let mut values = Vec::new();
        let mut first_error = None;
        let mut any_missing = false;

        for key in keys {
            match self.get(key) {
                Ok(Some(value)) => values.push(value),
                Ok(None) => any_missing = true,
                Err(error) => {
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None if any_missing => Ok(None),
            None => Ok(Some(values)),
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<F::Key>, Vec<F::Key>) {
        (self.deps, self.missing)
    }
}
