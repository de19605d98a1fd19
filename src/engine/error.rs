//! Node errors and their transience.

use std::fmt;
use std::sync::Arc;

/// Whether an error stays valid across evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transience {
    /// A pure function of the inputs; memoized until the inputs are invalidated.
    Persistent,
    /// Caused by ephemeral state (e.g. I/O); recomputed on the next evaluation.
    Transient,
}

/// An error produced by a node, shared between every node that depends on it.
#[derive(Debug)]
pub struct NodeError<E> {
    error: Arc<E>,
    transience: Transience,
}

impl<E> NodeError<E> {
    pub fn new(error: E, transience: Transience) -> Self {
        NodeError {
            error: Arc::new(error),
            transience,
        }
    }

    pub fn persistent(error: E) -> Self {
        Self::new(error, Transience::Persistent)
    }

    pub fn transient(error: E) -> Self {
        Self::new(error, Transience::Transient)
    }

    pub fn error(&self) -> &E {
        &self.error
    }

    pub fn transience(&self) -> Transience {
        self.transience
    }

    pub fn is_transient(&self) -> bool {
        self.transience == Transience::Transient
    }

    /// Replace the error, keeping its transience.
    pub fn map<T>(self, f: impl FnOnce(&E) -> T) -> NodeError<T> {
        NodeError {
            error: Arc::new(f(&self.error)),
            transience: self.transience,
        }
    }
}

impl<E> Clone for NodeError<E> {
    fn clone(&self) -> Self {
        NodeError {
            error: Arc::clone(&self.error),
            transience: self.transience,
        }
    }
}

impl<E: fmt::Display> fmt::Display for NodeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.error, f)
    }
}

impl<E: std::error::Error + 'static> std::error::Error for NodeError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}
