//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AcerBufferError {
    /// Sampling was requested before any rollout was admitted.
    #[error("Replay buffer is empty")]
    EmptyBuffer,

    /// An array does not have the shape fixed by the configuration or by the first admission.
    #[error("Invalid shape of {field}: expected {expected:?}, got {actual:?}")]
    InvalidShape {
        /// Name of the offending array.
        field: &'static str,
        /// Expected shape.
        expected: Vec<usize>,
        /// Shape that was given.
        actual: Vec<usize>,
    },

    /// An index is outside of the range of stored slots or environments.
    #[error("Index {index} of {field} is out of bounds (bound = {bound})")]
    IndexOutOfBounds {
        /// Name of the indexed axis.
        field: &'static str,
        /// The offending index.
        index: usize,
        /// Exclusive upper bound.
        bound: usize,
    },

    /// Configuration value error.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A thread panicked while holding the lock of a shared buffer.
    #[error("Lock of the shared replay buffer is poisoned")]
    LockPoisoned,
}
