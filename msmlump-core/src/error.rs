//! Error type shared by the msmlump crates.

use thiserror::Error;

/// Result alias used throughout msmlump.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    #[error("matrix is singular (zero pivot at column {0})")]
    Singular(usize),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("no usable data: {0}")]
    Empty(String),

    #[error("index {index} out of range for {len} states")]
    OutOfRange { index: usize, len: usize },

    #[error("did not converge: {0}")]
    NoConvergence(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
