//! Error types for qat-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<Option<usize>>,
        got: Vec<usize>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid quantizer state: {0}")]
    InvalidState(String),
}

impl Error {
    /// Shape mismatch where every expected dimension is known
    pub fn shape(expected: &[usize], got: &[usize]) -> Self {
        Error::ShapeMismatch {
            expected: expected.iter().copied().map(Some).collect(),
            got: got.to_vec(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
