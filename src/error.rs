//! Error types for charlar

use thiserror::Error;

use crate::config::ValidationError;
use crate::hub::FetchError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Model fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("No backend matches model path: {0}")]
    NoBackend(String),

    #[error("Unknown conversation template: {0}")]
    UnknownTemplate(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;
