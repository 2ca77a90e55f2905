//! Configuration validation
//!
//! All validation failures are fatal to the caller: a record that fails
//! `validate()` must not be handed to the trainer or a backend.

use thiserror::Error;

/// Validation error type
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("model_name_or_path must not be empty")]
    EmptyModelId,

    #[error("Need either a dataset name or a training/validation file")]
    MissingDataSource,

    #[error("Unsupported data file extension: {0} (must be csv, json, or txt)")]
    UnsupportedDataFile(String),

    #[error("Streaming requires data loader capability >= {required}, found {available}")]
    StreamingUnsupported { required: u32, available: u32 },

    #[error("Invalid LoRA rank: {0} (must be > 0)")]
    InvalidLoraRank(usize),

    #[error("Invalid LoRA dropout: {0} (must be in [0, 1))")]
    InvalidLoraDropout(f32),

    #[error("lora_target_modules must not be empty")]
    EmptyTargetModules,

    #[error("Invalid epochs: {0} (must be > 0)")]
    InvalidEpochs(usize),

    #[error("Invalid learning rate: {0} (must be > 0.0)")]
    InvalidLearningRate(f64),

    #[error("Invalid batch size: {0} (must be > 0)")]
    InvalidBatchSize(usize),

    #[error("Invalid validation split percentage: {0} (must be <= 100)")]
    InvalidSplitPercentage(usize),

    #[error("precision must not be empty")]
    EmptyPrecision,

    #[error("Precision {0:?} is listed in excluded_precisions")]
    ExcludedPrecision(String),
}
