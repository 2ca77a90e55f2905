//! Training/evaluation data arguments
//!
//! Identifies the data sources for fine-tuning and their preprocessing
//! limits. Validation is fatal: a record that names no data source, points
//! at an unrecognized file type, or requests streaming from a loader that
//! cannot provide it must never reach the trainer.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::validate::ValidationError;

/// File extensions accepted for file-based data sources
pub const SUPPORTED_DATA_EXTENSIONS: [&str; 3] = ["csv", "json", "txt"];

/// Capability version reported by the streaming data loader collaborator
pub const DATA_LOADER_CAPABILITY: u32 = 2;

/// Minimum loader capability required for streaming mode
pub const MIN_STREAMING_CAPABILITY: u32 = 2;

/// Arguments pertaining to the data used for training and evaluation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataArguments {
    /// Name of a catalog dataset to load
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,

    /// Configuration name of the catalog dataset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_config_name: Option<String>,

    /// Input training data file (csv, json, or txt)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_file: Option<PathBuf>,

    /// Optional evaluation data file (csv, json, or txt)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_file: Option<PathBuf>,

    /// Truncate the number of training examples (debugging / quick runs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_train_samples: Option<usize>,

    /// Truncate the number of evaluation examples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_eval_samples: Option<usize>,

    /// Maximum total input sequence length after tokenization
    #[serde(default = "default_max_source_length")]
    pub max_source_length: usize,

    /// Maximum total target sequence length after tokenization
    #[serde(default = "default_max_target_length")]
    pub max_target_length: usize,

    /// Enable streaming mode
    #[serde(default)]
    pub streaming: bool,

    /// Overwrite the cached training and evaluation sets
    #[serde(default)]
    pub overwrite_cache: bool,

    /// Percentage of the train set used as validation when no split exists
    #[serde(default = "default_validation_split")]
    pub validation_split_percentage: usize,

    /// Number of processes to use for preprocessing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessing_num_workers: Option<usize>,
}

fn default_max_source_length() -> usize {
    512
}

fn default_max_target_length() -> usize {
    256
}

fn default_validation_split() -> usize {
    1
}

impl DataArguments {
    /// Create an empty record; a data source must be set before `validate`
    pub fn new() -> Self {
        Self {
            max_source_length: default_max_source_length(),
            max_target_length: default_max_target_length(),
            validation_split_percentage: default_validation_split(),
            ..Self::default()
        }
    }

    /// Use a catalog dataset as the data source
    #[must_use]
    pub fn dataset(mut self, name: impl Into<String>) -> Self {
        self.dataset_name = Some(name.into());
        self
    }

    /// Use a local training file as the data source
    #[must_use]
    pub fn train_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.train_file = Some(path.into());
        self
    }

    /// Use a local evaluation file
    #[must_use]
    pub fn validation_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.validation_file = Some(path.into());
        self
    }

    /// Enable streaming mode
    #[must_use]
    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Check the record's invariants
    ///
    /// # Errors
    ///
    /// - `MissingDataSource` when no dataset name and no file is set
    /// - `UnsupportedDataFile` when a file lacks a csv/json/txt extension
    /// - `StreamingUnsupported` when streaming is requested but the data
    ///   loader's capability version is below the required minimum
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.streaming {
            check_streaming_capability(DATA_LOADER_CAPABILITY)?;
        }

        if self.dataset_name.is_none()
            && self.train_file.is_none()
            && self.validation_file.is_none()
        {
            return Err(ValidationError::MissingDataSource);
        }

        if let Some(train) = &self.train_file {
            check_extension(train)?;
        }
        if let Some(val) = &self.validation_file {
            check_extension(val)?;
        }

        if self.validation_split_percentage > 100 {
            return Err(ValidationError::InvalidSplitPercentage(
                self.validation_split_percentage,
            ));
        }

        Ok(())
    }
}

/// Reject file paths outside the supported extension set
fn check_extension(path: &Path) -> Result<(), ValidationError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    if SUPPORTED_DATA_EXTENSIONS.contains(&ext) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedDataFile(
            path.display().to_string(),
        ))
    }
}

/// Check a reported loader capability version against the streaming minimum
pub fn check_streaming_capability(available: u32) -> Result<(), ValidationError> {
    if available < MIN_STREAMING_CAPABILITY {
        return Err(ValidationError::StreamingUnsupported {
            required: MIN_STREAMING_CAPABILITY,
            available,
        });
    }
    Ok(())
}
