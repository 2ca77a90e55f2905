//! Generic training-loop hyperparameters
//!
//! Consumed opaquely by the external trainer; charlar only carries the
//! record and checks the numeric ranges.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::validate::ValidationError;

/// Training hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingArguments {
    /// Number of epochs
    #[serde(default = "default_epochs")]
    pub num_train_epochs: usize,

    /// Learning rate
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Per-device batch size
    #[serde(default = "default_batch_size")]
    pub per_device_batch_size: usize,

    /// Weight decay
    #[serde(default = "default_weight_decay")]
    pub weight_decay: f64,

    /// Warmup ratio
    #[serde(default = "default_warmup_ratio")]
    pub warmup_ratio: f32,

    /// Gradient accumulation steps
    #[serde(default = "default_grad_accum")]
    pub gradient_accumulation_steps: usize,

    /// Maximum gradient norm
    #[serde(default = "default_max_grad_norm")]
    pub max_grad_norm: f32,

    /// Log metrics every N steps
    #[serde(default = "default_logging_steps")]
    pub logging_steps: usize,

    /// Save a checkpoint every N steps
    #[serde(default = "default_save_steps")]
    pub save_steps: usize,

    /// Output directory for checkpoints
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Random seed
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_epochs() -> usize {
    3
}
fn default_learning_rate() -> f64 {
    2e-4
}
fn default_batch_size() -> usize {
    8
}
fn default_weight_decay() -> f64 {
    0.01
}
fn default_warmup_ratio() -> f32 {
    0.03
}
fn default_grad_accum() -> usize {
    1
}
fn default_max_grad_norm() -> f32 {
    1.0
}
fn default_logging_steps() -> usize {
    10
}
fn default_save_steps() -> usize {
    500
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}
fn default_seed() -> u64 {
    42
}

impl Default for TrainingArguments {
    fn default() -> Self {
        Self {
            num_train_epochs: default_epochs(),
            learning_rate: default_learning_rate(),
            per_device_batch_size: default_batch_size(),
            weight_decay: default_weight_decay(),
            warmup_ratio: default_warmup_ratio(),
            gradient_accumulation_steps: default_grad_accum(),
            max_grad_norm: default_max_grad_norm(),
            logging_steps: default_logging_steps(),
            save_steps: default_save_steps(),
            output_dir: default_output_dir(),
            seed: default_seed(),
        }
    }
}

impl TrainingArguments {
    /// Check the record's numeric ranges
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.num_train_epochs == 0 {
            return Err(ValidationError::InvalidEpochs(self.num_train_epochs));
        }
        if self.learning_rate <= 0.0 {
            return Err(ValidationError::InvalidLearningRate(self.learning_rate));
        }
        if self.per_device_batch_size == 0 {
            return Err(ValidationError::InvalidBatchSize(
                self.per_device_batch_size,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = TrainingArguments::default();
        assert_eq!(args.num_train_epochs, 3);
        assert_eq!(args.per_device_batch_size, 8);
        assert_eq!(args.gradient_accumulation_steps, 1);
        assert_eq!(args.seed, 42);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_zero_epochs_fails() {
        let mut args = TrainingArguments::default();
        args.num_train_epochs = 0;
        assert!(matches!(
            args.validate(),
            Err(ValidationError::InvalidEpochs(0))
        ));
    }

    #[test]
    fn test_nonpositive_learning_rate_fails() {
        let mut args = TrainingArguments::default();
        args.learning_rate = 0.0;
        assert!(args.validate().is_err());
        args.learning_rate = -1e-4;
        assert!(matches!(
            args.validate(),
            Err(ValidationError::InvalidLearningRate(_))
        ));
    }

    #[test]
    fn test_zero_batch_size_fails() {
        let mut args = TrainingArguments::default();
        args.per_device_batch_size = 0;
        assert!(matches!(
            args.validate(),
            Err(ValidationError::InvalidBatchSize(0))
        ));
    }

    #[test]
    fn test_yaml_defaults() {
        let args: TrainingArguments = serde_yaml::from_str("{}").unwrap();
        assert_eq!(args.num_train_epochs, 3);
        assert_eq!(args.output_dir, PathBuf::from("./output"));
    }
}
