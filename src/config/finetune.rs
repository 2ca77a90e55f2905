//! LoRA fine-tuning arguments and the fine-tuning bundle
//!
//! LoRA injects small trainable low-rank matrices into selected modules
//! instead of updating all weights; these arguments select the rank,
//! scaling, dropout, and target modules for that adaptation.

use serde::{Deserialize, Serialize};

use super::data::DataArguments;
use super::model::ModelArguments;
use super::training::TrainingArguments;
use super::validate::ValidationError;

/// Parameter-efficient fine-tuning method selector
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PeftMethod {
    /// Low-rank adaptation
    #[default]
    Lora,
}

/// Arguments for fine-tuning with a LoRA configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinetuneArguments {
    /// Rank of the low-rank decomposition
    #[serde(default = "default_lora_rank")]
    pub lora_rank: usize,

    /// Alpha scaling parameter
    #[serde(default = "default_lora_alpha")]
    pub lora_alpha: usize,

    /// Dropout probability applied to the adapter path
    #[serde(default = "default_lora_dropout")]
    pub lora_dropout: f32,

    /// Module names the adapters attach to
    #[serde(default = "default_target_modules")]
    pub lora_target_modules: Vec<String>,

    /// Parameter-efficient method to apply
    #[serde(default)]
    pub peft: PeftMethod,
}

fn default_lora_rank() -> usize {
    8
}

fn default_lora_alpha() -> usize {
    32
}

fn default_lora_dropout() -> f32 {
    0.1
}

fn default_target_modules() -> Vec<String> {
    vec!["q".to_string(), "v".to_string()]
}

impl Default for FinetuneArguments {
    fn default() -> Self {
        Self {
            lora_rank: default_lora_rank(),
            lora_alpha: default_lora_alpha(),
            lora_dropout: default_lora_dropout(),
            lora_target_modules: default_target_modules(),
            peft: PeftMethod::Lora,
        }
    }
}

impl FinetuneArguments {
    /// Create arguments with an explicit rank and alpha
    pub fn new(lora_rank: usize, lora_alpha: usize) -> Self {
        Self {
            lora_rank,
            lora_alpha,
            ..Self::default()
        }
    }

    /// Target specific modules by name
    #[must_use]
    pub fn target_modules(mut self, modules: &[&str]) -> Self {
        self.lora_target_modules = modules.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Set the adapter dropout probability
    #[must_use]
    pub fn dropout(mut self, dropout: f32) -> Self {
        self.lora_dropout = dropout;
        self
    }

    /// Check the record's invariants
    ///
    /// # Errors
    ///
    /// Returns an error for a zero rank, a dropout outside `[0, 1)`, or an
    /// empty target module list.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.lora_rank == 0 {
            return Err(ValidationError::InvalidLoraRank(self.lora_rank));
        }
        if !(0.0..1.0).contains(&self.lora_dropout) {
            return Err(ValidationError::InvalidLoraDropout(self.lora_dropout));
        }
        if self.lora_target_modules.is_empty() {
            return Err(ValidationError::EmptyTargetModules);
        }
        Ok(())
    }
}

/// Complete fine-tuning bundle handed to the external training procedure
///
/// A pure aggregate: it owns one of each argument group and carries no
/// invariants beyond its members'.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinetuningConfig {
    /// Model selection
    #[serde(default)]
    pub model_args: ModelArguments,

    /// Data sources and preprocessing limits
    #[serde(default)]
    pub data_args: DataArguments,

    /// Generic training-loop hyperparameters (consumed opaquely)
    #[serde(default)]
    pub training_args: TrainingArguments,

    /// LoRA fine-tuning arguments
    #[serde(default)]
    pub finetune_args: FinetuneArguments,
}

impl FinetuningConfig {
    /// Aggregate the four argument groups, validating each
    ///
    /// # Errors
    ///
    /// Propagates the first member validation failure.
    pub fn new(
        model_args: ModelArguments,
        data_args: DataArguments,
        training_args: TrainingArguments,
        finetune_args: FinetuneArguments,
    ) -> Result<Self, ValidationError> {
        let config = Self {
            model_args,
            data_args,
            training_args,
            finetune_args,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every member's invariants
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.model_args.validate()?;
        self.data_args.validate()?;
        self.training_args.validate()?;
        self.finetune_args.validate()?;
        Ok(())
    }
}
