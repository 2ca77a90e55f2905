//! Top-level chat serving configuration
//!
//! Combines a model identifier, modality flags, device/backend selection,
//! and optional embedded fine-tuning and optimization configs. Constructed
//! once per session; when no sub-config is supplied, default instances are
//! synthesized from default-constructed arguments.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::finetune::FinetuningConfig;
use super::optimize::OptimizationConfig;
use super::validate::ValidationError;
use crate::error::{Error, Result};

/// Default model served when none is configured
pub const DEFAULT_MODEL_ID: &str = "meta-llama/Llama-2-70b-hf";

/// Input/output modality
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputModality {
    Text,
    Image,
    Audio,
}

/// Top-level serving configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Model to serve: hub identifier or local path
    #[serde(default = "default_model_id")]
    pub model_name_or_path: String,

    /// Accepted input modalities (None = text only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<InputModality>>,

    /// Target device ("auto" lets the backend decide)
    #[serde(default = "default_auto")]
    pub device: String,

    /// Execution backend ("auto" lets the registry decide)
    #[serde(default = "default_auto")]
    pub backend: String,

    /// Enable retrieval augmentation
    #[serde(default)]
    pub retrieval: bool,

    /// Retrieval variant, when retrieval is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_type: Option<String>,

    /// Enable text-to-image generation
    #[serde(default)]
    pub txt2image: bool,

    /// Accept audio input
    #[serde(default)]
    pub audio_input: bool,

    /// Produce audio output
    #[serde(default)]
    pub audio_output: bool,

    /// Run as a long-lived server rather than a one-shot session
    #[serde(default = "default_true")]
    pub server_mode: bool,

    /// Use device graph capture where the backend supports it
    #[serde(default)]
    pub use_hpu_graphs: bool,

    /// Fine-tuning bundle (default-synthesized when absent)
    #[serde(default)]
    pub finetune_config: FinetuningConfig,

    /// Post-training optimization job (default-synthesized when absent)
    #[serde(default)]
    pub optimize_config: OptimizationConfig,
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_auto() -> String {
    "auto".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model_name_or_path: default_model_id(),
            inputs: None,
            device: default_auto(),
            backend: default_auto(),
            retrieval: false,
            retrieval_type: None,
            txt2image: false,
            audio_input: false,
            audio_output: false,
            server_mode: true,
            use_hpu_graphs: false,
            finetune_config: FinetuningConfig::default(),
            optimize_config: OptimizationConfig::default(),
        }
    }
}

impl ChatConfig {
    /// Create a config serving the given model with defaults elsewhere
    pub fn new(model_name_or_path: impl Into<String>) -> Self {
        Self {
            model_name_or_path: model_name_or_path.into(),
            ..Self::default()
        }
    }

    /// Embed an explicit fine-tuning bundle
    #[must_use]
    pub fn with_finetune_config(mut self, config: FinetuningConfig) -> Self {
        self.finetune_config = config;
        self
    }

    /// Embed an explicit optimization job
    #[must_use]
    pub fn with_optimize_config(mut self, config: OptimizationConfig) -> Self {
        self.optimize_config = config;
        self
    }

    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::Serialization(format!("Failed to parse YAML: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_yaml()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Serialize to a YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize YAML: {e}")))
    }

    /// Check the serving-level invariants and the optimization job
    ///
    /// The embedded fine-tuning bundle is validated separately by the
    /// training driver; a serve-only session never populates it.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.model_name_or_path.is_empty() {
            return Err(ValidationError::EmptyModelId);
        }
        self.optimize_config.validate()?;
        Ok(())
    }
}
