//! Model selection arguments
//!
//! Identifies which pretrained model, tokenizer, and config to load, plus
//! cache and authentication options. Pure data; the hub fetcher and the
//! backends consume these fields when initializing model handles.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::validate::ValidationError;

/// Arguments pertaining to which model/config/tokenizer to fine-tune or serve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArguments {
    /// Path to a pretrained model, or a hub model identifier ("org/name")
    #[serde(default)]
    pub model_name_or_path: String,

    /// Pretrained config name or path, if not the same as the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_name: Option<String>,

    /// Pretrained tokenizer name or path, if not the same as the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer_name: Option<String>,

    /// Where downloaded model artifacts are cached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Use the fast tokenizer implementation when available
    #[serde(default = "default_true")]
    pub use_fast_tokenizer: bool,

    /// Model revision: branch name, tag, or commit id
    #[serde(default = "default_revision")]
    pub model_revision: String,

    /// Authenticate with the stored hub token (required for private models)
    #[serde(default)]
    pub use_auth_token: bool,
}

fn default_true() -> bool {
    true
}

fn default_revision() -> String {
    "main".to_string()
}

impl Default for ModelArguments {
    fn default() -> Self {
        Self {
            model_name_or_path: String::new(),
            config_name: None,
            tokenizer_name: None,
            cache_dir: None,
            use_fast_tokenizer: true,
            model_revision: default_revision(),
            use_auth_token: false,
        }
    }
}

impl ModelArguments {
    /// Create arguments for a model identifier or local path
    pub fn new(model_name_or_path: impl Into<String>) -> Self {
        Self {
            model_name_or_path: model_name_or_path.into(),
            ..Self::default()
        }
    }

    /// Set the model revision
    #[must_use]
    pub fn revision(mut self, rev: impl Into<String>) -> Self {
        self.model_revision = rev.into();
        self
    }

    /// Set the cache directory
    #[must_use]
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Authenticate hub requests with the stored token
    #[must_use]
    pub fn with_auth_token(mut self, use_auth: bool) -> Self {
        self.use_auth_token = use_auth;
        self
    }

    /// Name or path of the tokenizer to load
    ///
    /// Falls back to the model identifier when no separate tokenizer is set.
    #[must_use]
    pub fn tokenizer_source(&self) -> &str {
        self.tokenizer_name
            .as_deref()
            .unwrap_or(&self.model_name_or_path)
    }

    /// Check the record's invariants
    ///
    /// # Errors
    ///
    /// Returns `EmptyModelId` if no model identifier was given.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.model_name_or_path.is_empty() {
            return Err(ValidationError::EmptyModelId);
        }
        Ok(())
    }
}
