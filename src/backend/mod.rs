//! Chat model backend contract
//!
//! Defines the minimal polymorphic surface every concrete chat backend must
//! satisfy, independent of which model family it wraps. Construction of a
//! backend initializes its model and tokenizer handles exactly once; any
//! load failure is fatal to construction. Inference failures surface to the
//! caller per call and are never retried at this layer.
//!
//! A single backend instance is single-writer: concurrent `predict` calls
//! on the same instance require external serialization unless an
//! implementation documents otherwise.

mod registry;
mod safetensors_chat;
mod template;

pub use registry::BackendRegistry;
pub use safetensors_chat::{ModelHandle, SafeTensorsChat, TokenizerHandle};
pub use template::{get_template, ConvTemplate};

use crate::error::Result;

/// Generation parameters for a single prediction call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateParams {
    /// Raw user prompt (wrapped by the conversation template)
    pub prompt: String,
    /// Maximum tokens to generate per response
    pub max_new_tokens: usize,
    /// Sampling temperature
    pub temperature: f32,
    /// Top-p for nucleus sampling
    pub top_p: f32,
    /// Repetition penalty (1.0 = disabled)
    pub repetition_penalty: f32,
}

impl GenerateParams {
    /// Create parameters for a prompt with default generation knobs
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_new_tokens: 256,
            temperature: 0.7,
            top_p: 0.9,
            repetition_penalty: 1.0,
        }
    }

    /// Set the generation length cap
    #[must_use]
    pub fn max_new_tokens(mut self, max: usize) -> Self {
        self.max_new_tokens = max;
        self
    }

    /// Set the sampling temperature
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Finite, non-restartable sequence of partial outputs
///
/// Chunks arrive in generation order; concatenating every chunk yields the
/// same string `predict` returns for identical parameters.
pub struct ResponseStream {
    chunks: std::vec::IntoIter<String>,
}

impl ResponseStream {
    /// Wrap an ordered chunk sequence
    pub fn new(chunks: Vec<String>) -> Self {
        Self {
            chunks: chunks.into_iter(),
        }
    }

    /// Drain the stream into the complete response
    pub fn collect_text(self) -> String {
        self.chunks.collect()
    }
}

impl Iterator for ResponseStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.chunks.next()
    }
}

/// External text-generation collaborator
///
/// The actual decoding loop lives outside this crate; backends hand it the
/// template-wrapped prompt and surface its output or its error untouched.
pub trait InferenceEngine: Send + Sync {
    /// Generate a completion for a fully rendered prompt
    fn generate(&self, prompt: &str, params: &GenerateParams) -> Result<String>;
}

/// Contract every concrete chat model backend must satisfy
pub trait ChatModel: Send + Sync {
    /// Perform a single non-streaming inference call
    ///
    /// Returns the complete generated output, or an inference error.
    fn predict(&self, params: &GenerateParams) -> Result<String>;

    /// Produce partial outputs incrementally
    ///
    /// Draining the stream and concatenating its chunks yields exactly what
    /// `predict` returns for identical parameters.
    fn predict_stream(&self, params: &GenerateParams) -> Result<ResponseStream>;

    /// Declare whether this backend is the right one for a model path
    ///
    /// The registry probes candidates with this; the default claims every
    /// path.
    fn matches(&self, _model_path: &str) -> bool {
        true
    }

    /// Default conversation template for a model path
    fn default_template(&self, _model_path: &str) -> ConvTemplate {
        ConvTemplate::one_shot()
    }
}
