//! # Charlar: Chat-Model Fine-Tuning & Serving Configuration
//!
//! Charlar provides the configuration records and backend contract for a chat
//! model serving stack: model/data/LoRA fine-tuning arguments, post-training
//! optimization settings, a top-level serving config, an object-safe chat
//! backend trait with conversation templates and a probing registry, and a
//! weight-only block-quantized linear operator surface.
//!
//! ## Architecture
//!
//! - **config**: Declarative argument records with YAML load/save and fatal
//!   construction-time validation
//! - **backend**: `ChatModel` trait, conversation templates, backend registry
//! - **hub**: Model artifact fetching (revision, auth token, cache dir)
//! - **quant**: Weight-only S4/S8 block quantization and quantized matmul

pub mod backend;
pub mod config;
pub mod hub;
pub mod quant;

pub mod error;

// Re-export commonly used types
pub use backend::{ChatModel, GenerateParams, ResponseStream};
pub use config::{ChatConfig, FinetuningConfig, OptimizationConfig};
pub use error::{Error, Result};
