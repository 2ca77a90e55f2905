//! Declarative configuration records
//!
//! Argument containers for fine-tuning and serving a chat model, loadable
//! from YAML.
//!
//! # Example
//!
//! ```yaml
//! model_name_or_path: org/chat-model
//! device: cpu
//!
//! finetune_config:
//!   model_args:
//!     model_name_or_path: org/chat-model
//!   data_args:
//!     train_file: train.json
//!   finetune_args:
//!     lora_rank: 8
//!     lora_target_modules: [q, v]
//!
//! optimize_config:
//!   mode: latency
//!   precision: bf16
//! ```

mod chat;
mod cli;
mod data;
mod finetune;
mod model;
mod optimize;
mod training;
mod validate;

pub use chat::{ChatConfig, InputModality, DEFAULT_MODEL_ID};
pub use cli::{
    Cli, Command, InfoArgs, OutputFormat, QuantMethod, QuantizeArgs, ValidateArgs,
};
pub use data::{
    check_streaming_capability, DataArguments, DATA_LOADER_CAPABILITY,
    MIN_STREAMING_CAPABILITY, SUPPORTED_DATA_EXTENSIONS,
};
pub use finetune::{FinetuneArguments, FinetuningConfig, PeftMethod};
pub use model::ModelArguments;
pub use optimize::{OptimizationConfig, QuantApproach, TuningMode};
pub use training::TrainingArguments;
pub use validate::ValidationError;
