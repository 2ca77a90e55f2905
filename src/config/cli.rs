//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! charlar validate chat.yaml
//! charlar info chat.yaml --format yaml
//! charlar quantize model.safetensors --output model_q4.json --bits 4
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Charlar: chat-model fine-tuning & serving configuration
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "charlar")]
#[command(version)]
#[command(about = "Chat-model fine-tuning and serving configuration with weight-only quantization")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Validate a serving configuration file
    Validate(ValidateArgs),

    /// Display information about a configuration
    Info(InfoArgs),

    /// Quantize safetensors weights to a low-bit format
    Quantize(QuantizeArgs),
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Show detailed validation report
    #[arg(short, long)]
    pub detailed: bool,

    /// Also validate the embedded fine-tuning bundle
    #[arg(long)]
    pub finetune: bool,
}

/// Arguments for the info command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InfoArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Output format (text, json, yaml)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the quantize command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct QuantizeArgs {
    /// Path to a safetensors model file
    #[arg(value_name = "MODEL")]
    pub model: PathBuf,

    /// Output path for the quantized weights
    #[arg(short, long)]
    pub output: PathBuf,

    /// Quantization bits (4 or 8)
    #[arg(short, long, default_value = "4")]
    pub bits: u8,

    /// Quantization method (symmetric or asymmetric)
    #[arg(short, long, default_value = "symmetric")]
    pub method: QuantMethod,

    /// Elements per quantization block
    #[arg(long, default_value = "32")]
    pub block_size: usize,
}

/// Output format for the info command
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

/// Quantization method selector
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantMethod {
    Symmetric,
    Asymmetric,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_validate() {
        let cli = Cli::try_parse_from(["charlar", "validate", "chat.yaml", "--detailed"]).unwrap();
        match cli.command {
            Command::Validate(args) => {
                assert_eq!(args.config, PathBuf::from("chat.yaml"));
                assert!(args.detailed);
                assert!(!args.finetune);
            }
            _ => panic!("expected validate command"),
        }
    }

    #[test]
    fn test_parse_info_format() {
        let cli =
            Cli::try_parse_from(["charlar", "info", "chat.yaml", "--format", "json"]).unwrap();
        match cli.command {
            Command::Info(args) => assert_eq!(args.format, OutputFormat::Json),
            _ => panic!("expected info command"),
        }
    }

    #[test]
    fn test_parse_quantize_defaults() {
        let cli = Cli::try_parse_from([
            "charlar",
            "quantize",
            "model.safetensors",
            "--output",
            "out.json",
        ])
        .unwrap();
        match cli.command {
            Command::Quantize(args) => {
                assert_eq!(args.bits, 4);
                assert_eq!(args.method, QuantMethod::Symmetric);
                assert_eq!(args.block_size, 32);
            }
            _ => panic!("expected quantize command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["charlar", "--verbose", "validate", "c.yaml"]).unwrap();
        assert!(cli.verbose);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_missing_subcommand_fails() {
        assert!(Cli::try_parse_from(["charlar"]).is_err());
    }
}
