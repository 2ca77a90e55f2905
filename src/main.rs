//! Charlar CLI
//!
//! # Usage
//!
//! ```bash
//! # Validate a serving config
//! charlar validate chat.yaml
//!
//! # Show config info
//! charlar info chat.yaml --format yaml
//!
//! # Quantize safetensors weights
//! charlar quantize model.safetensors --output model_q4.json --bits 4
//! ```

use clap::Parser;
use charlar::config::{Cli, Command, OutputFormat, QuantMethod};
use charlar::ChatConfig;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        LogLevel::Quiet
    } else if cli.verbose {
        LogLevel::Verbose
    } else {
        LogLevel::Normal
    };

    let result = match cli.command {
        Command::Validate(args) => run_validate(args, log_level),
        Command::Info(args) => run_info(args, log_level),
        Command::Quantize(args) => run_quantize(args, log_level),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum LogLevel {
    Quiet,
    Normal,
    Verbose,
}

fn log(level: LogLevel, required: LogLevel, msg: &str) {
    if level != LogLevel::Quiet && (level == required || required == LogLevel::Normal) {
        println!("{msg}");
    }
}

fn run_validate(args: charlar::config::ValidateArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Validating config: {}", args.config.display()),
    );

    let config = ChatConfig::load(&args.config).map_err(|e| format!("Config error: {e}"))?;

    config
        .validate()
        .map_err(|e| format!("Validation failed: {e}"))?;

    if args.finetune {
        config
            .finetune_config
            .validate()
            .map_err(|e| format!("Fine-tuning validation failed: {e}"))?;
    }

    log(level, LogLevel::Normal, "Configuration is valid");

    if args.detailed {
        println!();
        println!("Configuration Summary:");
        println!("  Model: {}", config.model_name_or_path);
        println!("  Device: {}", config.device);
        println!("  Backend: {}", config.backend);
        println!("  Server mode: {}", config.server_mode);
        println!();
        let finetune = &config.finetune_config.finetune_args;
        println!("  LoRA:");
        println!("    Rank: {}", finetune.lora_rank);
        println!("    Alpha: {}", finetune.lora_alpha);
        println!("    Dropout: {}", finetune.lora_dropout);
        println!("    Target modules: {:?}", finetune.lora_target_modules);
        println!();
        let optimize = &config.optimize_config;
        println!("  Optimization:");
        println!("    Mode: {:?}", optimize.mode);
        println!("    Approach: {:?}", optimize.approach);
        println!("    Precision: {}", optimize.precision);
        if !optimize.excluded_precisions.is_empty() {
            println!("    Excluded: {:?}", optimize.excluded_precisions);
        }
    }

    Ok(())
}

fn run_info(args: charlar::config::InfoArgs, level: LogLevel) -> Result<(), String> {
    let config = ChatConfig::load(&args.config).map_err(|e| format!("Config error: {e}"))?;

    match args.format {
        OutputFormat::Text => {
            log(level, LogLevel::Normal, "Configuration Info:");
            println!();
            println!("Model: {}", config.model_name_or_path);
            println!("Device: {} / backend: {}", config.device, config.backend);
            println!(
                "LoRA rank {} (alpha {})",
                config.finetune_config.finetune_args.lora_rank,
                config.finetune_config.finetune_args.lora_alpha
            );
            println!(
                "Optimization: {:?} / {}",
                config.optimize_config.mode, config.optimize_config.precision
            );
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&config)
                .map_err(|e| format!("JSON serialization error: {e}"))?;
            println!("{json}");
        }
        OutputFormat::Yaml => {
            let yaml = config
                .to_yaml()
                .map_err(|e| format!("YAML serialization error: {e}"))?;
            println!("{yaml}");
        }
    }

    Ok(())
}

fn run_quantize(args: charlar::config::QuantizeArgs, level: LogLevel) -> Result<(), String> {
    use charlar::quant::{quantize_weight, ComputeDtype, QuantMode, QuantizedWeight, WeightDtype};
    use ndarray::Array2;
    use safetensors::SafeTensors;
    use std::collections::HashMap;

    log(
        level,
        LogLevel::Normal,
        &format!("Quantizing {} to {}-bit", args.model.display(), args.bits),
    );

    let dtype = match args.bits {
        4 => WeightDtype::S4,
        8 => WeightDtype::S8,
        other => return Err(format!("Unsupported bit width: {other}. Use 4 or 8.")),
    };

    let mode = match args.method {
        QuantMethod::Symmetric => QuantMode::Symmetric,
        QuantMethod::Asymmetric => QuantMode::Asymmetric,
    };

    let data =
        std::fs::read(&args.model).map_err(|e| format!("Failed to read model file: {e}"))?;
    let tensors =
        SafeTensors::deserialize(&data).map_err(|e| format!("Failed to parse safetensors: {e}"))?;

    let mut quantized: HashMap<String, QuantizedWeight> = HashMap::new();
    let mut total_original_bytes = 0usize;
    let mut total_quantized_bytes = 0usize;

    for name in tensors.names() {
        let tensor = tensors
            .tensor(name)
            .map_err(|e| format!("Failed to get tensor {name}: {e}"))?;

        // Only 2-D float weights are quantized
        if tensor.dtype() != safetensors::tensor::Dtype::F32 || tensor.shape().len() != 2 {
            log(
                level,
                LogLevel::Verbose,
                &format!("  Skipping {name} (not a 2-D F32 weight)"),
            );
            continue;
        }

        let shape = (tensor.shape()[0], tensor.shape()[1]);
        let values: Vec<f32> = tensor
            .data()
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        let weight = Array2::from_shape_vec(shape, values)
            .map_err(|e| format!("Bad tensor shape for {name}: {e}"))?;

        total_original_bytes += weight.len() * 4;

        let q = quantize_weight(
            &weight,
            true,
            mode,
            args.block_size,
            ComputeDtype::F32,
            dtype,
        )
        .map_err(|e| format!("Quantization failed for {name}: {e}"))?;
        total_quantized_bytes += q.memory_bytes();

        log(
            level,
            LogLevel::Verbose,
            &format!(
                "  Quantized {}: {:?} -> {} bytes",
                name,
                tensor.shape(),
                q.memory_bytes()
            ),
        );

        quantized.insert((*name).to_string(), q);
    }

    let output =
        serde_json::to_vec_pretty(&quantized).map_err(|e| format!("Failed to serialize: {e}"))?;
    std::fs::write(&args.output, &output).map_err(|e| format!("Failed to write output: {e}"))?;

    let compression = if total_quantized_bytes > 0 {
        total_original_bytes as f64 / total_quantized_bytes as f64
    } else {
        1.0
    };

    log(
        level,
        LogLevel::Normal,
        &format!(
            "Quantization complete: {} tensors, {:.1}x compression",
            quantized.len(),
            compression
        ),
    );
    log(
        level,
        LogLevel::Normal,
        &format!("  Output: {}", args.output.display()),
    );

    Ok(())
}
