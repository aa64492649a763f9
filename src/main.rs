//! qat CLI
//!
//! Inspect and calibrate the quantizer sites described in a YAML file.
//!
//! # Usage
//!
//! ```bash
//! # Validate config
//! qat validate qat.yaml
//!
//! # Show clip bounds and stats shapes
//! qat info qat.yaml --format json
//!
//! # Calibrate one site on sample data
//! qat calibrate qat.yaml --site dense1.weights --input w.json --steps 10
//! ```

use clap::Parser;
use ndarray::{ArrayD, IxDyn};
use qat_core::autograd::Tensor;
use qat_core::config::{
    load_config, CalibrateArgs, Cli, Command, InfoArgs, OutputFormat, ValidateArgs,
};
use qat_core::quant::{get_clip_bound, max_grid_level};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        LogLevel::Quiet
    } else if cli.verbose {
        LogLevel::Verbose
    } else {
        LogLevel::Normal
    };
    init_tracing(log_level);

    let result = match cli.command {
        Command::Validate(args) => run_validate(args, log_level),
        Command::Info(args) => run_info(args, log_level),
        Command::Calibrate(args) => run_calibrate(args, log_level),
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

/// `RUST_LOG` wins; otherwise the verbosity flags pick the level
fn init_tracing(level: LogLevel) {
    let default = match level {
        LogLevel::Quiet => "error",
        LogLevel::Normal => "warn",
        LogLevel::Verbose => "debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn log(level: LogLevel, required: LogLevel, msg: &str) {
    if level != LogLevel::Quiet && (level == required || required == LogLevel::Normal) {
        println!("{msg}");
    }
}

fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Validating config: {}", args.config.display()),
    );

    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;

    log(
        level,
        LogLevel::Normal,
        &format!("Configuration is valid ({} sites)", spec.quantizers.len()),
    );

    if args.detailed {
        for (name, site) in &spec.quantizers {
            let config = &site.config;
            println!();
            println!("  {name}:");
            println!("    Shape: {:?}", site.shape);
            println!(
                "    Bits: {} (preserve_zero={})",
                config.quant_config.bits, config.quant_config.preserve_zero
            );
            println!(
                "    Shared axes: {:?}",
                config.stats_config.share_stats_axes
            );
            if let Some(n) = config.stats_config.ema_update_count {
                println!("    EMA window: {n}");
            }
            if let Some(conv) = &site.conv {
                println!(
                    "    Conv operand: {} (feature {})",
                    conv.data_format, conv.feature_dim
                );
            }
        }
    }

    Ok(())
}

fn run_info(args: InfoArgs, level: LogLevel) -> Result<(), String> {
    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    let quantizers = spec
        .build_quantizers()
        .map_err(|e| format!("Config error: {e}"))?;

    let mut sites = Vec::with_capacity(quantizers.len());
    for quantizer in &quantizers {
        let quant_config = &quantizer.config().quant_config;
        let clip_bound = get_clip_bound(quant_config).map_err(|e| e.to_string())?;
        let max_level = max_grid_level(quant_config).map_err(|e| e.to_string())?;
        sites.push(serde_json::json!({
            "name": quantizer.name(),
            "shape": quantizer.data_shape(),
            "bits": quant_config.bits,
            "preserve_zero": quant_config.preserve_zero,
            "clip_bound": clip_bound,
            "safe_clip_bound": quantizer.clip_range().1,
            "max_grid_level": max_level,
            "stats_shape": quantizer.stats_shape(),
        }));
    }

    match args.format {
        OutputFormat::Text => {
            log(level, LogLevel::Normal, "Quantizer Info:");
            for (quantizer, site) in quantizers.iter().zip(&sites) {
                println!();
                println!("{}:", quantizer.name());
                println!("  Shape: {:?}", quantizer.data_shape());
                println!("  Bits: {}", site["bits"]);
                println!("  Clip bound: {}", site["clip_bound"]);
                println!("  Safe clip bound: {}", site["safe_clip_bound"]);
                println!("  Stats shape: {:?}", quantizer.stats_shape());
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&sites)
                .map_err(|e| format!("JSON serialization error: {e}"))?;
            println!("{json}");
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&sites)
                .map_err(|e| format!("YAML serialization error: {e}"))?;
            println!("{yaml}");
        }
    }

    Ok(())
}

fn run_calibrate(args: CalibrateArgs, level: LogLevel) -> Result<(), String> {
    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    let site = spec
        .quantizers
        .get(&args.site)
        .ok_or_else(|| format!("Unknown site '{}'", args.site))?;
    let quantizer = site
        .to_quantizer(&args.site)
        .map_err(|e| format!("Config error: {e}"))?;

    let raw = std::fs::read_to_string(&args.input)
        .map_err(|e| format!("Failed to read input {}: {e}", args.input.display()))?;
    let values: Vec<f32> =
        serde_json::from_str(&raw).map_err(|e| format!("Input must be a JSON array of numbers: {e}"))?;
    let sample = ArrayD::from_shape_vec(IxDyn(&site.shape), values)
        .map_err(|e| format!("Input does not fit shape {:?}: {e}", site.shape))?;
    let weight = ArrayD::from_elem(IxDyn(&[]), 1.0f32);

    log(
        level,
        LogLevel::Verbose,
        &format!("Calibrating {} for {} steps", args.site, args.steps),
    );

    let mut state = quantizer.init().map_err(|e| e.to_string())?;
    for step in 0..args.steps {
        state = quantizer
            .update(&state, &sample, &weight, i64::from(step))
            .map_err(|e| format!("Update failed: {e}"))?;
    }
    let state = state.freeze();

    let x = Tensor::new(sample, false);
    let quantized = quantizer
        .to_quant(&state, &x, false)
        .map_err(|e| e.to_string())?;
    let dequantized = quantizer
        .dequantize(&state, &quantized, false)
        .map_err(|e| e.to_string())?;

    let report = serde_json::json!({
        "site": args.site,
        "steps": args.steps,
        "clip_range": quantizer.clip_range(),
        "scale": state.scale().iter().collect::<Vec<_>>(),
        "quantized": quantized.data().iter().collect::<Vec<_>>(),
        "dequantized": dequantized.data().iter().collect::<Vec<_>>(),
    });
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| format!("JSON serialization error: {e}"))?;
    println!("{json}");

    Ok(())
}
