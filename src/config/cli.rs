//! CLI argument parsing and validation
//!
//! # Usage
//!
//! ```bash
//! qat validate qat.yaml
//! qat info qat.yaml --format json
//! qat calibrate qat.yaml --site dense1.weights --input samples.json --steps 10
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// qat: quantization-aware training primitives
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "qat")]
#[command(version)]
#[command(about = "Inspect and calibrate integer quantizers described in YAML")]
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
    /// Validate a configuration file
    Validate(ValidateArgs),

    /// Display clip bounds and stats shapes per site
    Info(InfoArgs),

    /// Run calibration steps on sample data for one site
    Calibrate(CalibrateArgs),
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// List every validated site
    #[arg(short, long)]
    pub detailed: bool,
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

/// Arguments for the calibrate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct CalibrateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Site to calibrate
    #[arg(short, long)]
    pub site: String,

    /// JSON file holding a flat array of f32 samples in row-major order
    #[arg(short, long)]
    pub input: PathBuf,

    /// Number of update steps to run on the sample
    #[arg(long, default_value = "1")]
    pub steps: u32,
}

/// Output format for info command
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            _ => Err(format!(
                "Unknown output format: {}. Valid formats: text, json, yaml",
                s
            )),
        }
    }
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}
