//! Command-line interface for mnist-dpu.

use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;
use crate::report::OutputFormat;

/// Classify one handwritten digit image on a DPU.
#[derive(Parser, Debug)]
#[command(name = "mnist_dpu")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the compiled .xmodel.
    pub model: PathBuf,

    /// Path to the digit image (PNG, JPEG or BMP).
    pub image: PathBuf,

    /// Path to an optional YAML config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Timed executions to average (overrides the config).
    #[arg(long)]
    pub runs: Option<usize>,

    /// Untimed executions before measuring (overrides the config).
    #[arg(long)]
    pub warmup: Option<usize>,

    /// Wait timeout in milliseconds (overrides the config; default waits forever).
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Parse command line arguments, returning usage errors instead of exiting.
    pub fn try_parse_args() -> Result<Self, clap::Error> {
        Self::try_parse()
    }

    /// Apply command-line overrides on top of a loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(runs) = self.runs {
            config.inference.runs = runs;
        }
        if let Some(warmup) = self.warmup {
            config.inference.warmup = warmup;
        }
        if let Some(ms) = self.timeout_ms {
            config.runner.timeout_ms = Some(ms);
        }
    }
}
