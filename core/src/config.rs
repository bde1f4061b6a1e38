//! Configuration types for mnist-dpu.

use image::imageops::FilterType;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{DpuError, Result};
use crate::inference::Timeout;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Accelerator runner configuration.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Input preparation configuration.
    #[serde(default)]
    pub preprocess: PreprocessConfig,

    /// Inference configuration.
    #[serde(default)]
    pub inference: InferenceConfig,
}

/// What to do when the graph has no accelerator subgraph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingSubgraph {
    /// Return an error and exit with a failure code.
    #[default]
    Error,
    /// Log and abort the process.
    Abort,
}

/// Accelerator runner configuration.
#[derive(Debug, Deserialize)]
pub struct RunnerConfig {
    /// Subgraph attribute holding the execution device.
    #[serde(default = "default_device_attr")]
    pub device_attr: String,

    /// Attribute value marking the accelerator-resident subgraph.
    #[serde(default = "default_device")]
    pub device: String,

    /// Runner execution mode.
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Wait timeout in milliseconds; unset waits indefinitely.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub missing_subgraph: MissingSubgraph,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            device_attr: default_device_attr(),
            device: default_device(),
            mode: default_mode(),
            timeout_ms: None,
            missing_subgraph: MissingSubgraph::default(),
        }
    }
}

impl RunnerConfig {
    /// The wait timeout as a runtime [`Timeout`].
    pub fn timeout(&self) -> Timeout {
        match self.timeout_ms {
            Some(ms) => Timeout::After(Duration::from_millis(ms)),
            None => Timeout::Indefinite,
        }
    }
}

/// Resize filter applied to the input image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    Nearest,
    #[default]
    Bilinear,
    Cubic,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Bilinear => FilterType::Triangle,
            ResizeFilter::Cubic => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Input preparation configuration.
#[derive(Debug, Default, Deserialize)]
pub struct PreprocessConfig {
    #[serde(default)]
    pub filter: ResizeFilter,
}

/// Inference configuration.
#[derive(Debug, Deserialize)]
pub struct InferenceConfig {
    /// Untimed executions before measuring.
    #[serde(default)]
    pub warmup: usize,

    /// Timed executions averaged into the reported latency.
    #[serde(default = "default_runs")]
    pub runs: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            warmup: 0,
            runs: default_runs(),
        }
    }
}

fn default_device_attr() -> String {
    "device".to_string()
}

fn default_device() -> String {
    "DPU".to_string()
}

fn default_mode() -> String {
    "run".to_string()
}

fn default_runs() -> usize {
    1
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.inference.runs == 0 {
            return Err(DpuError::config("inference.runs must be at least 1"));
        }
        if self.runner.device_attr.is_empty() || self.runner.device.is_empty() {
            return Err(DpuError::config("runner.device_attr and runner.device must be set"));
        }
        if self.runner.mode.is_empty() {
            return Err(DpuError::config("runner.mode must be set"));
        }
        Ok(())
    }
}
