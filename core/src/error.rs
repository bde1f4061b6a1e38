//! Error types for mnist-dpu.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for mnist-dpu operations.
pub type Result<T> = std::result::Result<T, DpuError>;

/// Errors that can occur while preparing or running an inference.
#[derive(Debug, Error)]
pub enum DpuError {
    /// Graph deserialization or runner creation failed.
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    /// Submitting or waiting on a job failed.
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Invalid tensor descriptor or buffer.
    #[error("Invalid tensor: {0}")]
    Tensor(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The input image could not be read or decoded.
    #[error("Failed to load image: {}", .path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// No child of the root subgraph carries the accelerator attribute.
    #[error("No {device} subgraph found (attribute `{attr}`)")]
    NoAcceleratorSubgraph { attr: String, device: String },

    /// The accelerator did not signal completion within the timeout.
    #[error("Timed out after {}ms waiting for the accelerator", .0.as_millis())]
    Timeout(Duration),

    /// The requested backend was not compiled in.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

impl DpuError {
    /// Create a model load error.
    pub fn model_load(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }

    /// Create an inference error.
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a tensor error.
    pub fn tensor(msg: impl Into<String>) -> Self {
        Self::Tensor(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an unsupported-backend error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}
