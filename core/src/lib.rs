//! mnist-dpu: single-image handwritten digit classification on a Vitis AI DPU.
//!
//! This crate loads a compiled xmodel, binds its DPU subgraph to a runner,
//! executes one grayscale image and turns the signed 8-bit logits into class
//! probabilities with a numerically stable softmax.
//!
//! The accelerator is reached through the [`inference::Graph`] and
//! [`inference::Runner`] traits, so classification and reporting do not
//! depend on a particular runtime.
//!
//! # Features
//!
//! - **vart**: Build and link the C++ XIR/VART bridge (requires the Vitis AI
//!   runtime; see `build.rs` for `VART_SYSROOT`)
//!
//! # Example
//!
//! ```ignore
//! use mnist_dpu::config::Config;
//! use mnist_dpu::inference::VartGraph;
//!
//! let graph = VartGraph::load("mnist.xmodel")?;
//! let result = mnist_dpu::pipeline::run(&graph, "digit.png", &Config::default())?;
//! println!(
//!     "digit {} in {:.2}ms",
//!     result.classification.predicted,
//!     result.timing.latency_ms()
//! );
//! ```

pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod inference;
pub mod pipeline;
pub mod preprocess;
pub mod report;

// Re-export commonly used types
pub use classify::{classify, Classification, NUM_CLASSES};
pub use error::{DpuError, Result};
pub use pipeline::Inference;
