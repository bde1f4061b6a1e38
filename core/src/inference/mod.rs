//! Accelerator inference module.
//!
//! This module defines the executor abstraction used by the pipeline and,
//! with the `vart` feature, FFI bindings to the C++ XIR/VART bridge with
//! safe Rust wrappers for graph loading and execution.

mod runner;
mod tensor;

#[cfg(feature = "vart")]
mod ffi;
#[cfg(feature = "vart")]
mod vart;

pub use runner::{
    find_accelerator_subgraph, Completion, Graph, Job, JobId, Runner, SubgraphInfo, Timeout,
};
pub use tensor::{TensorBuffer, TensorDesc};

#[cfg(feature = "vart")]
pub use vart::{VartGraph, VartRunner};
