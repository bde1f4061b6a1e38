//! FFI declarations for the C++ XIR/VART bridge.
//!
//! This module contains the raw FFI bindings. Use the safe wrappers
//! in the `vart` module instead of calling these directly.

use std::ffi::c_void;
use std::os::raw::c_char;

/// Opaque handle to a deserialized graph.
pub type GraphHandle = *mut c_void;

/// Opaque handle to a runner.
pub type RunnerHandle = *mut c_void;

extern "C" {
    pub fn vart_get_last_error() -> *const c_char;

    // Graph lifecycle
    pub fn vart_graph_load(path: *const c_char) -> GraphHandle;
    pub fn vart_graph_free(graph: GraphHandle);
    pub fn vart_graph_name(graph: GraphHandle) -> *const c_char;

    // Children of the root subgraph
    pub fn vart_graph_num_subgraphs(graph: GraphHandle) -> usize;
    pub fn vart_subgraph_name(graph: GraphHandle, index: usize) -> *const c_char;
    pub fn vart_subgraph_num_attrs(graph: GraphHandle, index: usize) -> usize;
    pub fn vart_subgraph_attr_key(graph: GraphHandle, index: usize, attr: usize)
        -> *const c_char;
    pub fn vart_subgraph_attr_value(
        graph: GraphHandle,
        index: usize,
        attr: usize,
    ) -> *const c_char;

    // Runner lifecycle
    pub fn vart_runner_create(
        graph: GraphHandle,
        index: usize,
        mode: *const c_char,
    ) -> RunnerHandle;
    pub fn vart_runner_free(runner: RunnerHandle);

    // Tensor descriptors; `is_output` selects outputs over inputs
    pub fn vart_runner_num_tensors(runner: RunnerHandle, is_output: i32) -> usize;
    pub fn vart_runner_tensor_name(
        runner: RunnerHandle,
        is_output: i32,
        index: usize,
    ) -> *const c_char;
    pub fn vart_runner_tensor_ndim(runner: RunnerHandle, is_output: i32, index: usize) -> usize;
    pub fn vart_runner_tensor_shape(
        runner: RunnerHandle,
        is_output: i32,
        index: usize,
    ) -> *const i32;
    pub fn vart_runner_tensor_bit_width(
        runner: RunnerHandle,
        is_output: i32,
        index: usize,
    ) -> i32;

    // Execution; returns a negative job id on failure
    pub fn vart_runner_execute_async(
        runner: RunnerHandle,
        inputs: *const *mut i8,
        input_sizes: *const usize,
        num_inputs: usize,
        outputs: *const *mut i8,
        output_sizes: *const usize,
        num_outputs: usize,
    ) -> i64;
    pub fn vart_runner_wait(runner: RunnerHandle, job: i64, timeout_ms: i32) -> i32;
}
