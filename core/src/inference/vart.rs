//! Safe wrappers for the Vitis AI XIR/VART runtime.
//!
//! This module provides type-safe Rust wrappers around the C++ FFI bindings
//! for deserializing an xmodel and running its DPU subgraph.

use std::collections::BTreeMap;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;
use tracing::debug;

use super::ffi;
use super::runner::{Graph, JobId, Runner, SubgraphInfo, Timeout};
use super::tensor::{TensorBuffer, TensorDesc};
use crate::error::{DpuError, Result};

/// Get the last error message from the C++ bridge.
fn get_last_error() -> String {
    unsafe { string_or(ffi::vart_get_last_error(), "Unknown error") }
}

/// Copy a bridge-owned C string, substituting `fallback` for null.
///
/// # Safety
///
/// `ptr` must be null or point to a valid NUL-terminated string.
unsafe fn string_or(ptr: *const c_char, fallback: &str) -> String {
    if ptr.is_null() {
        fallback.to_string()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

/// A deserialized xmodel.
pub struct VartGraph {
    handle: ffi::GraphHandle,
    name: String,
    subgraphs: Vec<SubgraphInfo>,
}

impl VartGraph {
    /// Deserialize an xmodel file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or the runtime rejects it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DpuError::FileNotFound(path.to_path_buf()));
        }

        let path_cstr = CString::new(path.to_string_lossy().as_ref())
            .map_err(|_| DpuError::model_load("Invalid path encoding"))?;

        let handle = unsafe { ffi::vart_graph_load(path_cstr.as_ptr()) };
        if handle.is_null() {
            return Err(DpuError::model_load(format!(
                "Failed to deserialize graph: {}",
                get_last_error()
            )));
        }

        let name = unsafe { string_or(ffi::vart_graph_name(handle), "") };
        let count = unsafe { ffi::vart_graph_num_subgraphs(handle) };
        let mut subgraphs = Vec::with_capacity(count);
        for index in 0..count {
            let info = unsafe { read_subgraph(handle, index) };
            debug!("subgraph {}: {} {:?}", index, info.name, info.attrs);
            subgraphs.push(info);
        }

        Ok(Self {
            handle,
            name,
            subgraphs,
        })
    }
}

/// Read one root child from the bridge.
///
/// # Safety
///
/// `handle` must be a live graph and `index` below its subgraph count.
unsafe fn read_subgraph(handle: ffi::GraphHandle, index: usize) -> SubgraphInfo {
    let name = string_or(ffi::vart_subgraph_name(handle, index), "");
    let mut attrs = BTreeMap::new();
    for attr in 0..ffi::vart_subgraph_num_attrs(handle, index) {
        let key = ffi::vart_subgraph_attr_key(handle, index, attr);
        let value = ffi::vart_subgraph_attr_value(handle, index, attr);
        if key.is_null() || value.is_null() {
            continue;
        }
        attrs.insert(string_or(key, ""), string_or(value, ""));
    }
    SubgraphInfo { index, name, attrs }
}

impl Graph for VartGraph {
    type Runner = VartRunner;

    fn name(&self) -> &str {
        &self.name
    }

    fn subgraphs(&self) -> &[SubgraphInfo] {
        &self.subgraphs
    }

    fn create_runner(&self, subgraph: &SubgraphInfo, mode: &str) -> Result<VartRunner> {
        if subgraph.index >= self.subgraphs.len() {
            return Err(DpuError::model_load(format!(
                "subgraph index {} out of range",
                subgraph.index
            )));
        }
        let mode_cstr =
            CString::new(mode).map_err(|_| DpuError::config("Invalid runner mode string"))?;

        let handle =
            unsafe { ffi::vart_runner_create(self.handle, subgraph.index, mode_cstr.as_ptr()) };
        if handle.is_null() {
            return Err(DpuError::model_load(format!(
                "Failed to create runner for `{}`: {}",
                subgraph.name,
                get_last_error()
            )));
        }

        // Own the handle before reading descriptors so errors free it.
        let mut runner = VartRunner {
            handle,
            inputs: Vec::new(),
            outputs: Vec::new(),
        };
        runner.inputs = unsafe { read_tensors(handle, false)? };
        runner.outputs = unsafe { read_tensors(handle, true)? };
        Ok(runner)
    }
}

impl Drop for VartGraph {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe {
                ffi::vart_graph_free(self.handle);
            }
        }
    }
}

/// Read all input or output descriptors of a runner.
///
/// # Safety
///
/// `handle` must be a live runner.
unsafe fn read_tensors(handle: ffi::RunnerHandle, outputs: bool) -> Result<Vec<TensorDesc>> {
    let side = i32::from(outputs);
    let count = ffi::vart_runner_num_tensors(handle, side);
    let mut descs = Vec::with_capacity(count);

    for i in 0..count {
        let ndim = ffi::vart_runner_tensor_ndim(handle, side, i);
        let shape_ptr = ffi::vart_runner_tensor_shape(handle, side, i);
        if shape_ptr.is_null() {
            return Err(DpuError::tensor(format!("Null shape for tensor {}", i)));
        }
        let shape = std::slice::from_raw_parts(shape_ptr, ndim)
            .iter()
            .map(|&d| {
                usize::try_from(d)
                    .map_err(|_| DpuError::tensor(format!("Negative dimension {} in tensor {}", d, i)))
            })
            .collect::<Result<Vec<_>>>()?;

        let bit_width = ffi::vart_runner_tensor_bit_width(handle, side, i);
        let name = string_or(ffi::vart_runner_tensor_name(handle, side, i), "");
        let desc = TensorDesc::new(name, shape, bit_width.max(0) as u32);
        debug!("{} tensor {}: {:?}", if outputs { "output" } else { "input" }, i, desc);
        descs.push(desc);
    }
    Ok(descs)
}

/// Runner bound to one DPU subgraph.
pub struct VartRunner {
    handle: ffi::RunnerHandle,
    inputs: Vec<TensorDesc>,
    outputs: Vec<TensorDesc>,
}

impl Runner for VartRunner {
    fn input_tensors(&self) -> &[TensorDesc] {
        &self.inputs
    }

    fn output_tensors(&self) -> &[TensorDesc] {
        &self.outputs
    }

    unsafe fn submit(
        &self,
        inputs: &mut [TensorBuffer],
        outputs: &mut [TensorBuffer],
    ) -> Result<JobId> {
        let in_sizes: Vec<usize> = inputs.iter().map(TensorBuffer::size_bytes).collect();
        let in_ptrs: Vec<*mut i8> = inputs
            .iter_mut()
            .map(|b| b.as_mut_slice().as_mut_ptr())
            .collect();
        let out_sizes: Vec<usize> = outputs.iter().map(TensorBuffer::size_bytes).collect();
        let out_ptrs: Vec<*mut i8> = outputs
            .iter_mut()
            .map(|b| b.as_mut_slice().as_mut_ptr())
            .collect();

        let job = ffi::vart_runner_execute_async(
            self.handle,
            in_ptrs.as_ptr(),
            in_sizes.as_ptr(),
            in_ptrs.len(),
            out_ptrs.as_ptr(),
            out_sizes.as_ptr(),
            out_ptrs.len(),
        );

        u64::try_from(job).map(JobId).map_err(|_| {
            DpuError::inference(format!("Failed to submit job: {}", get_last_error()))
        })
    }

    fn wait(&self, job: JobId, timeout: Timeout) -> Result<()> {
        let id = i64::try_from(job.0)
            .map_err(|_| DpuError::inference(format!("{} out of range", job)))?;
        let status = unsafe { ffi::vart_runner_wait(self.handle, id, timeout.as_millis_i32()) };
        match (status, timeout) {
            (0, _) => Ok(()),
            (_, Timeout::After(d)) => Err(DpuError::Timeout(d)),
            (code, Timeout::Indefinite) => Err(DpuError::inference(format!(
                "wait on {} returned status {}: {}",
                job,
                code,
                get_last_error()
            ))),
        }
    }
}

impl Drop for VartRunner {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe {
                ffi::vart_runner_free(self.handle);
            }
        }
    }
}
