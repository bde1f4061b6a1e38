//! Accelerator executor abstraction.
//!
//! A [`Graph`] is a deserialized model whose root subgraph has been
//! partitioned by the compiler; one child is mapped onto the accelerator.
//! A [`Runner`] executes that child asynchronously: submit a job with the
//! input and output buffers, then block on it until the hardware is done.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::warn;

use super::tensor::{TensorBuffer, TensorDesc};
use crate::error::Result;

/// One child of a graph's root subgraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubgraphInfo {
    /// Position among the root's children.
    pub index: usize,
    pub name: String,
    /// String-typed attributes, e.g. `device`.
    pub attrs: BTreeMap<String, String>,
}

impl SubgraphInfo {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }
}

/// Find the first subgraph whose attribute `key` equals `value`.
pub fn find_accelerator_subgraph<'g>(
    subgraphs: &'g [SubgraphInfo],
    key: &str,
    value: &str,
) -> Option<&'g SubgraphInfo> {
    subgraphs.iter().find(|s| s.attr(key) == Some(value))
}

/// How long [`Job::wait`] may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    Indefinite,
    After(Duration),
}

impl Timeout {
    /// Milliseconds in the runtime's convention, `-1` meaning indefinite.
    pub fn as_millis_i32(self) -> i32 {
        match self {
            Self::Indefinite => -1,
            Self::After(d) => i32::try_from(d.as_millis()).unwrap_or(i32::MAX),
        }
    }
}

/// Identifier of a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

/// A deserialized, partitioned model.
pub trait Graph {
    type Runner: Runner;

    fn name(&self) -> &str;

    /// Children of the root subgraph, in graph order.
    fn subgraphs(&self) -> &[SubgraphInfo];

    /// Instantiate a runner for `subgraph` in the given execution mode.
    fn create_runner(&self, subgraph: &SubgraphInfo, mode: &str) -> Result<Self::Runner>;
}

/// Executes one accelerator subgraph.
pub trait Runner: Sized {
    fn input_tensors(&self) -> &[TensorDesc];

    fn output_tensors(&self) -> &[TensorDesc];

    /// Start executing with the given buffers and return immediately.
    ///
    /// # Safety
    ///
    /// The buffers' storage must stay alive and untouched until [`Runner::wait`]
    /// returns `Ok` for the returned job. [`Runner::execute_async`] upholds this.
    unsafe fn submit(&self, inputs: &mut [TensorBuffer], outputs: &mut [TensorBuffer])
        -> Result<JobId>;

    /// Block until `job` completes or `timeout` elapses.
    fn wait(&self, job: JobId, timeout: Timeout) -> Result<()>;

    /// Submit a job that owns its buffers until it completes.
    fn execute_async(
        &self,
        mut inputs: Vec<TensorBuffer>,
        mut outputs: Vec<TensorBuffer>,
    ) -> Result<Job<'_, Self>> {
        // SAFETY: the job takes ownership of the buffers and only gives
        // them back once `wait` has succeeded.
        let id = unsafe { self.submit(&mut inputs, &mut outputs)? };
        Ok(Job {
            runner: self,
            id,
            buffers: Some(Completion { inputs, outputs }),
            done: false,
        })
    }
}

/// Buffers handed back by a finished job.
#[derive(Debug)]
pub struct Completion {
    pub inputs: Vec<TensorBuffer>,
    pub outputs: Vec<TensorBuffer>,
}

/// An in-flight job.
///
/// Dropping a job that never completed leaks its buffers, since the
/// accelerator may still write into them.
pub struct Job<'r, R: Runner> {
    runner: &'r R,
    id: JobId,
    buffers: Option<Completion>,
    done: bool,
}

impl<'r, R: Runner> Job<'r, R> {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Block until the job finishes and take back its buffers.
    ///
    /// On a timeout the job is still pending; it can be waited on again.
    pub fn wait(&mut self, timeout: Timeout) -> Result<Completion> {
        if !self.done {
            self.runner.wait(self.id, timeout)?;
            self.done = true;
        }
        self.buffers
            .take()
            .ok_or_else(|| crate::DpuError::inference(format!("{} already collected", self.id)))
    }
}

impl<R: Runner> Drop for Job<'_, R> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Some(buffers) = self.buffers.take() {
            warn!("{} abandoned before completion, leaking its buffers", self.id);
            std::mem::forget(buffers);
        }
    }
}
