use anyhow::{Context, Result};
use approx::assert_abs_diff_eq;
use image::{GrayImage, Luma};
use mnist_dpu::config::Config;
use mnist_dpu::inference::{
    Graph, JobId, Runner, SubgraphInfo, TensorBuffer, TensorDesc, Timeout,
};
use mnist_dpu::{pipeline, DpuError};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Runs on the host: predicts `mean(input) / 13` as a one-hot logit vector.
struct HostRunner {
    inputs: Vec<TensorDesc>,
    outputs: Vec<TensorDesc>,
    next_job: Cell<u64>,
    pending: RefCell<HashSet<u64>>,
    stall: bool,
}

impl Runner for HostRunner {
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
    ) -> mnist_dpu::Result<JobId> {
        let pixels = inputs[0].as_slice();
        let mean = pixels.iter().map(|&p| i64::from(p)).sum::<i64>() / pixels.len() as i64;
        let class = (mean / 13).clamp(0, 9) as usize;

        let logits = outputs[0].as_mut_slice();
        logits.fill(-20);
        logits[class] = 100;

        let id = self.next_job.get();
        self.next_job.set(id + 1);
        self.pending.borrow_mut().insert(id);
        Ok(JobId(id))
    }

    fn wait(&self, job: JobId, timeout: Timeout) -> mnist_dpu::Result<()> {
        if self.stall {
            return Err(match timeout {
                Timeout::After(d) => DpuError::Timeout(d),
                Timeout::Indefinite => DpuError::inference("stalled"),
            });
        }
        if self.pending.borrow_mut().remove(&job.0) {
            Ok(())
        } else {
            Err(DpuError::inference(format!("unknown {}", job)))
        }
    }
}

struct HostGraph {
    subgraphs: Vec<SubgraphInfo>,
    input_shape: Vec<usize>,
    output_shape: Vec<usize>,
    stall: bool,
    runners_created: Cell<usize>,
}

impl HostGraph {
    fn mnist() -> Self {
        Self {
            subgraphs: vec![
                subgraph(0, "subgraph_input", "USER"),
                subgraph(1, "subgraph_conv2d", "DPU"),
                subgraph(2, "subgraph_softmax", "CPU"),
            ],
            input_shape: vec![1, 28, 28, 1],
            output_shape: vec![1, 10],
            stall: false,
            runners_created: Cell::new(0),
        }
    }
}

impl Graph for HostGraph {
    type Runner = HostRunner;

    fn name(&self) -> &str {
        "mnist"
    }

    fn subgraphs(&self) -> &[SubgraphInfo] {
        &self.subgraphs
    }

    fn create_runner(
        &self,
        subgraph: &SubgraphInfo,
        mode: &str,
    ) -> mnist_dpu::Result<HostRunner> {
        assert_eq!(subgraph.attr("device"), Some("DPU"));
        assert_eq!(mode, "run");
        self.runners_created.set(self.runners_created.get() + 1);
        Ok(HostRunner {
            inputs: vec![TensorDesc::new("input", self.input_shape.clone(), 8)],
            outputs: vec![TensorDesc::new("logits", self.output_shape.clone(), 8)],
            next_job: Cell::new(1),
            pending: RefCell::new(HashSet::new()),
            stall: self.stall,
        })
    }
}

fn subgraph(index: usize, name: &str, device: &str) -> SubgraphInfo {
    let mut attrs = BTreeMap::new();
    attrs.insert("device".to_string(), device.to_string());
    SubgraphInfo {
        index,
        name: name.to_string(),
        attrs,
    }
}

fn write_digit(dir: &Path, width: u32, height: u32, value: u8) -> Result<PathBuf> {
    let path = dir.join(format!("digit_{}.png", value));
    GrayImage::from_pixel(width, height, Luma([value]))
        .save(&path)
        .context("Failed to write image fixture")?;
    Ok(path)
}

#[test]
fn classifies_image_end_to_end() -> Result<()> {
    let dir = TempDir::new()?;
    let image = write_digit(dir.path(), 28, 28, 65)?;
    let graph = HostGraph::mnist();

    let result = pipeline::run(&graph, &image, &Config::default())?;

    assert_eq!(result.classification.predicted, 5);
    assert_abs_diff_eq!(result.classification.confidence(), 1.0, epsilon = 1e-5);
    let total: f32 = result.classification.probabilities.iter().sum();
    assert_abs_diff_eq!(total, 1.0, epsilon = 1e-5);
    assert_eq!((result.input_height, result.input_width), (28, 28));
    assert_eq!(result.subgraph, "subgraph_conv2d");
    assert_eq!(result.timing.runs, 1);
    assert_eq!(graph.runners_created.get(), 1);
    Ok(())
}

#[test]
fn resizes_and_saturates_input() -> Result<()> {
    let dir = TempDir::new()?;
    // Bright pixels clamp to 127, so the mean lands on class 9.
    let image = write_digit(dir.path(), 64, 48, 250)?;
    let result = pipeline::run(&HostGraph::mnist(), &image, &Config::default())?;
    assert_eq!(result.classification.predicted, 9);
    Ok(())
}

#[test]
fn repeated_runs_reuse_buffers() -> Result<()> {
    let dir = TempDir::new()?;
    let image = write_digit(dir.path(), 28, 28, 0)?;
    let mut config = Config::default();
    config.inference.warmup = 2;
    config.inference.runs = 5;

    let result = pipeline::run(&HostGraph::mnist(), &image, &config)?;
    assert_eq!(result.classification.predicted, 0);
    assert_eq!(result.timing.runs, 5);
    Ok(())
}

#[test]
fn missing_accelerator_subgraph_is_an_error() -> Result<()> {
    let dir = TempDir::new()?;
    let image = write_digit(dir.path(), 28, 28, 10)?;
    let mut graph = HostGraph::mnist();
    graph.subgraphs.retain(|s| s.attr("device") != Some("DPU"));

    let err = pipeline::run(&graph, &image, &Config::default()).unwrap_err();
    assert!(matches!(err, DpuError::NoAcceleratorSubgraph { .. }));
    assert_eq!(graph.runners_created.get(), 0);
    Ok(())
}

#[test]
fn custom_device_attribute() -> Result<()> {
    let config = Config::from_yaml_str("runner:\n  device: CPU\n")?;

    // HostGraph only builds DPU runners, so selection is checked directly.
    let graph = HostGraph::mnist();
    let chosen = pipeline::select_subgraph(&graph, &config)?;
    assert_eq!(chosen.name, "subgraph_softmax");
    Ok(())
}

#[test]
fn unreadable_image_is_reported() {
    let err = pipeline::run(
        &HostGraph::mnist(),
        "/nonexistent/digit.png",
        &Config::default(),
    )
    .unwrap_err();
    match err {
        DpuError::ImageLoad { path, .. } => {
            assert_eq!(path, PathBuf::from("/nonexistent/digit.png"))
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn input_without_spatial_dims_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let image = write_digit(dir.path(), 28, 28, 10)?;
    let mut graph = HostGraph::mnist();
    graph.input_shape = vec![1, 784];

    let err = pipeline::run(&graph, &image, &Config::default()).unwrap_err();
    assert!(matches!(err, DpuError::Tensor(_)));
    Ok(())
}

#[test]
fn short_output_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let image = write_digit(dir.path(), 28, 28, 10)?;
    let mut graph = HostGraph::mnist();
    graph.output_shape = vec![1, 8];
    let err = pipeline::run(&graph, &image, &Config::default());
    assert!(matches!(err, Err(DpuError::Tensor(_))));
    Ok(())
}

#[test]
fn stalled_job_times_out() -> Result<()> {
    let dir = TempDir::new()?;
    let image = write_digit(dir.path(), 28, 28, 10)?;
    let mut graph = HostGraph::mnist();
    graph.stall = true;
    let config = Config::from_yaml_str("runner:\n  timeout_ms: 5\n")?;

    let err = pipeline::run(&graph, &image, &config).unwrap_err();
    assert!(matches!(err, DpuError::Timeout(d) if d == Duration::from_millis(5)));
    Ok(())
}
