//! Single-image inference pipeline.
//!
//! Selects the accelerator subgraph, prepares the image for its input
//! tensor, executes it and classifies the resulting logits.

use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::classify::{classify, Classification, NUM_CLASSES};
use crate::config::{Config, MissingSubgraph};
use crate::error::{DpuError, Result};
use crate::inference::{find_accelerator_subgraph, Graph, Runner, SubgraphInfo, TensorBuffer};
use crate::preprocess::{fill_input, load_grayscale, prepare_input};
use crate::report::Timing;

/// Result of one pipeline run.
#[derive(Debug)]
pub struct Inference {
    pub classification: Classification,
    pub timing: Timing,
    pub input_height: usize,
    pub input_width: usize,
    /// Name of the subgraph that ran.
    pub subgraph: String,
}

/// Locate the accelerator subgraph, applying the configured policy when absent.
pub fn select_subgraph<'g, G: Graph>(graph: &'g G, config: &Config) -> Result<&'g SubgraphInfo> {
    let runner = &config.runner;
    match find_accelerator_subgraph(graph.subgraphs(), &runner.device_attr, &runner.device) {
        Some(subgraph) => {
            info!(
                "Using subgraph `{}` ({}={})",
                subgraph.name, runner.device_attr, runner.device
            );
            Ok(subgraph)
        }
        None => {
            let err = DpuError::NoAcceleratorSubgraph {
                attr: runner.device_attr.clone(),
                device: runner.device.clone(),
            };
            if runner.missing_subgraph == MissingSubgraph::Abort {
                error!("{} in graph `{}`", err, graph.name());
                std::process::abort();
            }
            Err(err)
        }
    }
}

/// Run the full pipeline on one image.
pub fn run<G: Graph>(
    graph: &G,
    image_path: impl AsRef<Path>,
    config: &Config,
) -> Result<Inference> {
    let subgraph = select_subgraph(graph, config)?;
    let runner = graph.create_runner(subgraph, &config.runner.mode)?;

    let input_desc = runner
        .input_tensors()
        .first()
        .ok_or_else(|| DpuError::inference("runner has no input tensors"))?
        .clone();
    let output_desc = runner
        .output_tensors()
        .first()
        .ok_or_else(|| DpuError::inference("runner has no output tensors"))?
        .clone();
    debug!("input {:?}, output {:?}", input_desc, output_desc);

    let height = input_desc.height()?;
    let width = input_desc.width()?;
    let as_u32 = |v: usize| {
        u32::try_from(v).map_err(|_| DpuError::tensor(format!("dimension {} too large", v)))
    };

    let image = load_grayscale(image_path)?;
    let pixels = prepare_input(
        &image,
        as_u32(width)?,
        as_u32(height)?,
        config.preprocess.filter.into(),
    );

    let mut input = TensorBuffer::for_tensor(&input_desc)?;
    fill_input(&mut input, &pixels)?;
    let output = TensorBuffer::for_tensor(&output_desc)?;

    let mut buffers = (vec![input], vec![output]);
    for _ in 0..config.inference.warmup {
        buffers = execute(&runner, buffers, config)?.0;
    }

    let runs = config.inference.runs.max(1);
    let mut total = Duration::ZERO;
    for _ in 0..runs {
        let (next, elapsed) = execute(&runner, buffers, config)?;
        buffers = next;
        total += elapsed;
    }
    let timing = Timing::new(total, runs);
    info!("Inference took {:.3} ms over {} run(s)", timing.latency_ms(), runs);

    let logits = read_logits(&buffers.1[0])?;
    Ok(Inference {
        classification: classify(&logits),
        timing,
        input_height: height,
        input_width: width,
        subgraph: subgraph.name.clone(),
    })
}

type Buffers = (Vec<TensorBuffer>, Vec<TensorBuffer>);

/// Submit one job, block on it and time the round trip.
fn execute<R: Runner>(
    runner: &R,
    (inputs, outputs): Buffers,
    config: &Config,
) -> Result<(Buffers, Duration)> {
    let start = Instant::now();
    let mut job = runner.execute_async(inputs, outputs)?;
    let done = job.wait(config.runner.timeout())?;
    let elapsed = start.elapsed();
    Ok(((done.inputs, done.outputs), elapsed))
}

/// Take the leading `NUM_CLASSES` values of the output tensor.
pub fn read_logits(output: &TensorBuffer) -> Result<[i8; NUM_CLASSES]> {
    let data = output.as_slice();
    if data.len() > NUM_CLASSES {
        warn!(
            "output `{}` has {} elements, using the first {}",
            output.desc().name,
            data.len(),
            NUM_CLASSES
        );
    }
    data.get(..NUM_CLASSES)
        .and_then(|s| <[i8; NUM_CLASSES]>::try_from(s).ok())
        .ok_or_else(|| {
            DpuError::tensor(format!(
                "output `{}` has {} elements, expected {}",
                output.desc().name,
                data.len(),
                NUM_CLASSES
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::TensorDesc;

    #[test]
    fn test_read_logits() {
        let desc = TensorDesc::new("logits", vec![1, 10], 8);
        let mut buffer = TensorBuffer::for_tensor(&desc).unwrap();
        buffer.as_mut_slice()[3] = 12;
        let logits = read_logits(&buffer).unwrap();
        assert_eq!(logits[3], 12);
        assert_eq!(logits.iter().filter(|&&v| v == 0).count(), 9);
    }

    #[test]
    fn test_read_logits_too_short() {
        let desc = TensorDesc::new("logits", vec![1, 4], 8);
        let buffer = TensorBuffer::for_tensor(&desc).unwrap();
        assert!(matches!(read_logits(&buffer), Err(DpuError::Tensor(_))));
    }

    #[test]
    fn test_read_logits_uses_prefix() {
        let desc = TensorDesc::new("logits", vec![1, 12], 8);
        let mut buffer = TensorBuffer::for_tensor(&desc).unwrap();
        buffer.as_mut_slice()[11] = 100;
        assert_eq!(read_logits(&buffer).unwrap(), [0; NUM_CLASSES]);
    }
}
