//! Timing and console reporting.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::classify::Classification;
use crate::pipeline::Inference;

/// Wall-clock time spent in timed executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Sum over all timed runs.
    pub total: Duration,
    pub runs: usize,
}

impl Timing {
    pub fn new(total: Duration, runs: usize) -> Self {
        Self { total, runs }
    }

    /// Mean latency per run in milliseconds, at microsecond resolution.
    pub fn latency_ms(&self) -> f64 {
        let micros = self.total.as_micros() / self.runs.max(1) as u128;
        micros as f64 / 1000.0
    }

    /// Runs per second at the mean latency; infinite for a zero latency.
    pub fn fps(&self) -> f64 {
        1000.0 / self.latency_ms()
    }
}

/// Output format for the inference report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Pretty,
}

/// Human-readable report of one inference.
pub struct TextReport<'a>(pub &'a Inference);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Inference {
            classification,
            timing,
            ..
        } = self.0;

        writeln!(f, "Predicted Digit: {}", classification.predicted)?;
        for (i, p) in classification.probabilities.iter().enumerate() {
            writeln!(f, "Class {}: {:.6}", i, p)?;
        }

        writeln!(f)?;
        writeln!(f, "--- Performance Metrics ---")?;
        if timing.runs > 1 {
            writeln!(f, "Runs: {}", timing.runs)?;
        }
        writeln!(f, "Inference Time: {:.3} ms", timing.latency_ms())?;
        writeln!(f, "Throughput (FPS): {:.2} frames/sec", timing.fps())
    }
}

/// Machine-readable report of one inference.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub predicted: usize,
    pub confidence: f32,
    pub probabilities: &'a [f32],
    pub logits: &'a [i8],
    pub latency_ms: f64,
    /// `null` when the latency rounds to zero.
    pub fps: Option<f64>,
    pub runs: usize,
    pub input_shape: [usize; 2],
    pub subgraph: &'a str,
}

impl<'a> JsonReport<'a> {
    pub fn new(inference: &'a Inference) -> Self {
        let Classification {
            logits,
            probabilities,
            predicted,
        } = &inference.classification;
        let fps = inference.timing.fps();

        Self {
            predicted: *predicted,
            confidence: inference.classification.confidence(),
            probabilities,
            logits,
            latency_ms: inference.timing.latency_ms(),
            fps: fps.is_finite().then_some(fps),
            runs: inference.timing.runs,
            input_shape: [inference.input_height, inference.input_width],
            subgraph: &inference.subgraph,
        }
    }
}

/// Render `inference` in the requested format.
pub fn render(inference: &Inference, format: OutputFormat) -> crate::Result<String> {
    Ok(match format {
        OutputFormat::Text => TextReport(inference).to_string(),
        OutputFormat::Json => serde_json::to_string(&JsonReport::new(inference))?,
        OutputFormat::Pretty => serde_json::to_string_pretty(&JsonReport::new(inference))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use approx::assert_abs_diff_eq;

    fn sample(total: Duration, runs: usize) -> Inference {
        Inference {
            classification: classify(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 5]),
            timing: Timing::new(total, runs),
            input_height: 28,
            input_width: 28,
            subgraph: "subgraph_conv2d".to_string(),
        }
    }

    #[test]
    fn test_timing_math() {
        let timing = Timing::new(Duration::from_micros(2500), 1);
        assert_abs_diff_eq!(timing.latency_ms(), 2.5);
        assert_abs_diff_eq!(timing.fps(), 400.0);

        // Sub-microsecond remainders are truncated.
        let timing = Timing::new(Duration::from_nanos(4_000_999), 4);
        assert_abs_diff_eq!(timing.latency_ms(), 1.0);
    }

    #[test]
    fn test_zero_latency_is_infinite_fps() {
        let timing = Timing::new(Duration::from_nanos(300), 1);
        assert_eq!(timing.latency_ms(), 0.0);
        assert!(timing.fps().is_infinite());
    }

    #[test]
    fn test_text_report_layout() {
        let text = render(&sample(Duration::from_micros(1250), 1), OutputFormat::Text).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Predicted Digit: 9");
        assert_eq!(lines.len(), 1 + 10 + 1 + 1 + 2);
        assert!(lines[1].starts_with("Class 0: 0.00"));
        assert!(lines[10].starts_with("Class 9: 0.94"));
        assert_eq!(lines[11], "");
        assert_eq!(lines[12], "--- Performance Metrics ---");
        assert_eq!(lines[13], "Inference Time: 1.250 ms");
        assert_eq!(lines[14], "Throughput (FPS): 800.00 frames/sec");
    }

    #[test]
    fn test_text_report_mentions_runs() {
        let text = render(&sample(Duration::from_millis(10), 10), OutputFormat::Text).unwrap();
        assert!(text.contains("Runs: 10\nInference Time: 1.000 ms\n"));
    }

    #[test]
    fn test_json_report() {
        let json = render(&sample(Duration::from_millis(2), 1), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["predicted"], 9);
        assert_eq!(value["probabilities"].as_array().unwrap().len(), 10);
        assert_eq!(value["logits"][9], 5);
        assert_eq!(value["latency_ms"], 2.0);
        assert_eq!(value["fps"], 500.0);
        assert_eq!(value["input_shape"], serde_json::json!([28, 28]));
        assert_eq!(value["subgraph"], "subgraph_conv2d");

        let json = render(&sample(Duration::ZERO, 1), OutputFormat::Pretty).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["fps"].is_null());
    }
}
