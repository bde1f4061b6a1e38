//! CLI entry point for mnist-dpu.

use anyhow::{Context, Result};
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use mnist_dpu::cli::Cli;
use mnist_dpu::config::Config;
use mnist_dpu::pipeline::Inference;
use mnist_dpu::report;

/// Exit status for any failure; -1 as seen by the shell.
fn failure() -> ExitCode {
    ExitCode::from(255)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "vart")]
fn infer(cli: &Cli, config: &Config) -> Result<Inference> {
    use mnist_dpu::inference::{Graph, VartGraph};

    info!("Loading model: {}", cli.model.display());
    let graph = VartGraph::load(&cli.model)
        .with_context(|| format!("Failed to load model: {}", cli.model.display()))?;
    info!(
        "Graph `{}` has {} root subgraph(s)",
        graph.name(),
        graph.subgraphs().len()
    );

    Ok(mnist_dpu::pipeline::run(&graph, &cli.image, config)?)
}

#[cfg(not(feature = "vart"))]
fn infer(cli: &Cli, _config: &Config) -> Result<Inference> {
    use mnist_dpu::DpuError;

    info!("Loading model: {}", cli.model.display());
    if !cli.model.exists() {
        return Err(DpuError::FileNotFound(cli.model.clone()).into());
    }
    Err(DpuError::unsupported(
        "built without the `vart` feature; rebuild with `--features vart` to run on a DPU",
    )
    .into())
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = if let Some(config_path) = &cli.config {
        Config::from_yaml_file(config_path)
            .with_context(|| format!("Failed to load config: {}", config_path.display()))?
    } else {
        Config::default()
    };
    cli.apply_overrides(&mut config);
    config.validate()?;

    let inference = infer(cli, &config)?;
    print!("{}", report::render(&inference, cli.format)?);
    if cli.format != report::OutputFormat::Text {
        println!();
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse_args() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version also arrive here, on stdout.
            let is_usage_error = e.use_stderr();
            let _ = e.print();
            return if is_usage_error {
                failure()
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            failure()
        }
    }
}
