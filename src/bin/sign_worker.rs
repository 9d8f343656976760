//! sign_worker - persistent hand-sign classification worker
//!
//! This process:
//! 1. Loads the classifier once (the only fatal failure point)
//! 2. Writes `{"status":"ready"}` to stdout
//! 3. Reads newline-delimited JSON requests from stdin, one at a time
//! 4. Writes exactly one JSON response line per request
//! 5. Exits 0 when stdin closes
//!
//! Logs go to stderr; stdout carries protocol lines only.

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use sign_inference::config::{ClassifierBackend, ConfigOverrides, PipelineKind};
use sign_inference::worker::{to_line, ErrorResponse};
use sign_inference::{Worker, WorkerConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON config file (overrides SIGN_CONFIG).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Pipeline preset: grayscale or color.
    #[arg(long)]
    pipeline: Option<PipelineKind>,
    /// Model artifact path (overrides install-dir resolution).
    #[arg(long)]
    model: Option<PathBuf>,
    /// Classifier backend: tract or stub.
    #[arg(long)]
    backend: Option<ClassifierBackend>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Args::parse()) {
        log::error!("worker terminated: {:#}", err);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let stdout = io::stdout();
    let mut output = BufWriter::new(stdout.lock());

    let overrides = ConfigOverrides {
        config_path: args.config,
        pipeline: args.pipeline,
        backend: args.backend,
        model_path: args.model,
    };
    let config = match WorkerConfig::load_with(overrides) {
        Ok(config) => config,
        Err(err) => {
            let response = ErrorResponse::new(
                format!("Worker initialization failed: {err:#}"),
                "config_error",
            );
            writeln!(output, "{}", to_line(&response))?;
            output.flush()?;
            return Err(err);
        }
    };
    log::info!(
        "pipeline={} model={} backend={:?}",
        config.pipeline.kind,
        config.model_path.display(),
        config.backend
    );

    let worker = Worker::start(&config, &mut output)?;
    let stdin = io::stdin();
    worker.serve(stdin.lock(), output)?;
    Ok(())
}
