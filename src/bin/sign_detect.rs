//! sign_detect - one-shot hand-sign classification
//!
//! Loads the model, classifies one image or video, prints one JSON document
//! to stdout and exits 0 on success, 1 on any failure.

use std::path::PathBuf;

use clap::Parser;

use sign_inference::config::{ClassifierBackend, ConfigOverrides, PipelineKind};
use sign_inference::worker::{to_line, ErrorResponse};
use sign_inference::{classify, MediaType, Request, Worker, WorkerConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input file path.
    #[arg(long)]
    file: PathBuf,
    /// Input type: image or video.
    #[arg(long = "type", value_parser = ["image", "video"])]
    media_type: String,
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

    let args = Args::parse();
    let media_type = if args.media_type == "video" {
        MediaType::Video
    } else {
        MediaType::Image
    };
    let request = Request::new(args.file.clone(), media_type);

    match run(args, &request) {
        Ok(line) => {
            println!("{line}");
        }
        Err(response) => {
            println!("{}", to_line(&response.with_request(&request.file, media_type)));
            std::process::exit(1);
        }
    }
}

fn run(args: Args, request: &Request) -> Result<String, ErrorResponse> {
    if !request.file.exists() {
        let err = sign_inference::Error::FileNotFound {
            path: request.file.clone(),
        };
        return Err(ErrorResponse::from(&err));
    }

    let overrides = ConfigOverrides {
        config_path: args.config,
        pipeline: args.pipeline,
        backend: args.backend,
        model_path: args.model,
    };
    let config = WorkerConfig::load_with(overrides)
        .map_err(|err| ErrorResponse::new(format!("{err:#}"), "config_error"))?;

    let classifier = classify::load_classifier(&config).map_err(|err| ErrorResponse::from(&err))?;
    let worker = Worker::new(classifier, config.pipeline);
    let result = worker
        .handle(request)
        .map_err(|err| ErrorResponse::from(&err))?;
    Ok(to_line(&result))
}
