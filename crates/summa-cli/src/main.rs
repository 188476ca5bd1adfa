mod args;
mod hub;
mod input;
mod progress;
mod t5;
mod tokenizer;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{DType, Tensor};
use clap::Parser;
use serde::Serialize;
use summa::config::{ExtractConfig, GenerateOptions};
use summa::{extract_logits_and_labels, Collaborators, RunMetadata};
use tracing::{info, warn};

use crate::args::Args;
use crate::hub::ModelFiles;
use crate::progress::ChunkBars;
use crate::t5::T5Generator;
use crate::tokenizer::HfTokenizer;

/// What is printed on stdout once a run finished.
#[derive(Debug, Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    metadata: RunMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<&'a Args>,
    #[serde(skip_serializing_if = "Option::is_none")]
    info: Option<String>,
}

fn run(args: &Args) -> Result<RunMetadata> {
    let generate_options = GenerateOptions::from_args(&args.generate_args)?;
    if !generate_options.is_empty() {
        info!(options = ?generate_options, "parsed generation options");
    }

    let (examples, targets) = input::read_pairs(
        &args.input_path,
        &args.reference_path,
        &args.model_name,
        args.n_obs,
    )?;
    info!(examples = examples.len(), references = targets.len(), "read inputs");

    let device = args::device(args.device.as_deref())?;
    let files = ModelFiles::fetch(&args.model_name, &args.revision)?;
    let tokenizer = HfTokenizer::from_files(&files.tokenizer, files.tokenizer_config.as_deref())?;
    let dtype = if args.fp16 { DType::F16 } else { DType::F32 };
    let mut generator = T5Generator::load(&files, dtype, &device)?;

    let mut config = ExtractConfig::new(&args.save_path);
    config.batch_size = args.bs;
    config.task = args.task.clone();
    config.prefix = args.prefix.clone();
    config.generate_options = generate_options;

    let metadata = extract_logits_and_labels::<Tensor, _, _>(
        &examples,
        &targets,
        Collaborators { tokenizer: &tokenizer, generator: &mut generator, progress: &mut ChunkBars::new() },
        &config,
        &device,
    )?;
    Ok(metadata)
}

fn write_report(path: &Path, report: &Report<'_>) -> Result<()> {
    if path.exists() {
        warn!(path = %path.display(), "score path exists and will be overwritten");
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(report)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("summa=info,run_extract=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let metadata = run(&args)?;

    let report = Report {
        metadata,
        args: args.dump_args.then_some(&args),
        info: if args.dump_args { args.info() } else { None },
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    if let Some(path) = &args.score_path {
        write_report(path, &report)?;
    }
    Ok(())
}
