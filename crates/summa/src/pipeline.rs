//! End-to-end extraction: chunk, generate, align, extract, aggregate, persist.

use std::time::Instant;

use tracing::{debug, info};

use crate::aggregate::{Aggregator, RunMetadata};
use crate::backend::ScoreTensor;
use crate::chunk::{chunk_count, chunks};
use crate::config::ExtractConfig;
use crate::error::{Error, Result};
use crate::generation::{BatchedGenerator, Generate, TaskParams, Tokenize};
use crate::prefix::resolve_prefix;
use crate::target::tokenize_targets;
use crate::tensor::operations::{confidences_and_predictions, pad_scores_to_length};


/// The two chunked passes of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Generation,
    References,
}

/// Observer of chunk progress. Every method defaults to doing nothing, and
/// `()` is the silent observer.
pub trait Progress {
    /// `stage` is about to process `chunks` chunks.
    fn start(&mut self, _stage: Stage, _chunks: usize) {}

    /// One chunk of `rows` rows of `stage` is done.
    fn advance(&mut self, _stage: Stage, _rows: usize) {}

    fn finish(&mut self, _stage: Stage) {}
}

impl Progress for () {}

/// The collaborators a run is driven by.
///
/// The generator also carries the task parameters, as a pretrained model
/// does, and is borrowed mutably because generation may update internal state
/// such as a key/value cache.
pub struct Collaborators<'a, T: ?Sized, G: ?Sized> {
    pub tokenizer: &'a T,
    pub generator: &'a mut G,
    pub progress: &'a mut dyn Progress,
}


/// Generate confidences and predictions for `examples`, tokenize `targets`,
/// and save the three resulting `(N, L)` tensors under `config.save_dir`.
///
/// Chunks are processed strictly in order. Row `i` of every saved tensor
/// belongs to `examples[i]` / `targets[i]`. Nothing is written unless every
/// chunk succeeded. `collaborators.progress` is told about every chunk of
/// both passes as it completes.
///
/// # Errors
///
/// Before any generation:
/// * [`Error::InvalidInput`] for an empty example set or when `examples` and
///   `targets` differ in length.
/// * [`Error::InvalidArgument`] for a zero batch size or length.
/// * [`Error::Configuration`] when the tokenizer has no pad token.
///
/// During the run, collaborator errors are returned unchanged, and a chunk
/// whose generated length exceeds `config.max_new_tokens` is an
/// [`Error::InvariantViolation`].
pub fn extract_logits_and_labels<S, T, G>(
    examples: &[String],
    targets: &[String],
    collaborators: Collaborators<'_, T, G>,
    config: &ExtractConfig,
    device: &S::Device,
) -> Result<RunMetadata>
where
    S: ScoreTensor,
    T: Tokenize + ?Sized,
    G: Generate<S> + TaskParams + ?Sized,
{
    let Collaborators { tokenizer, generator, progress } = collaborators;

    if examples.is_empty() {
        return Err(Error::InvalidInput("no examples to process".to_string()));
    }
    if examples.len() != targets.len() {
        return Err(Error::InvalidInput(format!(
            "{} examples but {} references", examples.len(), targets.len()
        )));
    }
    config.validate()?;
    let pad_token_id = tokenizer.pad_token_id().ok_or_else(|| {
        Error::Configuration("tokenizer does not define a pad token".to_string())
    })?;

    let start = Instant::now();
    generator.apply_task_params(&config.task)?;
    let prefix = resolve_prefix(config.prefix.as_deref(), generator.default_prefix());
    debug!(task = %config.task, prefix = %prefix, pad_token_id, "starting extraction");

    let driver = BatchedGenerator {
        prefix: &prefix,
        max_new_tokens: config.max_new_tokens,
        options: &config.generate_options,
    };
    let total = chunk_count(examples.len(), config.batch_size)?;
    let mut aggregator = Aggregator::<S>::new();

    progress.start(Stage::Generation, total);
    for (i, chunk) in chunks(examples, config.batch_size)?.enumerate() {
        let scores: S = driver.generate_chunk(chunk, tokenizer, &mut *generator)?;
        let padded = pad_scores_to_length(scores, config.max_new_tokens, pad_token_id)?;
        let (confidences, predictions) = confidences_and_predictions(&padded)?;
        aggregator.push_generation(confidences, predictions);
        progress.advance(Stage::Generation, chunk.len());
        debug!(chunk = i + 1, total, "generated");
    }
    progress.finish(Stage::Generation);

    progress.start(Stage::References, total);
    for chunk in chunks(targets, config.batch_size)? {
        let labels = tokenize_targets::<S::Indices, T>(chunk, tokenizer, config.target_length, device)?;
        aggregator.push_labels(labels);
        progress.advance(Stage::References, chunk.len());
    }
    progress.finish(Stage::References);
    debug!(chunks = total, "tokenized references");

    let tensors = aggregator.finish()?;
    tensors.save(&config.save_dir)?;

    let metadata = RunMetadata::new(examples.len(), start.elapsed())?;
    info!(
        n_obs = metadata.n_obs,
        runtime = metadata.runtime,
        seconds_per_sample = metadata.seconds_per_sample,
        "extraction finished"
    );
    Ok(metadata)
}
