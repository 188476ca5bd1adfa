//! # Summa
//!
//! Batched sequence-to-sequence generation with per-position confidence
//! extraction.
//!
//! ## Overview
//!
//! Given a list of source documents and their reference texts, this library
//! generates an output for every source with a pluggable model, keeps the
//! per-step vocabulary scores, and reduces them to the probability and id of
//! the most likely token at each generated position. The references are
//! tokenized to a fixed length alongside. The result is three aligned
//! `(N, L)` tensors written to disk:
//!
//! - `confidences.pt` holds top-1 probabilities (floating point)
//! - `predictions.pt` holds top-1 token ids (integer)
//! - `labels.pt` holds the tokenized references (integer)
//!
//! Row `i` of every file belongs to source `i`. Downstream tooling compares
//! predictions against labels and studies how confidence relates to
//! correctness.
//!
//! ## Architecture
//!
//! ### Assumptions
//! Regardless of backend used, summa reserves three dimensions with special meanings:
//!  - The `0th` dimension is reserved as the batch dimension
//!  - The `1st` dimension is reserved as the sequence dimension
//!  - The `2nd` dimension, where present, is the vocabulary dimension
//!
//! ### Backend Traits
//!
//! [`backend::Backend`], [`backend::Unsqueezable`], [`backend::TokenIds`] and
//! [`backend::ScoreTensor`] define what a tensor implementation must provide.
//! The pipeline itself never names a concrete tensor type.
//!
//! ### Collaborators
//!
//! Tokenization and generation are injected through
//! [`generation::Tokenize`], [`generation::Generate`] and
//! [`generation::TaskParams`], so any model stack can drive the pipeline.
//!
//! ### Alignment
//!
//! Generation stops at different lengths per chunk. Every chunk's scores are
//! padded to `max_new_tokens` positions with rows that put all mass on the
//! pad token, so the padded positions extract as confidence `1.0` and
//! prediction `pad`.
//!
//! ## Features
//!
//! - **candle** - Enables candle backend
//! - **burn** - Enables burn backend
//!

mod aggregate;
mod chunk;
mod error;
mod pipeline;
mod prefix;
mod store;
mod target;
mod tensor;

pub mod backend;
pub mod config;
pub mod generation;

/// Constants for client reference
pub use tensor::constant;

pub use aggregate::{Aggregator, DatasetTensors, RunMetadata};
pub use chunk::{chunk_count, chunks};
pub use error::{Error, Result};
pub use pipeline::{extract_logits_and_labels, Collaborators, Progress, Stage};
pub use prefix::{apply_prefix, resolve_prefix};
pub use store::{load_tensor, save_tensor, CONFIDENCES_FILE, LABELS_FILE, PREDICTIONS_FILE};
pub use target::tokenize_targets;
pub use tensor::operations::{
    concat_batches,
    confidences_and_predictions,
    pad_scores_to_length,
    stack_steps,
};
