//! # Generation
//!
//! The collaborator seams of the pipeline and the per-chunk generation driver.
//!
//! ## Key Components
//!
//! * [`Tokenize`] - the tokenization collaborator (dynamic or fixed padding)
//! * [`Generate`] - the generation collaborator, returning per-step scores
//! * [`TaskParams`] - task-specific model configuration and default prefix
//! * [`BatchedGenerator`] - tokenizes one chunk, calls the generator and
//!   stacks the per-step scores into a `(batch, seq, vocab)` tensor
//!
//! Collaborators are explicit handles passed in by the caller, so tests drive
//! the pipeline with fakes that produce deterministic scores.

mod batched;
mod core_trait;

pub use batched::BatchedGenerator;
pub use core_trait::*;

#[cfg(test)]
/// Fake tokenizer and generator producing deterministic scores.
pub(crate) mod mock_collaborators;
