//! Error type shared by every stage of the extraction pipeline.

use thiserror::Error;

/// Errors produced while chunking, generating, aligning, aggregating or
/// persisting tensors.
///
/// Collaborator failures (tokenizer, generator) are carried through unchanged
/// in [`Error::Tokenizer`] and [`Error::Generation`]; the pipeline never
/// retries them.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller passed an argument outside its contract, e.g. a batch size of `0`.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The input data cannot be processed, e.g. an empty example set or
    /// mismatched example/reference counts.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A tensor shape broke an invariant the pipeline depends on.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A collaborator is missing configuration the pipeline needs,
    /// e.g. a pad token id.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("generation error: {0}")]
    Generation(String),

    /// Backend tensor operation failed.
    #[error("tensor error: {0}")]
    Tensor(String),

    #[cfg(feature = "candle")]
    #[error(transparent)]
    Candle(#[from] candle_core::Error),

    #[error("failed to persist tensors: {0}")]
    Persist(#[from] safetensors::SafeTensorError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, Error>;
