//! Fixed-length tokenization of reference texts.

use crate::backend::TokenIds;
use crate::error::{Error, Result};
use crate::generation::{Padding, Tokenize};

/// Tokenize a chunk of references to exactly `target_length` tokens each.
///
/// References are truncated and padded to the fixed length ("pad to max
/// length"), independently of anything generated, and returned as an integer
/// tensor of shape `(chunk.len(), target_length)` on `device`.
///
/// # Errors
///
/// Tokenizer errors are returned unchanged. A tokenizer reply that is not
/// exactly `(chunk.len(), target_length)` is an [`Error::InvariantViolation`].
pub fn tokenize_targets<I, T>(
    chunk: &[String],
    tokenizer: &T,
    target_length: usize,
    device: &I::Device,
) -> Result<I>
where
    I: TokenIds,
    T: Tokenize + ?Sized,
{
    let batch = tokenizer.encode(chunk, true, Padding::Fixed(target_length))?;
    if batch.rows() != chunk.len() || batch.width() != target_length {
        return Err(Error::InvariantViolation(format!(
            "expected ({}, {target_length}) target ids, tokenizer returned ({}, {})",
            chunk.len(),
            batch.rows(),
            batch.width()
        )));
    }
    I::from_ids(&batch.flat_ids(), chunk.len(), target_length, device)
}
