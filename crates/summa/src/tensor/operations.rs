use crate::backend::{Backend, ScoreTensor, Unsqueezable};
use crate::error::{Error, Result};
use super::constant::{BATCH_DIM, SEQ_DIM, VOCAB_DIM};
use tracing::trace;

/// Stacks per-step score tensors into one score tensor.
///
/// Generation collaborators report one `(batch, vocab)` tensor per generated
/// position. This function gives each step a sequence dimension of size `1`
/// and concatenates the steps along it, in order.
///
/// # Parameters
///
/// * `steps` - Tensors of shape `(batch, vocab)`, one per generated position
///
/// # Returns
///
/// A tensor of shape `(batch, steps.len(), vocab)`.
///
/// # Errors
///
/// [`Error::InvariantViolation`] when `steps` is empty, since an empty list
/// carries neither a batch nor a vocabulary size.
pub fn stack_steps<S>(steps: &[S::Step]) -> Result<S>
where S: ScoreTensor
{
    if steps.is_empty() {
        return Err(Error::InvariantViolation(
            "generation produced no score steps".to_string()
        ));
    }
    let unsqueezed = steps
        .iter()
        .map(|step| step.unsqueeze(SEQ_DIM))
        .collect::<Result<Vec<S>>>()?;
    S::cat(&unsqueezed, SEQ_DIM)
}


/// Pads a score tensor along the sequence dimension to exactly `max_len` positions.
///
/// Generation stops at a length chosen by the collaborator, so score tensors
/// from different chunks differ in their sequence dimension. Concatenating
/// them into one dataset-level tensor requires every chunk to have the same
/// length, which this function restores.
///
/// # Parameters
///
/// * `scores` - Tensor of shape `(batch, generated_len, vocab)`
/// * `max_len` - The length every score tensor is aligned to
/// * `pad_token_id` - Vocabulary position the synthetic rows are certain of
///
/// # Returns
///
/// A tensor of shape `(batch, max_len, vocab)`. When `generated_len < max_len`,
/// `max_len - generated_len` synthetic rows are appended after the real rows;
/// each holds `-inf` at every vocabulary position except `pad_token_id`, which
/// holds `+inf`. A softmax over such a row puts probability `1.0` on the pad
/// token, so padded positions read as "predicted the pad token with full
/// certainty". When `generated_len == max_len` the input is returned untouched.
///
/// # Errors
///
/// * [`Error::InvariantViolation`] if the tensor is not rank 3 or if
///   `generated_len > max_len`; nothing is truncated.
/// * [`Error::Configuration`] if `pad_token_id` is outside the vocabulary.
pub fn pad_scores_to_length<S>(
    scores: S,
    max_len: usize,
    pad_token_id: u32,
) -> Result<S>
where S: ScoreTensor
{
    let dims = scores.shape();
    if dims.len() != 3 {
        return Err(Error::InvariantViolation(format!(
            "score tensor must be (batch, seq, vocab), got {dims:?}"
        )));
    }
    let generated_len = dims[SEQ_DIM];
    if generated_len > max_len {
        return Err(Error::InvariantViolation(format!(
            "generated length {generated_len} exceeds the maximum of {max_len}"
        )));
    }

    let pad_len = max_len - generated_len;
    if pad_len == 0 {
        return Ok(scores);
    }
    trace!(pad_len, pad_token_id, "appending certain pad rows");
    let padding = scores.certain_rows_like(pad_len, pad_token_id)?;
    S::cat(&[scores, padding], SEQ_DIM)
}


/// Reduces a score tensor to per-position confidences and predictions.
///
/// Applies a softmax over the vocabulary dimension and takes, for every
/// `(batch, seq)` position, the largest probability and its vocabulary index.
/// Ties resolve to the backend's argmax, which is the lowest index on the
/// candle backend.
///
/// # Parameters
///
/// * `scores` - Tensor of shape `(batch, seq, vocab)`
///
/// # Returns
///
/// `(confidences, predictions)`, both of shape `(batch, seq)`.
pub fn confidences_and_predictions<S>(scores: &S) -> Result<(S::Confidence, S::Indices)>
where S: ScoreTensor
{
    let dims = scores.shape();
    if dims.len() != 3 || dims[VOCAB_DIM] == 0 {
        return Err(Error::InvariantViolation(format!(
            "score tensor must be (batch, seq, vocab) with a non-empty vocabulary, got {dims:?}"
        )));
    }
    scores.top1()
}


/// Concatenates per-chunk tensors along the batch dimension, in the order supplied.
///
/// # Errors
///
/// [`Error::Tensor`] if `parts` is empty or the parts disagree on any
/// non-batch dimension.
pub fn concat_batches<B>(parts: &[B]) -> Result<B>
where B: Backend
{
    B::cat(parts, BATCH_DIM)
}
