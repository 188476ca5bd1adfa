use tracing::debug;

use crate::backend::{Backend, ScoreTensor};
use crate::config::GenerateOptions;
use crate::error::{Error, Result};
use crate::prefix::apply_prefix;
use crate::tensor::constant::BATCH_DIM;
use crate::tensor::operations::stack_steps;
use super::{Generate, GenerationRequest, Padding, Tokenize};


/// Drives the generation collaborator over one chunk of source examples.
///
/// Holds the per-run settings shared by every chunk; the collaborators are
/// passed per call so the caller keeps ownership of them.
#[derive(Debug, Clone)]
pub struct BatchedGenerator<'a> {
    /// Prepended to every example before tokenization
    pub prefix: &'a str,

    /// Upper bound handed to the collaborator
    pub max_new_tokens: usize,

    /// Forwarded verbatim to the collaborator
    pub options: &'a GenerateOptions,
}

impl BatchedGenerator<'_> {
    /// Generate raw scores for `chunk`.
    ///
    /// The chunk is prefixed, tokenized with padding to its longest example
    /// (truncation enabled), and handed to `generator` with a request for a
    /// single sequence per input and per-step scores. The steps are stacked
    /// into a tensor of shape `(chunk.len(), generated_len, vocab)`, where
    /// `generated_len` is whatever the collaborator chose, at most
    /// `max_new_tokens`.
    ///
    /// # Errors
    ///
    /// Collaborator errors are returned unchanged. A reply with no score steps,
    /// or with steps whose batch dimension differs from `chunk.len()`, is an
    /// [`Error::InvariantViolation`].
    pub fn generate_chunk<S, T, G>(
        &self,
        chunk: &[String],
        tokenizer: &T,
        generator: &mut G,
    ) -> Result<S>
    where
        S: ScoreTensor,
        T: Tokenize + ?Sized,
        G: Generate<S> + ?Sized,
    {
        let texts = apply_prefix(self.prefix, chunk);
        let batch = tokenizer.encode(&texts, true, Padding::Longest)?;
        if batch.rows() != chunk.len() {
            return Err(Error::InvariantViolation(format!(
                "tokenizer returned {} rows for {} examples", batch.rows(), chunk.len()
            )));
        }

        let request = GenerationRequest {
            max_new_tokens: self.max_new_tokens,
            num_return_sequences: 1,
            output_scores: true,
            options: self.options,
        };
        let output = generator.generate(&batch, &request)?;

        if let Some(step) = output.scores.iter().find(|s| s.shape()[BATCH_DIM] != chunk.len()) {
            return Err(Error::InvariantViolation(format!(
                "score step of shape {:?} does not match a chunk of {} examples",
                step.shape(),
                chunk.len()
            )));
        }
        let scores: S = stack_steps(&output.scores)?;
        debug!(
            rows = chunk.len(),
            input_width = batch.width(),
            shape = ?scores.shape(),
            "generated chunk scores"
        );
        Ok(scores)
    }
}
