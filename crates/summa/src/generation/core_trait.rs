use crate::backend::ScoreTensor;
use crate::config::GenerateOptions;
use crate::error::{Error, Result};


/// How a batch of texts is padded by the tokenization collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// Pad every row to the longest row of the batch.
    Longest,
    /// Pad (and, with truncation, cut) every row to exactly this many tokens.
    Fixed(usize),
}


/// Rectangular, host-side output of the tokenization collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBatch {
    input_ids: Vec<Vec<u32>>,
    attention_mask: Vec<Vec<u32>>,
}

impl EncodedBatch {
    /// # Errors
    ///
    /// [`Error::InvariantViolation`] unless ids and mask have the same number
    /// of rows and every row has the same width.
    pub fn new(input_ids: Vec<Vec<u32>>, attention_mask: Vec<Vec<u32>>) -> Result<Self> {
        if input_ids.len() != attention_mask.len() {
            return Err(Error::InvariantViolation(format!(
                "{} id rows but {} attention mask rows", input_ids.len(), attention_mask.len()
            )));
        }
        let width = input_ids.first().map_or(0, Vec::len);
        let ragged = input_ids.iter().chain(attention_mask.iter()).any(|row| row.len() != width);
        if ragged {
            return Err(Error::InvariantViolation("tokenized batch is not rectangular".to_string()));
        }
        Ok(Self { input_ids, attention_mask })
    }

    pub fn rows(&self) -> usize {
        self.input_ids.len()
    }

    pub fn width(&self) -> usize {
        self.input_ids.first().map_or(0, Vec::len)
    }

    pub fn input_ids(&self) -> &[Vec<u32>] {
        &self.input_ids
    }

    pub fn attention_mask(&self) -> &[Vec<u32>] {
        &self.attention_mask
    }

    /// Ids of row `i` with masked-out positions removed.
    pub fn unpadded_row(&self, i: usize) -> Vec<u32> {
        self.input_ids[i]
            .iter()
            .zip(self.attention_mask[i].iter())
            .filter(|(_, m)| **m != 0)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Row-major ids, `rows() * width()` long.
    pub fn flat_ids(&self) -> Vec<u32> {
        self.input_ids.concat()
    }
}


/// # Tokenize
///
/// The tokenization collaborator. Implementations wrap a pretrained
/// tokenizer; the pipeline never tokenizes on its own.
pub trait Tokenize {
    /// Encode `texts` into a rectangular batch.
    ///
    /// With `truncation`, [`Padding::Fixed`] rows are cut to the fixed length
    /// and [`Padding::Longest`] rows to the model's maximum input length.
    fn encode(&self, texts: &[String], truncation: bool, padding: Padding) -> Result<EncodedBatch>;

    /// Id of the padding token, if the tokenizer defines one.
    fn pad_token_id(&self) -> Option<u32>;
}


/// Parameters of a single generation call.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    /// Upper bound on generated positions.
    pub max_new_tokens: usize,
    /// Sequences returned per input; the pipeline always asks for `1`.
    pub num_return_sequences: usize,
    /// Whether per-step vocabulary scores must be returned.
    pub output_scores: bool,
    /// Extra options forwarded verbatim.
    pub options: &'a GenerateOptions,
}


/// Output of a generation call.
#[derive(Debug, Clone)]
pub struct Generation<S>
where S: ScoreTensor
{
    /// Generated token ids, one row per input.
    pub sequences: Vec<Vec<u32>>,
    /// One `(batch, vocab)` score tensor per generated position, in order.
    /// Never longer than the request's `max_new_tokens`.
    pub scores: Vec<S::Step>,
}


/// # Generate
///
/// The generation collaborator: a pretrained sequence-to-sequence model with
/// its decoding strategy.
///
/// The collaborator decides when to stop (e.g. all rows emitted an
/// end-of-sequence token, or `max_new_tokens` was reached), so the number of
/// score steps differs from call to call. Errors propagate to the caller
/// unchanged; the pipeline does not retry.
pub trait Generate<S>
where S: ScoreTensor
{
    fn generate(&mut self, batch: &EncodedBatch, request: &GenerationRequest<'_>) -> Result<Generation<S>>;
}


/// # TaskParams
///
/// Task-specific model configuration, applied once before generation.
pub trait TaskParams {
    /// Apply the model's parameters for `task` (e.g. `"summarization"`).
    fn apply_task_params(&mut self, task: &str) -> Result<()>;

    /// Prefix the model expects in front of every input, if any.
    fn default_prefix(&self) -> Option<String>;
}
