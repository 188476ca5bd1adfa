use std::cell::RefCell;

use crate::backend::mock_tensor::MockTensor;
use crate::config::GenerateOptions;
use crate::error::{Error, Result};
use super::{EncodedBatch, Generate, Generation, GenerationRequest, Padding, TaskParams, Tokenize};

pub const VOCAB: usize = 32;
pub const PAD: u32 = 0;
pub const EOS: u32 = 1;
const MODEL_MAX: usize = 16;

// Whitespace tokenizer with a stable word -> id mapping
pub struct MockTokenizer {
    pub pad: Option<u32>,
    pub seen: RefCell<Vec<String>>,
}

impl MockTokenizer {
    pub fn new() -> Self {
        Self { pad: Some(PAD), seen: RefCell::new(vec![]) }
    }

    pub fn word_id(word: &str) -> u32 {
        2 + (word.bytes().map(u32::from).sum::<u32>() % (VOCAB as u32 - 2))
    }
}

impl Tokenize for MockTokenizer {
    fn encode(&self, texts: &[String], truncation: bool, padding: Padding) -> Result<EncodedBatch> {
        self.seen.borrow_mut().extend(texts.iter().cloned());
        let limit = match padding {
            Padding::Fixed(n) => n,
            Padding::Longest => MODEL_MAX,
        };
        let mut rows: Vec<Vec<u32>> = texts
            .iter()
            .map(|t| {
                let mut ids: Vec<u32> = t.split_whitespace().map(Self::word_id).collect();
                ids.push(EOS);
                if truncation && ids.len() > limit {
                    ids.truncate(limit - 1);
                    ids.push(EOS);
                }
                ids
            })
            .collect();
        let width = match padding {
            Padding::Fixed(n) => n,
            Padding::Longest => rows.iter().map(Vec::len).max().unwrap_or(0),
        };
        let pad = self.pad.unwrap_or(PAD);
        let mask: Vec<Vec<u32>> = rows
            .iter_mut()
            .map(|r| {
                let real = r.len();
                r.resize(width, pad);
                (0..width).map(|i| u32::from(i < real)).collect::<Vec<u32>>()
            })
            .collect();
        EncodedBatch::new(rows, mask)
    }

    fn pad_token_id(&self) -> Option<u32> {
        self.pad
    }
}

// Deterministic generator: row `b` emits `first_input_id + t` at step `t` and
// stops after as many steps as it has input tokens, capped by the request.
pub struct MockGenerator {
    pub calls: Vec<usize>,
    pub extra_steps: usize,
    pub fail: bool,
    pub prefix: Option<String>,
    pub applied_task: Option<String>,
    pub seen_options: Vec<GenerateOptions>,
    pub seen_max_new_tokens: Vec<usize>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            calls: vec![],
            extra_steps: 0,
            fail: false,
            prefix: None,
            applied_task: None,
            seen_options: vec![],
            seen_max_new_tokens: vec![],
        }
    }

    pub fn expected_token(first: u32, step: usize) -> u32 {
        2 + ((first as usize + step) % (VOCAB - 2)) as u32
    }
}

impl Generate<MockTensor> for MockGenerator {
    fn generate(&mut self, batch: &EncodedBatch, request: &GenerationRequest<'_>) -> Result<Generation<MockTensor>> {
        if self.fail {
            return Err(Error::Generation("device out of memory".to_string()));
        }
        assert_eq!(request.num_return_sequences, 1);
        assert!(request.output_scores);
        self.calls.push(batch.rows());
        self.seen_options.push(request.options.clone());
        self.seen_max_new_tokens.push(request.max_new_tokens);

        let lengths: Vec<usize> = (0..batch.rows())
            .map(|b| batch.unpadded_row(b).len().min(request.max_new_tokens))
            .collect();
        let steps = lengths.iter().copied().max().unwrap_or(0) + self.extra_steps;

        let mut sequences = vec![vec![]; batch.rows()];
        let scores = (0..steps)
            .map(|t| {
                let mut data = Vec::with_capacity(batch.rows() * VOCAB);
                for (b, seq) in sequences.iter_mut().enumerate() {
                    let token = if t < lengths[b] {
                        Self::expected_token(batch.input_ids()[b][0], t)
                    } else {
                        PAD
                    };
                    seq.push(token);
                    let mut row = vec![0.0; VOCAB];
                    row[token as usize] = 4.0;
                    data.extend(row);
                }
                MockTensor::new(vec![batch.rows(), VOCAB], data)
            })
            .collect();
        Ok(Generation { sequences, scores })
    }
}

impl TaskParams for MockGenerator {
    fn apply_task_params(&mut self, task: &str) -> Result<()> {
        self.applied_task = Some(task.to_string());
        Ok(())
    }

    fn default_prefix(&self) -> Option<String> {
        self.prefix.clone()
    }
}
