use std::fs;
use std::path::Path;

use serde_json::Value;
use summa::generation::{EncodedBatch, Padding, Tokenize};
use summa::{Error, Result};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::debug;

const DEFAULT_MODEL_MAX_LENGTH: usize = 512;
const DEFAULT_PAD_TOKEN: &str = "<pad>";

fn tokenizer_error(err: impl std::fmt::Display) -> Error {
    Error::Tokenizer(err.to_string())
}

/// [`Tokenize`] over a Hugging Face `tokenizer.json`.
#[derive(Clone)]
pub struct HfTokenizer {
    tokenizer: Tokenizer,
    model_max_length: usize,
    pad_token: String,
    pad_id: Option<u32>,
}

impl HfTokenizer {
    /// Wrap `tokenizer`, reading `model_max_length` and `pad_token` from the
    /// model's `tokenizer_config.json` when one is supplied.
    pub fn new(tokenizer: Tokenizer, tokenizer_config: Option<&Value>) -> Self {
        let model_max_length = tokenizer_config
            .and_then(|c| c.get("model_max_length"))
            .and_then(Value::as_u64)
            .map_or(DEFAULT_MODEL_MAX_LENGTH, |n| n as usize);

        // the config stores either a bare string or an added-token object
        let configured_pad = tokenizer_config
            .and_then(|c| c.get("pad_token"))
            .and_then(|t| t.as_str().or_else(|| t.get("content").and_then(Value::as_str)));

        let (pad_token, pad_id) = match tokenizer.get_padding() {
            Some(params) => (params.pad_token.clone(), Some(params.pad_id)),
            None => {
                let token = configured_pad.unwrap_or(DEFAULT_PAD_TOKEN).to_string();
                let id = tokenizer.token_to_id(&token);
                (token, id)
            }
        };
        debug!(model_max_length, pad_token = %pad_token, ?pad_id, "loaded tokenizer");
        Self { tokenizer, model_max_length, pad_token, pad_id }
    }

    pub fn from_files(tokenizer_file: &Path, tokenizer_config: Option<&Path>) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(tokenizer_file).map_err(tokenizer_error)?;
        let config = match tokenizer_config {
            Some(path) => Some(serde_json::from_slice::<Value>(&fs::read(path)?).map_err(tokenizer_error)?),
            None => None,
        };
        Ok(Self::new(tokenizer, config.as_ref()))
    }

    pub fn model_max_length(&self) -> usize {
        self.model_max_length
    }
}

impl Tokenize for HfTokenizer {
    fn encode(&self, texts: &[String], truncation: bool, padding: Padding) -> Result<EncodedBatch> {
        let mut tokenizer = self.tokenizer.clone();

        let (strategy, max_length) = match padding {
            Padding::Longest => (PaddingStrategy::BatchLongest, self.model_max_length),
            Padding::Fixed(len) => (PaddingStrategy::Fixed(len), len),
        };
        let truncation = truncation.then(|| TruncationParams { max_length, ..Default::default() });
        tokenizer.with_truncation(truncation).map_err(tokenizer_error)?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy,
            pad_id: self.pad_id.unwrap_or_default(),
            pad_token: self.pad_token.clone(),
            ..Default::default()
        }));

        let encodings = tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(tokenizer_error)?;
        let input_ids = encodings.iter().map(|e| e.get_ids().to_vec()).collect();
        let attention_mask = encodings.iter().map(|e| e.get_attention_mask().to_vec()).collect();
        EncodedBatch::new(input_ids, attention_mask)
    }

    fn pad_token_id(&self) -> Option<u32> {
        self.pad_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const TOKENIZER_JSON: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"<pad>": 0, "</s>": 1, "<unk>": 2, "hello": 3, "world": 4, "again": 5},
            "unk_token": "<unk>"
        }
    }"#;

    fn tokenizer(config: Option<Value>) -> HfTokenizer {
        HfTokenizer::new(Tokenizer::from_str(TOKENIZER_JSON).unwrap(), config.as_ref())
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pad_token_defaults() {
        let tok = tokenizer(None);
        assert_eq!(tok.pad_token_id(), Some(0));
        assert_eq!(tok.model_max_length(), 512);
    }

    #[test]
    fn test_config_overrides_pad_token_and_max_length() {
        let config = serde_json::json!({"model_max_length": 3, "pad_token": {"content": "</s>"}});
        let tok = tokenizer(Some(config));
        assert_eq!(tok.pad_token_id(), Some(1));
        assert_eq!(tok.model_max_length(), 3);
    }

    #[test]
    fn test_unknown_pad_token_has_no_id() {
        let tok = tokenizer(Some(serde_json::json!({"pad_token": "[PAD]"})));
        assert_eq!(tok.pad_token_id(), None);
    }

    #[test]
    fn test_longest_padding() {
        let batch = tokenizer(None)
            .encode(&texts(&["hello world again", "hello"]), true, Padding::Longest)
            .unwrap();
        assert_eq!(batch.input_ids().to_vec(), vec![vec![3u32, 4, 5], vec![3, 0, 0]]);
        assert_eq!(batch.attention_mask()[1], vec![1u32, 0, 0]);
    }

    #[test]
    fn test_fixed_padding_truncates_and_pads() {
        let batch = tokenizer(None)
            .encode(&texts(&["hello world again", "world"]), true, Padding::Fixed(2))
            .unwrap();
        assert_eq!(batch.input_ids().to_vec(), vec![vec![3u32, 4], vec![4, 0]]);
    }

    #[test]
    fn test_longest_truncates_to_model_max_length() {
        let tok = tokenizer(Some(serde_json::json!({"model_max_length": 2})));
        let batch = tok.encode(&texts(&["hello world again"]), true, Padding::Longest).unwrap();
        assert_eq!(batch.width(), 2);
    }
}
