use std::fs;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::t5;
use serde_json::Value;
use summa::backend::ScoreTensor;
use summa::config::{GenerateOptions, OptionValue};
use summa::generation::{EncodedBatch, Generate, Generation, GenerationRequest, TaskParams};
use summa::{Error, Result};
use tracing::{debug, warn};

use crate::hub::ModelFiles;

const DEFAULT_SEED: u64 = 299792458;
const DEFAULT_TOP_K: usize = 50;
const SUPPORTED_OPTIONS: [&str; 7] = ["do_sample", "temperature", "top_k", "top_p", "seed", "min_length", "num_beams"];


/// Decoding settings read from the generation options.
#[derive(Debug, Clone)]
pub struct DecodeSettings {
    pub sampling: Sampling,
    pub seed: u64,
    pub min_length: usize,
    pub num_beams: usize,
}

fn option<T>(
    options: &GenerateOptions,
    key: &str,
    convert: impl Fn(&OptionValue) -> Option<T>,
) -> Result<Option<T>> {
    options
        .get(key)
        .map(|value| {
            convert(value).ok_or_else(|| {
                Error::InvalidArgument(format!("invalid value `{value}` for generation option `{key}`"))
            })
        })
        .transpose()
}

fn as_usize(value: &OptionValue) -> Option<usize> {
    value.as_i64().and_then(|v| usize::try_from(v).ok())
}

impl DecodeSettings {
    /// Greedy decoding unless `do_sample` is set, in which case `temperature`,
    /// `top_k` (default 50, `0` disables) and `top_p` shape the distribution.
    pub fn from_options(options: &GenerateOptions) -> Result<Self> {
        for (key, _) in options.iter().filter(|(k, _)| !SUPPORTED_OPTIONS.contains(&k.as_str())) {
            debug!(option = %key, "ignoring unsupported generation option");
        }

        let do_sample = option(options, "do_sample", OptionValue::as_bool)?.unwrap_or(false);
        let temperature = option(options, "temperature", OptionValue::as_f64)?.unwrap_or(1.0);
        let top_k = option(options, "top_k", as_usize)?
            .unwrap_or(DEFAULT_TOP_K);
        let top_p = option(options, "top_p", OptionValue::as_f64)?;

        let sampling = if !do_sample || temperature <= 0. {
            Sampling::ArgMax
        } else {
            let top_k = (top_k > 0).then_some(top_k);
            let top_p = top_p.filter(|&p| p < 1.0);
            match (top_k, top_p) {
                (None, None) => Sampling::All { temperature },
                (Some(k), None) => Sampling::TopK { k, temperature },
                (None, Some(p)) => Sampling::TopP { p, temperature },
                (Some(k), Some(p)) => Sampling::TopKThenTopP { k, p, temperature },
            }
        };

        Ok(Self {
            sampling,
            seed: option(options, "seed", |v| v.as_i64().and_then(|s| u64::try_from(s).ok()))?
                .unwrap_or(DEFAULT_SEED),
            min_length: option(options, "min_length", as_usize)?.unwrap_or(0),
            num_beams: option(options, "num_beams", as_usize)?.unwrap_or(1),
        })
    }
}


/// `task_specific_params[task]` of a model config, split into default
/// generation options and the task prefix.
pub fn task_params(config: &Value, task: &str) -> (GenerateOptions, Option<String>) {
    let mut defaults = GenerateOptions::default();
    let mut prefix = None;
    let params = config
        .get("task_specific_params")
        .and_then(|p| p.get(task))
        .and_then(Value::as_object);
    for (key, value) in params.into_iter().flatten() {
        if key == "prefix" {
            prefix = value.as_str().map(str::to_string);
            continue;
        }
        match serde_json::from_value::<OptionValue>(value.clone()) {
            Ok(value) => {
                defaults.insert(key.clone(), value);
            }
            Err(_) => debug!(option = %key, "skipping non-scalar task parameter"),
        }
    }
    (defaults, prefix)
}


fn suppress_token(logits: &Tensor, token: usize) -> Result<Tensor> {
    let mut values = logits.to_dtype(DType::F32)?.to_vec1::<f32>()?;
    if let Some(v) = values.get_mut(token) {
        *v = f32::NEG_INFINITY;
    }
    Ok(Tensor::from_vec(values, logits.dims1()?, logits.device())?.to_dtype(logits.dtype())?)
}


/// Tokens and per-step `(vocab,)` scores of one decoded row.
#[derive(Debug, Clone)]
struct DecodedRow {
    tokens: Vec<u32>,
    scores: Vec<Tensor>,
}

// Rows that stopped early are continued with certain-pad scores and pad tokens
// up to the longest row, so every step covers the whole batch.
fn assemble(rows: Vec<DecodedRow>, pad_token_id: u32) -> Result<Generation<Tensor>> {
    let steps = rows.iter().map(|r| r.scores.len()).max().unwrap_or(0);
    let Some(reference) = rows.iter().find_map(|r| r.scores.first()).cloned() else {
        return Ok(Generation { sequences: rows.into_iter().map(|r| r.tokens).collect(), scores: vec![] });
    };
    let vocab = reference.dims1()?;
    let pad_row = ScoreTensor::certain_rows_like(&reference.reshape((1, 1, vocab))?, 1, pad_token_id)?
        .reshape(vocab)?;

    let mut scores = Vec::with_capacity(steps);
    for t in 0..steps {
        let step: Vec<Tensor> = rows
            .iter()
            .map(|r| r.scores.get(t).cloned().unwrap_or_else(|| pad_row.clone()))
            .collect();
        scores.push(Tensor::stack(&step, 0)?);
    }
    let sequences = rows
        .into_iter()
        .map(|mut r| {
            r.tokens.resize(steps, pad_token_id);
            r.tokens
        })
        .collect();
    Ok(Generation { sequences, scores })
}


/// T5 conditional generation on candle.
///
/// Rows are decoded one at a time from their unpadded ids, so the encoder
/// never sees padding and no attention mask is needed.
///
/// A row that emits EOS before the longest row of its batch is continued with
/// pad tokens whose score rows put all mass on the pad id. Batched generation
/// in `transformers` keeps reporting the model's real scores for such rows, so
/// confidences at those positions differ: here they are exactly `1.0`.
pub struct T5Generator {
    model: t5::T5ForConditionalGeneration,
    config: t5::Config,
    raw_config: Value,
    device: Device,
    task_defaults: GenerateOptions,
    prefix: Option<String>,
    warned_beams: bool,
}

impl T5Generator {
    pub fn load(files: &ModelFiles, dtype: DType, device: &Device) -> Result<Self> {
        let raw_config: Value = serde_json::from_slice(&fs::read(&files.config)?)
            .map_err(|e| Error::Configuration(format!("invalid config.json: {e}")))?;
        let model_type = raw_config.get("model_type").and_then(Value::as_str).unwrap_or_default();
        if !matches!(model_type, "t5" | "mt5") {
            return Err(Error::Configuration(format!(
                "unsupported model type `{model_type}`, only t5 models can be loaded"
            )));
        }
        let config: t5::Config = serde_json::from_value(raw_config.clone())
            .map_err(|e| Error::Configuration(format!("invalid t5 config: {e}")))?;

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&files.weights, dtype, device)? };
        let model = t5::T5ForConditionalGeneration::load(vb, &config)?;
        debug!(?dtype, ?device, vocab_size = config.vocab_size, "loaded t5 model");

        Ok(Self {
            model,
            config,
            raw_config,
            device: device.clone(),
            task_defaults: GenerateOptions::default(),
            prefix: None,
            warned_beams: false,
        })
    }

    fn decode_row(
        &mut self,
        input_ids: &[u32],
        max_new_tokens: usize,
        settings: &DecodeSettings,
        processor: &mut LogitsProcessor,
    ) -> Result<DecodedRow> {
        self.model.clear_kv_cache();
        let input = Tensor::new(input_ids, &self.device)?.unsqueeze(0)?;
        let encoder_output = self.model.encode(&input)?;

        let start = self.config.decoder_start_token_id.unwrap_or(self.config.pad_token_id) as u32;
        let mut output = vec![start];
        let mut scores = Vec::with_capacity(max_new_tokens);
        for index in 0..max_new_tokens {
            let decoder_ids = if index == 0 || !self.config.use_cache {
                Tensor::new(output.as_slice(), &self.device)?.unsqueeze(0)?
            } else {
                let last = output[output.len() - 1];
                Tensor::new(&[last], &self.device)?.unsqueeze(0)?
            };
            let mut logits = self.model.decode(&decoder_ids, &encoder_output)?.squeeze(0)?;
            // min_length counts the decoder start token
            if output.len() < settings.min_length {
                logits = suppress_token(&logits, self.config.eos_token_id)?;
            }
            let token = processor.sample(&logits)?;
            scores.push(logits);
            output.push(token);
            if token as usize == self.config.eos_token_id {
                break;
            }
        }
        output.remove(0);
        Ok(DecodedRow { tokens: output, scores })
    }
}

impl Generate<Tensor> for T5Generator {
    fn generate(&mut self, batch: &EncodedBatch, request: &GenerationRequest<'_>) -> Result<Generation<Tensor>> {
        if request.num_return_sequences != 1 {
            return Err(Error::InvalidArgument(format!(
                "only one sequence per input is supported, got num_return_sequences = {}",
                request.num_return_sequences
            )));
        }
        let options = request.options.with_defaults(&self.task_defaults);
        let settings = DecodeSettings::from_options(&options)?;
        if settings.num_beams > 1 && !self.warned_beams {
            warn!(num_beams = settings.num_beams, "beam search is not supported, decoding one hypothesis per input");
            self.warned_beams = true;
        }

        let mut processor = LogitsProcessor::from_sampling(settings.seed, settings.sampling.clone());
        let mut rows = Vec::with_capacity(batch.rows());
        for i in 0..batch.rows() {
            let ids = batch.unpadded_row(i);
            rows.push(self.decode_row(&ids, request.max_new_tokens, &settings, &mut processor)?);
        }
        assemble(rows, self.config.pad_token_id as u32)
    }
}

impl TaskParams for T5Generator {
    fn apply_task_params(&mut self, task: &str) -> Result<()> {
        let (defaults, prefix) = task_params(&self.raw_config, task);
        if defaults.is_empty() && prefix.is_none() {
            debug!(task, "model defines no task specific parameters");
        }
        self.task_defaults = defaults;
        self.prefix = prefix;
        Ok(())
    }

    fn default_prefix(&self) -> Option<String> {
        self.prefix
            .clone()
            .or_else(|| self.raw_config.get("prefix").and_then(Value::as_str).map(str::to_string))
    }
}
