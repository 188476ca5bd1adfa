//! Run configuration and pass-through generation options.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tensor::constant::{DEFAULT_MAX_NEW_TOKENS, DEFAULT_TARGET_LENGTH};

/// Settings for one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Directory the three tensor files are written to; created if missing.
    pub save_dir: PathBuf,
    /// Examples per chunk.
    pub batch_size: usize,
    /// Generated positions every chunk is aligned to.
    pub max_new_tokens: usize,
    /// Tokens every reference is truncated or padded to.
    pub target_length: usize,
    /// Task whose model-specific parameters are applied before generation.
    pub task: String,
    /// Overrides the model's default task prefix when set.
    pub prefix: Option<String>,
    /// Forwarded verbatim to the generation collaborator.
    pub generate_options: GenerateOptions,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("."),
            batch_size: 8,
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            target_length: DEFAULT_TARGET_LENGTH,
            task: "summarization".to_string(),
            prefix: None,
            generate_options: GenerateOptions::default(),
        }
    }
}

impl ExtractConfig {
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self { save_dir: save_dir.into(), ..Self::default() }
    }

    /// Reject settings no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidArgument("batch size must be greater than 0".to_string()));
        }
        if self.max_new_tokens == 0 {
            return Err(Error::InvalidArgument("max_new_tokens must be greater than 0".to_string()));
        }
        if self.target_length == 0 {
            return Err(Error::InvalidArgument("target length must be greater than 0".to_string()));
        }
        Ok(())
    }
}


/// A single generation option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl OptionValue {
    /// Parse a command-line value: `true`/`false` (any case), then integer,
    /// then float, falling back to the raw string.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "true" => return OptionValue::Bool(true),
            "false" => return OptionValue::Bool(false),
            _ => {}
        }
        if let Ok(i) = raw.parse::<i64>() {
            return OptionValue::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return OptionValue::Float(f);
        }
        OptionValue::Str(raw.to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OptionValue::Int(i) => Some(*i as f64),
            OptionValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            OptionValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Int(i) => write!(f, "{i}"),
            OptionValue::Float(x) => write!(f, "{x}"),
            OptionValue::Str(s) => write!(f, "{s}"),
        }
    }
}


/// Named generation options, forwarded untouched to the generation collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerateOptions(BTreeMap<String, OptionValue>);

impl GenerateOptions {
    /// Parse `--key value` and `--key=value` arguments.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for a token not starting with `--`, an empty
    /// key, or a key with no value.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let mut options = BTreeMap::new();
        let mut iter = args.iter().map(AsRef::as_ref);
        while let Some(arg) = iter.next() {
            let Some(flag) = arg.strip_prefix("--") else {
                return Err(Error::InvalidArgument(format!("expected `--key value`, got `{arg}`")));
            };
            let (key, raw) = match flag.split_once('=') {
                Some((key, raw)) => (key, raw),
                None => match iter.next() {
                    Some(raw) => (flag, raw),
                    None => return Err(Error::InvalidArgument(format!("missing value for `--{flag}`"))),
                },
            };
            if key.is_empty() {
                return Err(Error::InvalidArgument(format!("empty option name in `{arg}`")));
            }
            options.insert(key.to_string(), OptionValue::parse(raw));
        }
        Ok(Self(options))
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: OptionValue) -> Option<OptionValue> {
        self.0.insert(key.into(), value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.0.iter()
    }

    /// Options in `self` override those in `defaults`.
    pub fn with_defaults(&self, defaults: &GenerateOptions) -> GenerateOptions {
        let mut merged = defaults.0.clone();
        merged.extend(self.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        GenerateOptions(merged)
    }
}
