use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use tracing::info;

/// Local paths of everything a model run needs.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub weights: Vec<PathBuf>,
    pub tokenizer: PathBuf,
    pub tokenizer_config: Option<PathBuf>,
}

impl ModelFiles {
    /// Resolve `model_name` as a local directory when one exists, otherwise
    /// download it from the hub at `revision`.
    pub fn fetch(model_name: &str, revision: &str) -> Result<Self> {
        let dir = Path::new(model_name);
        if dir.is_dir() {
            return Self::from_dir(dir);
        }

        info!(model = model_name, revision, "fetching model from the hub");
        let api = Api::new()?;
        let repo = api.repo(Repo::with_revision(model_name.to_string(), RepoType::Model, revision.to_string()));
        Ok(Self {
            config: repo.get("config.json").context("fetching config.json")?,
            weights: vec![repo.get("model.safetensors").context("fetching model.safetensors")?],
            tokenizer: repo.get("tokenizer.json").context("fetching tokenizer.json")?,
            tokenizer_config: repo.get("tokenizer_config.json").ok(),
        })
    }

    pub fn from_dir(dir: &Path) -> Result<Self> {
        let required = |name: &str| -> Result<PathBuf> {
            let path = dir.join(name);
            if !path.is_file() {
                bail!("{} is missing {name}", dir.display());
            }
            Ok(path)
        };
        let tokenizer_config = dir.join("tokenizer_config.json");
        Ok(Self {
            config: required("config.json")?,
            weights: vec![required("model.safetensors")?],
            tokenizer: required("tokenizer.json")?,
            tokenizer_config: tokenizer_config.is_file().then_some(tokenizer_config),
        })
    }
}
