//! Accumulation of per-chunk tensors into dataset-level tensors, their
//! persistence, and run metadata.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backend::{Backend, ScoreTensor};
use crate::error::{Error, Result};
use crate::store::{save_tensor, CONFIDENCES_FILE, LABELS_FILE, PREDICTIONS_FILE};
use crate::tensor::constant::{BATCH_DIM, SEQ_DIM};
use crate::tensor::operations::concat_batches;


/// Append-only accumulation of per-chunk results, in chunk order.
#[derive(Debug)]
pub struct Aggregator<S>
where S: ScoreTensor
{
    confidences: Vec<S::Confidence>,
    predictions: Vec<S::Indices>,
    labels: Vec<S::Indices>,
}

impl<S> Default for Aggregator<S>
where S: ScoreTensor
{
    fn default() -> Self {
        Self { confidences: vec![], predictions: vec![], labels: vec![] }
    }
}

impl<S> Aggregator<S>
where S: ScoreTensor
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the confidences and predictions of the next source chunk.
    pub fn push_generation(&mut self, confidences: S::Confidence, predictions: S::Indices) {
        self.confidences.push(confidences);
        self.predictions.push(predictions);
    }

    /// Record the tokenized references of the next target chunk.
    pub fn push_labels(&mut self, labels: S::Indices) {
        self.labels.push(labels);
    }

    /// Concatenate everything recorded along the batch dimension.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidInput`] if nothing was recorded.
    /// * [`Error::InvariantViolation`] if the three tensors do not share
    ///   one `(N, L)` shape.
    pub fn finish(self) -> Result<DatasetTensors<S>> {
        if self.confidences.is_empty() || self.labels.is_empty() {
            return Err(Error::InvalidInput("no chunks were aggregated".to_string()));
        }
        let tensors = DatasetTensors {
            confidences: concat_batches(&self.confidences)?,
            predictions: concat_batches(&self.predictions)?,
            labels: concat_batches(&self.labels)?,
        };
        tensors.check_shapes()?;
        Ok(tensors)
    }
}


/// The three dataset-level tensors, row `i` of each belonging to input pair `i`.
#[derive(Debug, Clone)]
pub struct DatasetTensors<S>
where S: ScoreTensor
{
    pub confidences: S::Confidence,
    pub predictions: S::Indices,
    pub labels: S::Indices,
}

impl<S> DatasetTensors<S>
where S: ScoreTensor
{
    /// Number of rows shared by all three tensors.
    pub fn rows(&self) -> usize {
        self.confidences.shape()[BATCH_DIM]
    }

    fn check_shapes(&self) -> Result<()> {
        let conf = self.confidences.shape();
        let pred = self.predictions.shape();
        let labels = self.labels.shape();
        if conf.len() != 2 || conf != pred || conf != labels {
            return Err(Error::InvariantViolation(format!(
                "dataset tensors disagree: confidences {conf:?}, predictions {pred:?}, labels {labels:?}"
            )));
        }
        Ok(())
    }

    /// Write the three tensors into `dir`, creating it and its parents first.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        save_tensor(&dir.join(CONFIDENCES_FILE), "confidences", &self.confidences.to_host()?)?;
        save_tensor(&dir.join(PREDICTIONS_FILE), "predictions", &self.predictions.to_host()?)?;
        save_tensor(&dir.join(LABELS_FILE), "labels", &self.labels.to_host()?)?;
        info!(
            dir = %dir.display(),
            rows = self.rows(),
            cols = self.confidences.shape()[SEQ_DIM],
            "saved confidences, predictions and labels"
        );
        Ok(())
    }
}


/// Timing summary of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Number of examples processed.
    pub n_obs: usize,
    /// Whole seconds of wall-clock time.
    pub runtime: u64,
    /// `runtime / n_obs`, rounded to four decimal places.
    pub seconds_per_sample: f64,
}

impl RunMetadata {
    /// # Errors
    ///
    /// [`Error::InvalidInput`] when `n_obs` is `0`.
    pub fn new(n_obs: usize, elapsed: Duration) -> Result<Self> {
        if n_obs == 0 {
            return Err(Error::InvalidInput(
                "cannot compute seconds per sample for zero examples".to_string()
            ));
        }
        let runtime = elapsed.as_secs();
        let seconds_per_sample = (runtime as f64 / n_obs as f64 * 10_000.0).round() / 10_000.0;
        Ok(Self { n_obs, runtime, seconds_per_sample })
    }
}
