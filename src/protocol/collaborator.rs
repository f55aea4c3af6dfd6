//! Collaborator seams
//!
//! The orchestrators never look inside a model, a training loop or an
//! evaluation routine. They drive these traits, and the registry decides which
//! implementation backs each configured name.

use crate::config::{ModelSpec, WindowGeometry};
use crate::data::BatchLoader;
use crate::error::Result;
use crate::model::{LossFn, Optimizer, StepDecayLR};
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Trainable binary classifier over flattened ERP windows
pub trait Classifier: Send {
    /// Architecture name
    fn name(&self) -> &str;

    /// Initialise weights; loads the pretrained file when one is set
    fn initialize(&mut self, seed: u64) -> Result<()>;

    /// Weights file loaded by [`Classifier::initialize`]
    fn set_pretrained(&mut self, path: PathBuf);

    /// Configured pretrained weights file
    fn pretrained(&self) -> Option<&Path>;

    /// Attended-class probability per row
    fn forward(&self, inputs: ArrayView2<'_, f32>) -> Array1<f32>;

    /// Parameter gradient given the loss gradient per output probability
    fn backward(&self, inputs: ArrayView2<'_, f32>, grad_output: ArrayView1<'_, f32>) -> Vec<f32>;

    /// Flat parameter vector
    fn parameters(&self) -> &[f32];

    /// Mutable flat parameter vector
    fn parameters_mut(&mut self) -> &mut [f32];

    /// Persist the weights
    fn save(&self, path: &Path) -> Result<()>;
}

/// Registry constructor of a classifier
pub type ModelBuilder = fn(&ModelSpec, &WindowGeometry) -> Result<Box<dyn Classifier>>;

/// Everything a fitter needs for one iteration
pub struct FitRequest<'a> {
    /// Shuffled training batches
    pub train: &'a BatchLoader<'a>,
    /// Validation batches (model selection)
    pub validation: &'a BatchLoader<'a>,
    /// Classification loss
    pub loss: &'a dyn LossFn,
    /// Auxiliary ERP loss, when forcing is enabled
    pub erp_loss: Option<&'a dyn LossFn>,
    /// Weight of the auxiliary loss
    pub erp_weight: f32,
    /// Parameter update rule
    pub optimizer: Box<dyn Optimizer>,
    /// Learning rate schedule
    pub scheduler: StepDecayLR,
    /// Training epochs
    pub epochs: usize,
    /// Log every N epochs
    pub print_every: usize,
    /// Device identifier
    pub device: &'a str,
    /// Where the trained weights are written
    pub model_path: &'a Path,
}

/// Summary of one fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    /// Epochs run
    pub epochs: usize,
    /// Mean training loss of the last epoch
    pub final_train_loss: f32,
    /// Lowest validation loss seen
    pub best_validation_loss: f32,
    /// Epoch of the lowest validation loss
    pub best_epoch: usize,
}

/// Training loop collaborator
pub trait Fitter: Send + Sync {
    /// Train `model` in place and persist it to `request.model_path`
    fn fit(&self, model: &mut dyn Classifier, request: FitRequest<'_>) -> Result<FitReport>;
}

/// Parameters of one evaluation pass
#[derive(Clone, Copy)]
pub struct EvalRequest<'a> {
    /// Fixed decision threshold; `None` searches one
    pub threshold: Option<f32>,
    /// Class-balanced metrics
    pub weighted: bool,
    /// Device identifier
    pub device: &'a str,
    /// Loss reported alongside the metrics
    pub loss: &'a dyn LossFn,
}

/// Result of one evaluation pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalOutcome {
    /// Mean loss
    pub loss: f32,
    /// Accuracy (balanced when weighted)
    pub accuracy: f32,
    /// F1 (support-weighted when weighted)
    pub f1: f32,
    /// Threshold the metrics were computed at
    pub threshold: f32,
}

/// Evaluation collaborator
pub trait Evaluator: Send + Sync {
    /// Score `model` on every batch of `data`
    fn evaluate(
        &self,
        model: &dyn Classifier,
        data: &BatchLoader<'_>,
        request: EvalRequest<'_>,
    ) -> Result<EvalOutcome>;
}
