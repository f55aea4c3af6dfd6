//! Configuration validation logic
//!
//! Validates experiment configurations for correctness before any data is loaded.

use super::error::ValidationError;
use crate::config::registry::Registry;
use crate::config::schema::{ExperimentSpec, Parallelization};
use crate::data::{UpsamplingPolicy, MIN_FOLDS};

/// Validate an experiment configuration
///
/// Checks:
/// - Numeric values are in valid ranges
/// - Subject, seed and window ranges are non-empty
/// - Collaborator names are registered
pub fn validate_config(spec: &ExperimentSpec, registry: &Registry) -> Result<(), ValidationError> {
    let dataset = &spec.dataset;
    let learning = &spec.learning;

    if learning.n_fold < MIN_FOLDS {
        return Err(ValidationError::InvalidFoldCount(learning.n_fold));
    }

    if learning.running.batch_size == 0 {
        return Err(ValidationError::InvalidBatchSize(learning.running.batch_size));
    }

    if spec.setup.train_model && learning.running.epochs == 0 {
        return Err(ValidationError::InvalidEpochs(learning.running.epochs));
    }

    let optimizer = &learning.optimizer;
    if !(optimizer.lr > 0.0 && optimizer.lr <= 1.0) {
        return Err(ValidationError::InvalidLearningRate(optimizer.lr));
    }
    if !(optimizer.lr_decay_gamma > 0.0) {
        return Err(ValidationError::InvalidDecayGamma(optimizer.lr_decay_gamma));
    }
    if !(optimizer.weight_decay >= 0.0) {
        return Err(ValidationError::InvalidWeightDecay(optimizer.weight_decay));
    }

    if dataset.min_seed > dataset.max_seed {
        return Err(ValidationError::InvalidSeedRange {
            min: dataset.min_seed,
            max: dataset.max_seed,
        });
    }

    let to = dataset.to_sbj();
    if dataset.num_sbjs == 0 || dataset.from_sbj >= to || to > dataset.num_sbjs {
        return Err(ValidationError::InvalidSubjectRange {
            from: dataset.from_sbj,
            to,
            num_sbjs: dataset.num_sbjs,
        });
    }

    if !(dataset.sr > 0.0 && dataset.sr.is_finite()) {
        return Err(ValidationError::InvalidSampleRate(dataset.sr));
    }
    if dataset.channels == 0 {
        return Err(ValidationError::InvalidChannels(dataset.channels));
    }

    let geometry = dataset.geometry();
    if dataset.start < 0.0 || dataset.end <= dataset.start || geometry.len == 0 {
        return Err(ValidationError::InvalidWindow {
            start: dataset.start,
            end: dataset.end,
        });
    }
    if let Some(declared) = dataset.window_len {
        if declared != geometry.len {
            return Err(ValidationError::WindowLengthMismatch {
                declared,
                derived: geometry.len,
            });
        }
    }

    if dataset.pre_processed.paths().is_empty() {
        return Err(ValidationError::NoSources);
    }

    let scaler = &dataset.scaler;
    if scaler.feature_range.0 >= scaler.feature_range.1 {
        return Err(ValidationError::InvalidFeatureRange(
            scaler.feature_range.0,
            scaler.feature_range.1,
        ));
    }
    if !scaler.unit_factor.is_finite() || scaler.unit_factor == 0.0 {
        return Err(ValidationError::InvalidUnitFactor(scaler.unit_factor));
    }
    if scaler.kind.is_some() && scaler.path.is_none() {
        return Err(ValidationError::MissingScalerPath);
    }

    if let UpsamplingPolicy::Jitter { std, .. } = dataset.upsampling_policy {
        if !(std >= 0.0 && std.is_finite()) {
            return Err(ValidationError::InvalidJitter(std));
        }
    }

    let threshold = learning.threshold.default;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ValidationError::InvalidThreshold(threshold));
    }

    if learning.running.parallelization == Parallelization::MultiFold
        && learning.running.device.is_empty()
    {
        return Err(ValidationError::NoDevices);
    }

    if spec.model.tag.trim().is_empty() {
        return Err(ValidationError::EmptyTag);
    }

    if !registry.has_model(&spec.model.model_name) {
        return Err(ValidationError::UnknownModel {
            name: spec.model.model_name.clone(),
            known: registry.model_names(),
        });
    }
    if !registry.has_optimizer(&optimizer.opt) {
        return Err(ValidationError::UnknownOptimizer {
            name: optimizer.opt.clone(),
            known: registry.optimizer_names(),
        });
    }
    let losses = std::iter::once(&learning.loss_function.name)
        .chain(learning.loss_function.erp_loss.as_ref());
    for loss in losses {
        if !registry.has_loss(loss) {
            return Err(ValidationError::UnknownLoss {
                name: loss.clone(),
                known: registry.loss_names(),
            });
        }
    }

    Ok(())
}
