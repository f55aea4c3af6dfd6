//! One protocol iteration: compose, fit, evaluate

use super::collaborator::{EvalOutcome, EvalRequest, Evaluator, FitReport, FitRequest, Fitter};
use crate::config::{ExperimentSpec, Registry};
use crate::data::{BatchLoader, Composer, ProtocolContext, SplitPlans, Sources};
use crate::error::Result;
use crate::model::StepDecayLR;
use serde::{Deserialize, Serialize};

/// Read-only state shared by every iteration of a run
///
/// Everything here is either immutable or behind `Arc`, so one harness can be
/// handed to several fold workers at once.
#[derive(Clone, Copy)]
pub struct Harness<'a> {
    /// Configuration being run
    pub spec: &'a ExperimentSpec,
    /// Loaded recordings
    pub sources: &'a Sources,
    /// One split plan per source
    pub plans: &'a SplitPlans,
    /// Composer holding the run scaler
    pub composer: &'a Composer,
    /// Name to constructor lookup
    pub registry: &'a Registry,
    /// Training loop
    pub fitter: &'a dyn Fitter,
    /// Evaluation routine
    pub evaluator: &'a dyn Evaluator,
}

/// Metrics recorded by one iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationMetrics {
    /// Validation pass (threshold searched)
    pub validation: EvalOutcome,
    /// Test pass at the validation threshold
    pub test: EvalOutcome,
    /// Per-source `[unweighted, weighted]` passes; empty for a single source
    pub breakdown: Vec<[EvalOutcome; 2]>,
    /// Training summary when the model was fitted
    pub fit: Option<FitReport>,
}

/// Run one iteration under `ctx`, writing the model to `<run dir>/<model_file>`
pub fn run_iteration(
    harness: &Harness<'_>,
    ctx: &ProtocolContext,
    model_file: &str,
    device: &str,
) -> Result<IterationMetrics> {
    let spec = harness.spec;
    let learning = &spec.learning;
    let running = &learning.running;
    let registry = harness.registry;

    let composed = harness
        .composer
        .compose(harness.sources, harness.plans, ctx)?;
    let train = BatchLoader::new(&composed.train, running.batch_size).with_shuffle(running.seed);
    let validation = BatchLoader::new(&composed.validation, running.batch_size);
    let test = BatchLoader::new(&composed.test, running.batch_size);

    let mut model = registry.build_model(&spec.model, &harness.composer.geometry())?;
    if let Some(dir) = &spec.model.pretrained {
        model.set_pretrained(dir.join(model_file));
    }
    model.initialize(running.seed)?;

    let loss = registry.build_loss(&learning.loss_function.name)?;

    let fit = if spec.setup.train_model {
        let erp_loss = match &learning.loss_function.erp_loss {
            Some(name) if spec.model.erp_forcing => Some(registry.build_loss(name)?),
            _ => None,
        };
        let optimizer = registry.build_optimizer(&learning.optimizer)?;
        let scheduler = StepDecayLR::new(
            learning.optimizer.lr,
            learning.optimizer.lr_decay_step,
            learning.optimizer.lr_decay_gamma,
        );
        let model_path = spec.run_dir().join(model_file);
        let report = harness.fitter.fit(
            model.as_mut(),
            FitRequest {
                train: &train,
                validation: &validation,
                loss: loss.as_ref(),
                erp_loss: erp_loss.as_deref(),
                erp_weight: spec.model.param_f64("erp_weight", 1.0) as f32,
                optimizer,
                scheduler,
                epochs: running.epochs,
                print_every: running.print_every,
                device,
                model_path: &model_path,
            },
        )?;
        Some(report)
    } else {
        None
    };

    let request = EvalRequest {
        threshold: None,
        weighted: false,
        device,
        loss: loss.as_ref(),
    };
    let validation_outcome = harness
        .evaluator
        .evaluate(model.as_ref(), &validation, request)?;
    let fixed = EvalRequest {
        threshold: Some(validation_outcome.threshold),
        ..request
    };
    let test_outcome = harness.evaluator.evaluate(model.as_ref(), &test, fixed)?;

    let mut breakdown = Vec::new();
    if harness.sources.is_mixed() {
        let sets = harness.composer.compose_breakdown(
            harness.sources,
            harness.plans,
            &ctx.breakdown(&spec.dataset.breakdown),
        )?;
        for set in &sets {
            let loader = BatchLoader::new(set, running.batch_size);
            let unweighted = harness.evaluator.evaluate(model.as_ref(), &loader, fixed)?;
            let weighted = harness.evaluator.evaluate(
                model.as_ref(),
                &loader,
                EvalRequest {
                    weighted: true,
                    ..fixed
                },
            )?;
            breakdown.push([unweighted, weighted]);
        }
    }

    tracing::info!(
        iteration = %ctx,
        device,
        valid_loss = validation_outcome.loss,
        threshold = validation_outcome.threshold,
        test_acc = test_outcome.accuracy,
        test_f1 = test_outcome.f1,
        sources = breakdown.len(),
        "iteration finished"
    );

    Ok(IterationMetrics {
        validation: validation_outcome,
        test: test_outcome,
        breakdown,
        fit,
    })
}
