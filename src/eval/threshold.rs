//! Decision threshold search and the threshold-aware evaluator

use super::binary::BinaryConfusion;
use crate::config::{ThresholdCriterion, ThresholdSpec};
use crate::data::BatchLoader;
use crate::error::{Error, Result};
use crate::protocol::{Classifier, EvalOutcome, EvalRequest, Evaluator};

/// Threshold maximising `criterion` over the observed scores
///
/// Every distinct finite score is a candidate. The default threshold is the
/// initial incumbent and is only replaced by a strictly better candidate, so
/// ties resolve to the default and then to the lowest candidate. Scores are
/// sorted once and the confusion counts are swept upwards, `O(n log n)`.
pub fn search_threshold(
    scores: &[f32],
    targets: &[f32],
    criterion: ThresholdCriterion,
    default: f32,
    weighted: bool,
) -> f32 {
    let objective = |cm: &BinaryConfusion| {
        let (accuracy, f1) = cm.scores(weighted);
        match criterion {
            ThresholdCriterion::Accuracy => accuracy,
            ThresholdCriterion::F1 => f1,
        }
    };

    let mut best = (
        default,
        objective(&BinaryConfusion::from_scores(scores, targets, default)),
    );

    // NaN scores never reach any threshold
    let mut ranked: Vec<(f32, bool)> = scores
        .iter()
        .zip(targets)
        .filter(|(s, _)| !s.is_nan())
        .map(|(&s, &t)| (s, t >= 0.5))
        .collect();
    ranked.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

    let positives = targets.iter().filter(|&&t| t >= 0.5).count();
    let negatives = targets.len() - positives;
    let mut tp = ranked.iter().filter(|(_, attended)| *attended).count();
    let mut fp = ranked.len() - tp;

    let mut i = 0;
    while i < ranked.len() {
        let threshold = ranked[i].0;
        if threshold.is_finite() {
            let cm = BinaryConfusion {
                tp,
                fp,
                tn: negatives - fp,
                fn_: positives - tp,
            };
            let value = objective(&cm);
            if value > best.1 {
                best = (threshold, value);
            }
        }
        // the whole tie group falls below the next candidate
        while i < ranked.len() && ranked[i].0 == threshold {
            if ranked[i].1 {
                tp -= 1;
            } else {
                fp -= 1;
            }
            i += 1;
        }
    }
    best.0
}

/// Scores every batch, searching the threshold when none is given
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdEvaluator {
    criterion: ThresholdCriterion,
    default: f32,
}

impl ThresholdEvaluator {
    /// Create an evaluator with the given search policy
    pub fn new(criterion: ThresholdCriterion, default: f32) -> Self {
        Self { criterion, default }
    }

    /// Evaluator configured from the `learning.threshold` section
    pub fn from_spec(spec: &ThresholdSpec) -> Self {
        Self::new(spec.criterion, spec.default)
    }
}

impl Default for ThresholdEvaluator {
    fn default() -> Self {
        Self::from_spec(&ThresholdSpec::default())
    }
}

impl Evaluator for ThresholdEvaluator {
    fn evaluate(
        &self,
        model: &dyn Classifier,
        data: &BatchLoader<'_>,
        request: EvalRequest<'_>,
    ) -> Result<EvalOutcome> {
        let mut scores = Vec::with_capacity(data.len());
        let mut targets = Vec::with_capacity(data.len());
        let mut loss_sum = 0.0f64;

        for batch in data.batches(0) {
            let p = model.forward(batch.inputs.view());
            loss_sum += f64::from(request.loss.forward(p.view(), batch.labels.view()))
                * batch.len() as f64;
            scores.extend(p.iter().copied());
            targets.extend(batch.labels.iter().copied());
        }

        if scores.is_empty() {
            return Err(Error::Evaluation("no samples to evaluate".to_string()));
        }
        if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
            return Err(Error::Evaluation(format!(
                "{} produced a non-finite score ({bad})",
                model.name()
            )));
        }

        let threshold = request.threshold.unwrap_or_else(|| {
            search_threshold(&scores, &targets, self.criterion, self.default, request.weighted)
        });
        let (accuracy, f1) =
            BinaryConfusion::from_scores(&scores, &targets, threshold).scores(request.weighted);

        Ok(EvalOutcome {
            loss: (loss_sum / scores.len() as f64) as f32,
            accuracy: accuracy as f32,
            f1: f1 as f32,
            threshold,
        })
    }
}
