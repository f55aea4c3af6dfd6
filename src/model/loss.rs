//! Loss functions on predicted probabilities

use ndarray::{Array1, ArrayView1};

/// Probability clamp keeping the log finite
const EPS: f32 = 1e-7;

/// Trait for loss functions
pub trait LossFn: Send + Sync {
    /// Mean loss over the batch
    fn forward(&self, predictions: ArrayView1<'_, f32>, targets: ArrayView1<'_, f32>) -> f32;

    /// Gradient of the mean loss with respect to each prediction
    fn gradient(&self, predictions: ArrayView1<'_, f32>, targets: ArrayView1<'_, f32>)
        -> Array1<f32>;

    /// Name of the loss function
    fn name(&self) -> &str;
}

/// Binary cross-entropy on probabilities
///
/// ```text
/// L = -mean(t * ln(p) + (1 - t) * ln(1 - p))
/// ```
///
/// Soft targets in `[0, 1]` are accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct BCELoss;

impl LossFn for BCELoss {
    fn forward(&self, predictions: ArrayView1<'_, f32>, targets: ArrayView1<'_, f32>) -> f32 {
        assert_eq!(
            predictions.len(),
            targets.len(),
            "Predictions and targets must have same length"
        );
        if predictions.is_empty() {
            return 0.0;
        }
        let total: f32 = predictions
            .iter()
            .zip(targets.iter())
            .map(|(&p, &t)| {
                let p = p.clamp(EPS, 1.0 - EPS);
                -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
            })
            .sum();
        total / predictions.len() as f32
    }

    fn gradient(
        &self,
        predictions: ArrayView1<'_, f32>,
        targets: ArrayView1<'_, f32>,
    ) -> Array1<f32> {
        let n = predictions.len().max(1) as f32;
        ndarray::Zip::from(predictions)
            .and(targets)
            .map_collect(|&p, &t| {
                let p = p.clamp(EPS, 1.0 - EPS);
                (p - t) / (p * (1.0 - p) * n)
            })
    }

    fn name(&self) -> &str {
        "BCELoss"
    }
}

/// Mean squared error
///
/// L = mean((predictions - targets)^2)
#[derive(Debug, Clone, Copy, Default)]
pub struct MSELoss;

impl LossFn for MSELoss {
    fn forward(&self, predictions: ArrayView1<'_, f32>, targets: ArrayView1<'_, f32>) -> f32 {
        assert_eq!(
            predictions.len(),
            targets.len(),
            "Predictions and targets must have same length"
        );
        let diff = &predictions - &targets;
        (&diff * &diff).mean().unwrap_or(0.0)
    }

    fn gradient(
        &self,
        predictions: ArrayView1<'_, f32>,
        targets: ArrayView1<'_, f32>,
    ) -> Array1<f32> {
        let n = predictions.len().max(1) as f32;
        (&predictions - &targets) * (2.0 / n)
    }

    fn name(&self) -> &str {
        "MSELoss"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    #[test]
    fn test_bce_perfect_prediction_near_zero() {
        let p = arr1(&[1.0, 0.0]);
        let t = arr1(&[1.0, 0.0]);
        assert!(BCELoss.forward(p.view(), t.view()) < 1e-5);
    }

    #[test]
    fn test_bce_half_is_ln2() {
        let p = arr1(&[0.5, 0.5]);
        let t = arr1(&[1.0, 0.0]);
        assert_abs_diff_eq!(
            BCELoss.forward(p.view(), t.view()),
            std::f32::consts::LN_2,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_bce_gradient_matches_finite_difference() {
        let p = arr1(&[0.3, 0.8]);
        let t = arr1(&[1.0, 0.0]);
        let grad = BCELoss.gradient(p.view(), t.view());
        let h = 1e-3;
        let mut shifted = p.clone();
        shifted[0] += h;
        let numeric = (BCELoss.forward(shifted.view(), t.view()) - BCELoss.forward(p.view(), t.view())) / h;
        assert_abs_diff_eq!(grad[0], numeric, epsilon = 1e-2);
    }

    #[test]
    fn test_mse() {
        let p = arr1(&[1.0, 2.0, 3.0]);
        let t = arr1(&[1.5, 2.5, 3.5]);
        assert_abs_diff_eq!(MSELoss.forward(p.view(), t.view()), 0.25, epsilon = 1e-6);
        let grad = MSELoss.gradient(p.view(), t.view());
        assert_abs_diff_eq!(grad[0], -1.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_names() {
        assert_eq!(BCELoss.name(), "BCELoss");
        assert_eq!(MSELoss.name(), "MSELoss");
    }
}
