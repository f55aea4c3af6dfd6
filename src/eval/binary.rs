//! Binary classification metrics at a decision threshold

/// Confusion counts of a thresholded binary decision
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BinaryConfusion {
    /// Attended predicted attended
    pub tp: usize,
    /// Unattended predicted attended
    pub fp: usize,
    /// Unattended predicted unattended
    pub tn: usize,
    /// Attended predicted unattended
    pub fn_: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}

fn harmonic(p: f64, r: f64) -> f64 {
    if p + r > 0.0 {
        2.0 * p * r / (p + r)
    } else {
        0.0
    }
}

impl BinaryConfusion {
    /// Count decisions `score >= threshold` against targets `>= 0.5`
    pub fn from_scores(scores: &[f32], targets: &[f32], threshold: f32) -> Self {
        assert_eq!(
            scores.len(),
            targets.len(),
            "Scores and targets must have same length"
        );
        let mut cm = Self::default();
        for (&s, &t) in scores.iter().zip(targets) {
            match (s >= threshold, t >= 0.5) {
                (true, true) => cm.tp += 1,
                (true, false) => cm.fp += 1,
                (false, false) => cm.tn += 1,
                (false, true) => cm.fn_ += 1,
            }
        }
        cm
    }

    /// Number of decisions
    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    /// Class support `[unattended, attended]`
    pub fn support(&self) -> [usize; 2] {
        [self.tn + self.fp, self.tp + self.fn_]
    }

    /// Fraction of correct decisions
    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// Attended-class recall
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// Unattended-class recall
    pub fn specificity(&self) -> f64 {
        ratio(self.tn, self.tn + self.fp)
    }

    /// Attended-class F1
    pub fn f1(&self) -> f64 {
        harmonic(ratio(self.tp, self.tp + self.fp), self.recall())
    }

    /// Unattended-class F1
    pub fn f1_negative(&self) -> f64 {
        harmonic(ratio(self.tn, self.tn + self.fn_), self.specificity())
    }

    /// Mean of the per-class recalls over the classes present
    pub fn balanced_accuracy(&self) -> f64 {
        let [neg, pos] = self.support();
        match (neg > 0, pos > 0) {
            (true, true) => (self.recall() + self.specificity()) / 2.0,
            (false, true) => self.recall(),
            (true, false) => self.specificity(),
            (false, false) => 0.0,
        }
    }

    /// Per-class F1 averaged by support
    pub fn f1_weighted(&self) -> f64 {
        let [neg, pos] = self.support();
        let total = neg + pos;
        if total == 0 {
            return 0.0;
        }
        (self.f1_negative() * neg as f64 + self.f1() * pos as f64) / total as f64
    }

    /// `(accuracy, f1)`, class-balanced when `weighted`
    pub fn scores(&self, weighted: bool) -> (f64, f64) {
        if weighted {
            (self.balanced_accuracy(), self.f1_weighted())
        } else {
            (self.accuracy(), self.f1())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn cm() -> BinaryConfusion {
        // 6 attended (5 hit), 2 unattended (1 hit)
        let scores = [0.9, 0.8, 0.7, 0.6, 0.55, 0.2, 0.6, 0.1];
        let targets = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0];
        BinaryConfusion::from_scores(&scores, &targets, 0.5)
    }

    #[test]
    fn test_counts() {
        assert_eq!(
            cm(),
            BinaryConfusion {
                tp: 5,
                fp: 1,
                tn: 1,
                fn_: 1
            }
        );
        assert_eq!(cm().support(), [2, 6]);
    }

    #[test]
    fn test_unweighted_scores() {
        let (acc, f1) = cm().scores(false);
        assert_abs_diff_eq!(acc, 0.75);
        assert_abs_diff_eq!(f1, 5.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_weighted_scores() {
        let (acc, f1) = cm().scores(true);
        assert_abs_diff_eq!(acc, (5.0 / 6.0 + 0.5) / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(f1, (0.5 * 2.0 + 5.0 / 6.0 * 6.0) / 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let cm = BinaryConfusion::from_scores(&[0.5], &[1.0], 0.5);
        assert_eq!(cm.tp, 1);
    }

    #[test]
    fn test_single_class_balanced_accuracy() {
        let cm = BinaryConfusion::from_scores(&[0.9, 0.1], &[1.0, 1.0], 0.5);
        assert_abs_diff_eq!(cm.balanced_accuracy(), 0.5);
    }

    #[test]
    fn test_empty_is_zero() {
        let cm = BinaryConfusion::default();
        assert_eq!(cm.scores(false), (0.0, 0.0));
        assert_eq!(cm.scores(true), (0.0, 0.0));
    }

    #[test]
    fn test_soft_targets_split_at_half() {
        let cm = BinaryConfusion::from_scores(&[0.9, 0.9], &[0.7, 0.3], 0.5);
        assert_eq!((cm.tp, cm.fp), (1, 1));
    }
}
