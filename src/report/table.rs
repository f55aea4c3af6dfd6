//! Raw per-iteration metric storage

use crate::error::{Error, Result};
use crate::protocol::{IterationMetrics, Protocol};
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Breakdown weighting modes (`[unweighted, weighted]`)
pub const WEIGHTING_MODES: usize = 2;

/// Metric arrays of one protocol run
///
/// Primary arrays have the protocol's iteration shape: `[folds]` for pooled,
/// `[subjects]` for leave-one-subject-out and `[subjects, folds]` for
/// subject-specific runs. Breakdown arrays prepend `[2, sources]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTable {
    /// Protocol that filled the table
    pub protocol: Protocol,
    /// Validation accuracy
    pub valid_acc: ArrayD<f32>,
    /// Validation F1
    pub valid_f1: ArrayD<f32>,
    /// Test accuracy
    pub test_acc: ArrayD<f32>,
    /// Test F1
    pub test_f1: ArrayD<f32>,
    /// Validation-selected decision threshold
    pub threshold: ArrayD<f32>,
    /// Per-source accuracy `[weighting, source, ...]`
    pub breakdown_acc: ArrayD<f32>,
    /// Per-source F1 `[weighting, source, ...]`
    pub breakdown_f1: ArrayD<f32>,
}

impl MetricTable {
    /// Zero-filled table; `breakdown_sources` is 0 for single-source runs
    pub fn new(protocol: Protocol, shape: &[usize], breakdown_sources: usize) -> Self {
        let primary = || ArrayD::zeros(IxDyn(shape));
        let mut outer = vec![WEIGHTING_MODES, breakdown_sources];
        outer.extend_from_slice(shape);
        Self {
            protocol,
            valid_acc: primary(),
            valid_f1: primary(),
            test_acc: primary(),
            test_f1: primary(),
            threshold: primary(),
            breakdown_acc: ArrayD::zeros(IxDyn(&outer)),
            breakdown_f1: ArrayD::zeros(IxDyn(&outer)),
        }
    }

    /// Iteration shape
    pub fn shape(&self) -> &[usize] {
        self.test_acc.shape()
    }

    /// Number of breakdown sources
    pub fn breakdown_sources(&self) -> usize {
        self.breakdown_acc.shape()[1]
    }

    /// Store one iteration's metrics at `index`
    pub fn record(&mut self, index: &[usize], metrics: &IterationMetrics) -> Result<()> {
        let shape = self.shape();
        if index.len() != shape.len() || index.iter().zip(shape).any(|(i, n)| i >= n) {
            return Err(Error::InvalidSelection(format!(
                "{} slot {index:?} outside table shape {shape:?}",
                self.protocol
            )));
        }
        if metrics.breakdown.len() != self.breakdown_sources() {
            return Err(Error::InvalidSelection(format!(
                "{} iteration reported {} breakdown sources, table holds {}",
                self.protocol,
                metrics.breakdown.len(),
                self.breakdown_sources()
            )));
        }

        self.valid_acc[index] = metrics.validation.accuracy;
        self.valid_f1[index] = metrics.validation.f1;
        self.test_acc[index] = metrics.test.accuracy;
        self.test_f1[index] = metrics.test.f1;
        self.threshold[index] = metrics.validation.threshold;

        for (source, modes) in metrics.breakdown.iter().enumerate() {
            for (mode, outcome) in modes.iter().enumerate() {
                let mut at = vec![mode, source];
                at.extend_from_slice(index);
                self.breakdown_acc[at.as_slice()] = outcome.accuracy;
                self.breakdown_f1[at.as_slice()] = outcome.f1;
            }
        }
        Ok(())
    }

    /// Write the table as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("metric table: {e}")))?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read a table written by [`MetricTable::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| Error::Serialization(format!("metric table {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::EvalOutcome;
    use tempfile::TempDir;

    fn outcome(accuracy: f32, f1: f32, threshold: f32) -> EvalOutcome {
        EvalOutcome {
            loss: 0.5,
            accuracy,
            f1,
            threshold,
        }
    }

    fn metrics(acc: f32, sources: usize) -> IterationMetrics {
        IterationMetrics {
            validation: outcome(acc - 0.1, 0.4, 0.3),
            test: outcome(acc, 0.6, 0.3),
            breakdown: (0..sources)
                .map(|s| [outcome(s as f32, 0.1, 0.3), outcome(s as f32 + 0.5, 0.2, 0.3)])
                .collect(),
            fit: None,
        }
    }

    #[test]
    fn test_new_shapes() {
        let table = MetricTable::new(Protocol::SubjectSpecific, &[4, 3], 2);
        assert_eq!(table.shape(), &[4, 3]);
        assert_eq!(table.breakdown_acc.shape(), &[2, 2, 4, 3]);
        assert_eq!(table.breakdown_sources(), 2);
    }

    #[test]
    fn test_record_fills_slot() {
        let mut table = MetricTable::new(Protocol::Pooled, &[3], 2);
        table.record(&[1], &metrics(0.8, 2)).unwrap();

        assert_eq!(table.test_acc[[1].as_slice()], 0.8);
        assert_eq!(table.test_f1[[1].as_slice()], 0.6);
        assert_eq!(table.threshold[[1].as_slice()], 0.3);
        assert_eq!(table.test_acc[[0].as_slice()], 0.0);
        assert_eq!(table.breakdown_acc[[0, 1, 1].as_slice()], 1.0);
        assert_eq!(table.breakdown_acc[[1, 1, 1].as_slice()], 1.5);
        assert_eq!(table.breakdown_f1[[1, 0, 1].as_slice()], 0.2);
    }

    #[test]
    fn test_record_rejects_bad_slot_and_source_count() {
        let mut table = MetricTable::new(Protocol::SubjectSpecific, &[2, 3], 0);
        assert!(table.record(&[2, 0], &metrics(0.5, 0)).is_err());
        assert!(table.record(&[0], &metrics(0.5, 0)).is_err());
        assert!(table.record(&[0, 0], &metrics(0.5, 1)).is_err());
        assert!(table.record(&[1, 2], &metrics(0.5, 0)).is_ok());
    }

    #[test]
    fn test_save_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("LP_SI_metrics.json");
        let mut table = MetricTable::new(Protocol::Pooled, &[3], 1);
        table.record(&[2], &metrics(0.75, 1)).unwrap();
        table.save(&path).unwrap();

        let loaded = MetricTable::load(&path).unwrap();
        assert_eq!(loaded, table);
    }
}
