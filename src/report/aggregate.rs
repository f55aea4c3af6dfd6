//! Protocol summaries and the cross-configuration comparison

use super::table::MetricTable;
use crate::error::{Error, Result};
use crate::protocol::Protocol;
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2, Array3, ArrayD, ArrayView1, Axis, Ix1, Ix3};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Decimal places kept in the comparison table
pub const COMPARISON_DECIMALS: i32 = 3;

/// Source columns shown next to the mixed column in figures and tables
pub const MAX_SOURCE_COLUMNS: usize = 3;

/// Round to [`COMPARISON_DECIMALS`] places
pub fn round_metric(value: f32) -> f32 {
    let scale = 10f64.powi(COMPARISON_DECIMALS);
    ((f64::from(value) * scale).round() / scale) as f32
}

/// Mean and population standard deviation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    /// Arithmetic mean
    pub mean: f32,
    /// Standard deviation (ddof = 0)
    pub std: f32,
}

impl Stat {
    /// Statistic of a non-empty vector
    pub fn of(values: ArrayView1<'_, f32>) -> Option<Self> {
        let mean = values.mean()?;
        Some(Self {
            mean,
            std: values.std(0.0),
        })
    }
}

/// Reduced metrics of one protocol
///
/// Every vector holds one value per outer iteration: folds for the pooled
/// protocol, held-out subjects for leave-one-subject-out, and per-subject fold
/// means for the subject-specific protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolSummary {
    /// Protocol summarised
    pub protocol: Protocol,
    /// Validation accuracy per iteration
    pub valid_acc: Array1<f32>,
    /// Validation F1 per iteration
    pub valid_f1: Array1<f32>,
    /// Test accuracy per iteration
    pub test_acc: Array1<f32>,
    /// Test F1 per iteration
    pub test_f1: Array1<f32>,
    /// Decision threshold per iteration
    pub threshold: Array1<f32>,
    /// Per-source accuracy `[weighting, source, iteration]`
    pub breakdown_acc: Array3<f32>,
    /// Per-source F1 `[weighting, source, iteration]`
    pub breakdown_f1: Array3<f32>,
}

impl ProtocolSummary {
    /// Reduce a filled table
    ///
    /// Subject-specific tables are first averaged over their trailing fold
    /// axis, leaving one value per subject.
    pub fn from_table(table: &MetricTable) -> Result<Self> {
        let reduce = |array: &ArrayD<f32>| fold_mean(table.protocol, array);
        Ok(Self {
            protocol: table.protocol,
            valid_acc: vector(reduce(&table.valid_acc)?)?,
            valid_f1: vector(reduce(&table.valid_f1)?)?,
            test_acc: vector(reduce(&table.test_acc)?)?,
            test_f1: vector(reduce(&table.test_f1)?)?,
            threshold: vector(reduce(&table.threshold)?)?,
            breakdown_acc: cube(reduce(&table.breakdown_acc)?)?,
            breakdown_f1: cube(reduce(&table.breakdown_f1)?)?,
        })
    }

    /// Number of outer iterations
    pub fn iterations(&self) -> usize {
        self.test_acc.len()
    }

    /// Number of breakdown sources
    pub fn sources(&self) -> usize {
        self.breakdown_acc.len_of(Axis(1))
    }

    /// Test accuracy over iterations
    pub fn test_accuracy(&self) -> Option<Stat> {
        Stat::of(self.test_acc.view())
    }

    /// Test F1 over iterations
    pub fn test_f1_score(&self) -> Option<Stat> {
        Stat::of(self.test_f1.view())
    }

    /// Mean breakdown accuracy `[weighting, source]`
    pub fn breakdown_accuracy(&self) -> Option<Array2<f32>> {
        self.breakdown_acc.mean_axis(Axis(2))
    }

    /// Mean breakdown F1 `[weighting, source]`
    pub fn breakdown_f1_score(&self) -> Option<Array2<f32>> {
        self.breakdown_f1.mean_axis(Axis(2))
    }
}

fn fold_mean(protocol: Protocol, array: &ArrayD<f32>) -> Result<ArrayD<f32>> {
    if protocol != Protocol::SubjectSpecific {
        return Ok(array.clone());
    }
    let last = Axis(array.ndim().saturating_sub(1));
    array
        .mean_axis(last)
        .ok_or_else(|| Error::InvalidSelection(format!("{protocol} table has no folds")))
}

fn vector(array: ArrayD<f32>) -> Result<Array1<f32>> {
    array
        .into_dimensionality::<Ix1>()
        .map_err(|e| Error::InvalidSelection(format!("metric vector: {e}")))
}

fn cube(array: ArrayD<f32>) -> Result<Array3<f32>> {
    array
        .into_dimensionality::<Ix3>()
        .map_err(|e| Error::InvalidSelection(format!("breakdown array: {e}")))
}

/// One configuration row of a [`ComparisonTable`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    /// Model tag
    pub tag: String,
    /// Rounded per-iteration accuracy, one vector per column
    pub values: Vec<Vec<f32>>,
    /// Rounded statistic per column
    pub stats: Vec<Stat>,
}

/// Accuracy of every configuration under one protocol
///
/// Columns are the mixed test accuracy followed by the unweighted breakdown
/// accuracy of the first sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    /// Protocol compared
    pub protocol: Protocol,
    /// Column labels
    pub columns: Vec<String>,
    /// One row per configuration, in input order
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    /// Stack tagged summaries of the same protocol
    ///
    /// Source columns are limited to [`MAX_SOURCE_COLUMNS`] and to the number
    /// of sources every summary has.
    pub fn from_summaries(protocol: Protocol, summaries: &[(&str, &ProtocolSummary)]) -> Self {
        let sources = summaries
            .iter()
            .map(|(_, s)| s.sources())
            .min()
            .unwrap_or(0)
            .min(MAX_SOURCE_COLUMNS);

        let mut columns = vec!["Mixed".to_string()];
        columns.extend((1..=sources).map(|i| format!("Prdm. {i}")));

        let rows = summaries
            .iter()
            .map(|(tag, summary)| {
                let mut raw = vec![summary.test_acc.to_vec()];
                for source in 0..sources {
                    raw.push(
                        summary
                            .breakdown_acc
                            .index_axis(Axis(0), 0)
                            .index_axis(Axis(0), source)
                            .to_vec(),
                    );
                }
                let values: Vec<Vec<f32>> = raw
                    .into_iter()
                    .map(|column| column.into_iter().map(round_metric).collect())
                    .collect();
                let stats = values
                    .iter()
                    .map(|column| {
                        let stat = Stat::of(ArrayView1::from(column.as_slice())).unwrap_or(Stat {
                            mean: f32::NAN,
                            std: f32::NAN,
                        });
                        Stat {
                            mean: round_metric(stat.mean),
                            std: round_metric(stat.std),
                        }
                    })
                    .collect();
                ComparisonRow {
                    tag: (*tag).to_string(),
                    values,
                    stats,
                }
            })
            .collect();

        Self {
            protocol,
            columns,
            rows,
        }
    }

    /// Whether no configuration was compared
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as a Markdown table of `mean ± std`
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let _ = writeln!(md, "### {} accuracy\n", self.protocol.title());

        md.push_str("| Model |");
        for column in &self.columns {
            let _ = write!(md, " {column} |");
        }
        md.push('\n');
        md.push_str("|-------|");
        for _ in &self.columns {
            md.push_str("------:|");
        }
        md.push('\n');

        for row in &self.rows {
            let _ = write!(md, "| {} |", row.tag);
            for stat in &row.stats {
                let _ = write!(md, " {:.3} ± {:.3} |", stat.mean, stat.std);
            }
            md.push('\n');
        }
        md
    }
}

/// Per-protocol comparison tables of a whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// One table per protocol that produced results
    pub tables: Vec<ComparisonTable>,
    /// When the comparison was assembled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl Comparison {
    /// Table of `protocol`, when present
    pub fn table(&self, protocol: Protocol) -> Option<&ComparisonTable> {
        self.tables.iter().find(|t| t.protocol == protocol)
    }

    /// Markdown report with one section per protocol
    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# Model comparison\n\n");
        if let Some(at) = self.generated_at {
            let _ = writeln!(md, "_Generated {}_\n", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        for table in &self.tables {
            md.push_str(&table.to_markdown());
            md.push('\n');
        }
        md
    }

    /// Write `comparison.md` and `comparison.json` into `dir`
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        fs::write(dir.join("comparison.md"), self.to_markdown())?;
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("comparison: {e}")))?;
        fs::write(dir.join("comparison.json"), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use ndarray::{arr1, arr2, Array};

    fn ss_table() -> MetricTable {
        let mut table = MetricTable::new(Protocol::SubjectSpecific, &[2, 2], 0);
        table.test_acc = arr2(&[[0.8f32, 0.9], [0.7, 0.6]]).into_dyn();
        table
    }

    #[test]
    fn test_subject_specific_fold_mean_first() {
        let summary = ProtocolSummary::from_table(&ss_table()).unwrap();
        assert_eq!(summary.iterations(), 2);
        assert_relative_eq!(summary.test_acc[0], 0.85, epsilon = 1e-6);
        assert_relative_eq!(summary.test_acc[1], 0.65, epsilon = 1e-6);

        let stat = summary.test_accuracy().unwrap();
        assert_relative_eq!(stat.mean, 0.75, epsilon = 1e-6);
        assert_relative_eq!(stat.std, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_pooled_keeps_fold_vector() {
        let mut table = MetricTable::new(Protocol::Pooled, &[3], 2);
        table.test_acc = arr1(&[0.5f32, 0.6, 0.7]).into_dyn();
        table.breakdown_acc = Array::from_shape_fn((2, 2, 3), |(w, s, f)| {
            (w * 100 + s * 10 + f) as f32
        })
        .into_dyn();

        let summary = ProtocolSummary::from_table(&table).unwrap();
        assert_eq!(summary.test_acc, arr1(&[0.5f32, 0.6, 0.7]));
        assert_eq!(summary.sources(), 2);

        let means = summary.breakdown_accuracy().unwrap();
        assert_relative_eq!(means[[0, 1]], 11.0);
        assert_relative_eq!(means[[1, 0]], 101.0);
    }

    #[test]
    fn test_subject_specific_breakdown_reduced() {
        let mut table = MetricTable::new(Protocol::SubjectSpecific, &[2, 2], 1);
        table.breakdown_acc = Array::from_shape_vec(
            (2, 1, 2, 2),
            vec![0.8, 0.9, 0.7, 0.6, 0.0, 0.2, 0.4, 0.4],
        )
        .unwrap()
        .into_dyn();

        let summary = ProtocolSummary::from_table(&table).unwrap();
        assert_eq!(summary.breakdown_acc.shape(), &[2, 1, 2]);
        assert_relative_eq!(summary.breakdown_acc[[0, 0, 0]], 0.85, epsilon = 1e-6);
        assert_relative_eq!(summary.breakdown_acc[[1, 0, 1]], 0.4, epsilon = 1e-6);
    }

    #[test]
    fn test_round_metric() {
        assert_eq!(round_metric(0.12345), 0.123);
        assert_eq!(round_metric(0.9996), 1.0);
        assert_eq!(round_metric(0.0), 0.0);
    }

    #[test]
    fn test_comparison_columns_and_rounding() {
        let mut a = MetricTable::new(Protocol::Pooled, &[2], 4);
        a.test_acc = arr1(&[0.81234f32, 0.79]).into_dyn();
        let mut b = MetricTable::new(Protocol::Pooled, &[2], 4);
        b.test_acc = arr1(&[0.5f32, 0.7]).into_dyn();
        let a = ProtocolSummary::from_table(&a).unwrap();
        let b = ProtocolSummary::from_table(&b).unwrap();

        let table = ComparisonTable::from_summaries(Protocol::Pooled, &[("EEGNet", &a), ("LP", &b)]);
        assert_eq!(table.columns, vec!["Mixed", "Prdm. 1", "Prdm. 2", "Prdm. 3"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].tag, "EEGNet");
        assert_eq!(table.rows[0].values[0], vec![0.812, 0.79]);
        assert_relative_eq!(table.rows[1].stats[0].mean, 0.6, epsilon = 1e-6);
        assert_relative_eq!(table.rows[1].stats[0].std, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_single_source_has_only_mixed_column() {
        let summary = ProtocolSummary::from_table(&ss_table()).unwrap();
        let table = ComparisonTable::from_summaries(Protocol::SubjectSpecific, &[("LP", &summary)]);
        assert_eq!(table.columns, vec!["Mixed"]);

        let md = table.to_markdown();
        assert!(md.contains("| Model | Mixed |"));
        assert!(md.contains("| LP | 0.750 ± 0.100 |"));
    }

    #[test]
    fn test_comparison_save() {
        let dir = tempfile::TempDir::new().unwrap();
        let summary = ProtocolSummary::from_table(&ss_table()).unwrap();
        let comparison = Comparison {
            tables: vec![ComparisonTable::from_summaries(
                Protocol::SubjectSpecific,
                &[("LP", &summary)],
            )],
            generated_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).single(),
        };
        comparison.save(dir.path()).unwrap();

        let md = std::fs::read_to_string(dir.path().join("comparison.md")).unwrap();
        assert!(md.starts_with("# Model comparison"));
        assert!(md.contains("_Generated 2024-03-01 12:30:00 UTC_"));
        let json = std::fs::read_to_string(dir.path().join("comparison.json")).unwrap();
        let back: Comparison = serde_json::from_str(&json).unwrap();
        assert_eq!(back, comparison);
        assert!(back.table(Protocol::Pooled).is_none());
    }
}
