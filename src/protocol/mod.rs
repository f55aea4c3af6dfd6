//! Validation protocols
//!
//! Three orchestrators share one iteration shape ([`run_iteration`]) and
//! differ only in the index set they walk:
//!
//! - [`run_pooled`]: folds over every subject (`SI`)
//! - [`run_cross_subject`]: one held-out subject per iteration (`CS`)
//! - [`run_subject_specific`]: folds within each subject (`SS`)
//!
//! Each fills a [`MetricTable`](crate::report::MetricTable) slot per iteration.

pub mod collaborator;
mod cross_subject;
mod iteration;
mod pool;
mod pooled;
mod subject_specific;


pub use collaborator::{
    Classifier, EvalOutcome, EvalRequest, Evaluator, FitReport, FitRequest, Fitter, ModelBuilder,
};
pub use cross_subject::run_cross_subject;
pub use iteration::{run_iteration, Harness, IterationMetrics};
pub use pool::FoldPool;
pub use pooled::run_pooled;
pub use subject_specific::run_subject_specific;

use crate::config::ExperimentSpec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validation protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// Subject-independent pooled k-fold
    #[serde(rename = "SI")]
    Pooled,
    /// Leave-one-subject-out
    #[serde(rename = "CS")]
    CrossSubject,
    /// Per-subject k-fold
    #[serde(rename = "SS")]
    SubjectSpecific,
}

impl Protocol {
    /// All protocols in run order
    pub const ALL: [Protocol; 3] = [Self::Pooled, Self::CrossSubject, Self::SubjectSpecific];

    /// Short code used in file names
    pub fn code(self) -> &'static str {
        match self {
            Self::Pooled => "SI",
            Self::CrossSubject => "CS",
            Self::SubjectSpecific => "SS",
        }
    }

    /// Human readable title
    pub fn title(self) -> &'static str {
        match self {
            Self::Pooled => "Subject-pooled",
            Self::CrossSubject => "Leave-one-subject-out",
            Self::SubjectSpecific => "Individual",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Breakdown columns recorded for `harness`: one per source when mixed
fn breakdown_sources(harness: &Harness<'_>) -> usize {
    if harness.sources.is_mixed() {
        harness.sources.len()
    } else {
        0
    }
}

/// Model file of one iteration: `<tag>_<suffix>.json`
///
/// Keyed by tag so configurations sharing a run directory and a model name
/// keep separate weights.
pub fn model_file(spec: &ExperimentSpec, suffix: &str) -> String {
    format!("{}_{suffix}.json", spec.model.tag)
}
