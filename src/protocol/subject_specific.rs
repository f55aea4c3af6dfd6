//! Subject-specific k-fold

use super::iteration::{run_iteration, Harness};
use super::{breakdown_sources, model_file, Protocol};
use crate::data::{ProtocolContext, SubjectFilter};
use crate::error::Result;
use crate::report::MetricTable;

/// Run every fold within each subject of `from_sbj..to_sbj`
pub fn run_subject_specific(harness: &Harness<'_>) -> Result<MetricTable> {
    let spec = harness.spec;
    let dataset = &spec.dataset;
    let n_fold = spec.learning.n_fold;
    let device = spec.learning.running.primary_device();
    let subjects = dataset.from_sbj..dataset.to_sbj();

    let mut table = MetricTable::new(
        Protocol::SubjectSpecific,
        &[subjects.len(), n_fold],
        breakdown_sources(harness),
    );

    for (slot, subject) in subjects.enumerate() {
        for fold in 0..n_fold {
            tracing::info!(subject, fold, "training subject-specific fold");
            let ctx = ProtocolContext::from_dataset(dataset, fold, SubjectFilter::Only(subject));
            let file = model_file(spec, &format!("SS_{subject}_fold_{fold}"));
            let metrics = run_iteration(harness, &ctx, &file, device)?;
            table.record(&[slot, fold], &metrics)?;
        }
        tracing::debug!(subject, test_acc = ?table.test_acc.index_axis(ndarray::Axis(0), slot), "subject finished");
    }

    tracing::info!(
        valid_acc = ?table.valid_acc,
        test_acc = ?table.test_acc,
        valid_f1 = ?table.valid_f1,
        test_f1 = ?table.test_f1,
        thresholds = ?table.threshold,
        "subject-specific protocol finished"
    );
    Ok(table)
}
