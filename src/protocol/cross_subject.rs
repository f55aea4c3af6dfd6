//! Leave-one-subject-out

use super::iteration::{run_iteration, Harness};
use super::{breakdown_sources, model_file, Protocol};
use crate::data::{ProtocolContext, SubjectFilter};
use crate::error::Result;
use crate::report::MetricTable;

/// Hold out each subject of `from_sbj..to_sbj` in turn
///
/// The held-out subject is the whole test collection; the remaining subjects
/// train on fold 0's train role and validate on everything else. Only
/// subjects below `num_sbjs` take part.
pub fn run_cross_subject(harness: &Harness<'_>) -> Result<MetricTable> {
    let spec = harness.spec;
    let dataset = &spec.dataset;
    if !dataset.leave_one_out {
        tracing::warn!("dataset.leave_one_out is false; leave-one-subject-out runs regardless");
    }

    let subjects = dataset.from_sbj..dataset.to_sbj();
    let device = spec.learning.running.primary_device();
    let mut table = MetricTable::new(
        Protocol::CrossSubject,
        &[subjects.len()],
        breakdown_sources(harness),
    );

    for (slot, subject) in subjects.enumerate() {
        tracing::info!(subject, "training with subject held out");
        let ctx = ProtocolContext::from_dataset(dataset, 0, SubjectFilter::HoldOut(subject));
        let file = model_file(spec, &format!("CS_{subject}"));
        let metrics = run_iteration(harness, &ctx, &file, device)?;
        table.record(&[slot], &metrics)?;
    }

    tracing::info!(
        valid_acc = ?table.valid_acc,
        test_acc = ?table.test_acc,
        valid_f1 = ?table.valid_f1,
        test_f1 = ?table.test_f1,
        thresholds = ?table.threshold,
        "leave-one-subject-out protocol finished"
    );
    Ok(table)
}
