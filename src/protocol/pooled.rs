//! Subject-independent pooled k-fold

use super::iteration::{run_iteration, Harness, IterationMetrics};
use super::pool::FoldPool;
use super::{breakdown_sources, model_file, Protocol};
use crate::config::Parallelization;
use crate::data::{ProtocolContext, SubjectFilter};
use crate::error::Result;
use crate::report::MetricTable;

/// Run every fold over all subjects
///
/// With `multi-fold` parallelization the folds are fanned out over a
/// [`FoldPool`]; otherwise they run in order on the primary device.
pub fn run_pooled(harness: &Harness<'_>) -> Result<MetricTable> {
    let spec = harness.spec;
    let running = &spec.learning.running;
    let n_fold = spec.learning.n_fold;

    let task = |fold: usize, device: &str| -> Result<IterationMetrics> {
        tracing::info!(fold, device, "training pooled fold");
        let ctx = ProtocolContext::from_dataset(&spec.dataset, fold, SubjectFilter::All);
        let file = model_file(spec, &format!("SI_fold_{fold}"));
        run_iteration(harness, &ctx, &file, device)
    };

    let results = match running.parallelization {
        Parallelization::MultiFold => FoldPool::new(&running.device)?.run(n_fold, task)?,
        Parallelization::None => (0..n_fold)
            .map(|fold| task(fold, running.primary_device()))
            .collect::<Result<Vec<_>>>()?,
    };

    let mut table = MetricTable::new(Protocol::Pooled, &[n_fold], breakdown_sources(harness));
    for (fold, metrics) in results.iter().enumerate() {
        table.record(&[fold], metrics)?;
    }

    tracing::info!(
        valid_acc = ?table.valid_acc,
        test_acc = ?table.test_acc,
        valid_f1 = ?table.valid_f1,
        test_f1 = ?table.test_f1,
        thresholds = ?table.threshold,
        "pooled protocol finished"
    );
    Ok(table)
}
