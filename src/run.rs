//! Run driver
//!
//! Executes the three protocols for each configuration in order, persists
//! their raw metric tables, and compares the configurations at the end.

use crate::config::{ExperimentSpec, Registry};
use crate::data::{fit_or_load, load_dataset, Composer, FoldSplitter};
use crate::error::Result;
use crate::protocol::{
    run_cross_subject, run_pooled, run_subject_specific, Evaluator, Fitter, Harness, Protocol,
};
use crate::report::{
    render_comparison, Comparison, ComparisonTable, MetricTable, ProtocolSummary,
};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Figure written for each compared protocol
const FIGURES: [(Protocol, &str, &str); 2] = [
    (
        Protocol::Pooled,
        "fig3_SI_performance.svg",
        "Subject-pooled classification performance",
    ),
    (
        Protocol::CrossSubject,
        "fig4_CS_performance.svg",
        "Leave-one-subject-out classification performance",
    ),
];

/// Raw tables of one configuration
#[derive(Debug, Clone)]
pub struct ExperimentResults {
    /// Model tag of the configuration
    pub tag: String,
    /// One table per protocol, in run order
    pub tables: Vec<MetricTable>,
}

impl ExperimentResults {
    /// Table of `protocol`, when it ran
    pub fn table(&self, protocol: Protocol) -> Option<&MetricTable> {
        self.tables.iter().find(|t| t.protocol == protocol)
    }
}

/// One configuration bound to its collaborators
pub struct Experiment<'a> {
    spec: &'a ExperimentSpec,
    registry: &'a Registry,
    fitter: &'a dyn Fitter,
    evaluator: &'a dyn Evaluator,
}

impl<'a> Experiment<'a> {
    /// Bind a configuration to a registry, fitter and evaluator
    pub fn new(
        spec: &'a ExperimentSpec,
        registry: &'a Registry,
        fitter: &'a dyn Fitter,
        evaluator: &'a dyn Evaluator,
    ) -> Self {
        Self {
            spec,
            registry,
            fitter,
            evaluator,
        }
    }

    /// Metric file of `protocol` inside the run directory
    pub fn metrics_path(&self, protocol: Protocol) -> PathBuf {
        self.spec.run_dir().join(format!(
            "{}_{}_metrics.json",
            self.spec.model.tag,
            protocol.code()
        ))
    }

    /// Load data, fit or load the scaler, split, and run every protocol
    pub fn run(&self) -> Result<ExperimentResults> {
        let spec = self.spec;
        let dataset = &spec.dataset;
        tracing::info!(name = %spec.setup.name, tag = %spec.model.tag, "starting configuration");

        let sources = load_dataset(dataset)?;
        let scaler = Arc::new(fit_or_load(&sources, &dataset.scaler)?);
        let plans = FoldSplitter::new(spec.learning.n_fold)
            .with_policy(dataset.split)
            .split_all(&sources)?;
        let composer = Composer::new(scaler, dataset.geometry());
        fs::create_dir_all(spec.run_dir())?;

        let harness = Harness {
            spec,
            sources: &sources,
            plans: &plans,
            composer: &composer,
            registry: self.registry,
            fitter: self.fitter,
            evaluator: self.evaluator,
        };

        let tables = vec![
            run_pooled(&harness)?,
            run_cross_subject(&harness)?,
            run_subject_specific(&harness)?,
        ];

        for table in &tables {
            let path = self.metrics_path(table.protocol);
            table.save(&path)?;
            tracing::debug!(path = %path.display(), "metric table saved");
        }

        Ok(ExperimentResults {
            tag: spec.model.tag.clone(),
            tables,
        })
    }
}

/// Reduce every configuration and stack the summaries per protocol
pub fn compare(results: &[ExperimentResults]) -> Result<Comparison> {
    let mut comparison = Comparison {
        generated_at: Some(Utc::now()),
        ..Comparison::default()
    };
    for protocol in Protocol::ALL {
        let mut summaries = Vec::new();
        for result in results {
            if let Some(table) = result.table(protocol) {
                summaries.push((result.tag.as_str(), ProtocolSummary::from_table(table)?));
            }
        }
        if summaries.is_empty() {
            continue;
        }

        for (tag, summary) in &summaries {
            tracing::info!(
                protocol = %protocol,
                tag,
                test_acc = ?summary.test_accuracy(),
                test_f1 = ?summary.test_f1_score(),
                breakdown_acc = ?summary.breakdown_accuracy(),
                "protocol summary"
            );
        }

        let refs: Vec<(&str, &ProtocolSummary)> =
            summaries.iter().map(|(tag, s)| (*tag, s)).collect();
        comparison
            .tables
            .push(ComparisonTable::from_summaries(protocol, &refs));
    }
    Ok(comparison)
}

/// Write the comparison report and figures into `output_dir`
pub fn write_report(comparison: &Comparison, output_dir: &Path) -> Result<()> {
    comparison.save(output_dir)?;
    for (protocol, file, title) in FIGURES {
        if let Some(table) = comparison.table(protocol) {
            let path = output_dir.join(file);
            render_comparison(table, title, &path)?;
            tracing::info!(path = %path.display(), "figure written");
        }
    }
    Ok(())
}

/// Run every configuration, then compare them under the first one's output path
pub fn run_all(
    specs: &[ExperimentSpec],
    registry: &Registry,
    fitter: &dyn Fitter,
    evaluator_for: impl Fn(&ExperimentSpec) -> Box<dyn Evaluator>,
) -> Result<Comparison> {
    let mut results = Vec::with_capacity(specs.len());
    for spec in specs {
        let evaluator = evaluator_for(spec);
        results.push(Experiment::new(spec, registry, fitter, evaluator.as_ref()).run()?);
    }

    let comparison = compare(&results)?;
    if let Some(first) = specs.first() {
        write_report(&comparison, &first.setup.output_path)?;
    }
    Ok(comparison)
}
