//! End-to-end runs over synthetic recordings on disk

mod common;

use atencion::config::{parse_config, ExperimentSpec, Registry};
use atencion::eval::ThresholdEvaluator;
use atencion::model::GradientFitter;
use atencion::protocol::{Evaluator, Protocol};
use atencion::report::{MetricTable, ProtocolSummary};
use atencion::run::{run_all, Experiment};
use common::{config_yaml, recording, write_recording};
use std::path::Path;
use tempfile::TempDir;

fn setup_data(dir: &Path) {
    write_recording(dir, &recording("a", 3, 12, 0.0));
    write_recording(dir, &recording("b", 3, 12, 0.5));
}

fn spec(data: &Path, output: &Path, sources: &[&str], tag: &str) -> ExperimentSpec {
    parse_config(&config_yaml(data, output, sources, tag, 3)).unwrap()
}

fn run_one(spec: &ExperimentSpec) -> Vec<MetricTable> {
    let registry = Registry::with_defaults();
    let fitter = GradientFitter::new();
    let evaluator = ThresholdEvaluator::from_spec(&spec.learning.threshold);
    Experiment::new(spec, &registry, &fitter, &evaluator)
        .run()
        .unwrap()
        .tables
}

fn evaluator_for(spec: &ExperimentSpec) -> Box<dyn Evaluator> {
    Box::new(ThresholdEvaluator::from_spec(&spec.learning.threshold))
}

#[test]
fn test_run_all_writes_tables_report_and_figures() {
    let data = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    setup_data(data.path());

    let specs = vec![
        spec(data.path(), out.path(), &["a.json"], "A"),
        spec(data.path(), out.path(), &["a.json", "b.json"], "B"),
    ];
    let comparison = run_all(
        &specs,
        &Registry::with_defaults(),
        &GradientFitter::new(),
        evaluator_for,
    )
    .unwrap();

    for tag in ["A", "B"] {
        for code in ["SI", "CS", "SS"] {
            let path = out
                .path()
                .join(format!("{tag}_run"))
                .join(format!("{tag}_{code}_metrics.json"));
            assert!(path.exists(), "missing {}", path.display());
        }
    }
    for file in [
        "comparison.md",
        "comparison.json",
        "fig3_SI_performance.svg",
        "fig4_CS_performance.svg",
    ] {
        assert!(out.path().join(file).exists(), "missing {file}");
    }

    let pooled = comparison.table(Protocol::Pooled).unwrap();
    let tags: Vec<&str> = pooled.rows.iter().map(|r| r.tag.as_str()).collect();
    assert_eq!(tags, vec!["A", "B"]);
    // A has no per-source breakdown, so only the mixed column is shared
    assert_eq!(pooled.columns, vec!["Mixed"]);
    assert!(comparison.generated_at.is_some());

    let md = std::fs::read_to_string(out.path().join("comparison.md")).unwrap();
    assert!(md.contains("| A |"));
    assert!(md.contains("| B |"));
}

#[test]
fn test_mixed_configuration_breakdown_columns() {
    let data = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    setup_data(data.path());

    let mixed = spec(data.path(), out.path(), &["a.json", "b.json"], "M");
    let tables = run_one(&mixed);
    let pooled = tables.iter().find(|t| t.protocol == Protocol::Pooled).unwrap();
    assert_eq!(pooled.shape(), &[3]);
    assert_eq!(pooled.breakdown_acc.shape(), &[2, 2, 3]);

    let saved = MetricTable::load(&out.path().join("M_run").join("M_SI_metrics.json")).unwrap();
    assert_eq!(&saved, pooled);
}

#[test]
fn test_subject_specific_aggregates_per_subject() {
    let data = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    setup_data(data.path());

    let tables = run_one(&spec(data.path(), out.path(), &["a.json"], "S"));
    let ss = tables
        .iter()
        .find(|t| t.protocol == Protocol::SubjectSpecific)
        .unwrap();
    assert_eq!(ss.shape(), &[3, 3]);

    let summary = ProtocolSummary::from_table(ss).unwrap();
    assert_eq!(summary.iterations(), 3);
    let stat = summary.test_accuracy().unwrap();
    assert!((0.0..=1.0).contains(&stat.mean));

    let cs = tables
        .iter()
        .find(|t| t.protocol == Protocol::CrossSubject)
        .unwrap();
    assert_eq!(cs.shape(), &[3]);
}

#[test]
fn test_evaluate_only_reuses_trained_models() {
    let data = TempDir::new().unwrap();
    let trained_out = TempDir::new().unwrap();
    let eval_out = TempDir::new().unwrap();
    setup_data(data.path());

    let trained = spec(data.path(), trained_out.path(), &["a.json"], "E");
    let first = run_one(&trained);

    let mut reuse = spec(data.path(), eval_out.path(), &["a.json"], "E");
    reuse.setup.train_model = false;
    reuse.model.pretrained = Some(trained.run_dir());
    let second = run_one(&reuse);

    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.protocol, b.protocol);
        assert_eq!(a.test_acc, b.test_acc);
        assert_eq!(a.threshold, b.threshold);
    }
    assert!(trained_out.path().join("E_run").join("E_SI_fold_0.json").exists());
    assert!(!eval_out.path().join("E_run").join("E_SI_fold_0.json").exists());
}

#[test]
fn test_recording_rate_must_match_config() {
    let data = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let mut slow = recording("slow", 3, 12, 0.0);
    slow.sample_rate = 250.0;
    write_recording(data.path(), &slow);

    let mismatched = spec(data.path(), out.path(), &["slow.json"], "R");
    let registry = Registry::with_defaults();
    let fitter = GradientFitter::new();
    let evaluator = ThresholdEvaluator::default();
    let err = Experiment::new(&mismatched, &registry, &fitter, &evaluator)
        .run()
        .unwrap_err();
    assert!(err.to_string().contains("250"));
}

#[test]
fn test_missing_recording_fails_before_training() {
    let data = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    let missing = spec(data.path(), out.path(), &["absent.json"], "X");
    let registry = Registry::with_defaults();
    let fitter = GradientFitter::new();
    let evaluator = ThresholdEvaluator::default();
    let err = Experiment::new(&missing, &registry, &fitter, &evaluator)
        .run()
        .unwrap_err();
    assert!(err.to_string().contains("absent.json"));
    assert!(!out.path().join("X_run").exists());
}
