//! Run command implementation

use crate::cli::logging::{init_logging, log, log_file_path};
use crate::cli::LogLevel;
use crate::config::{apply_overrides, load_config, ExperimentSpec, Registry, RunArgs};
use crate::eval::ThresholdEvaluator;
use crate::model::GradientFitter;
use crate::protocol::Evaluator;
use crate::run::run_all;

/// Load every configuration in order and apply the command-line overrides
pub fn load_specs(args: &RunArgs, registry: &Registry) -> Result<Vec<ExperimentSpec>, String> {
    args.configs
        .iter()
        .map(|path| {
            let mut spec = load_config(path, registry)
                .map_err(|e| format!("Config error in {}: {e}", path.display()))?;
            apply_overrides(&mut spec, args);
            Ok(spec)
        })
        .collect()
}

pub fn run_experiments(args: RunArgs, level: LogLevel) -> Result<(), String> {
    let registry = Registry::with_defaults();
    let specs = load_specs(&args, &registry)?;
    let first = specs
        .first()
        .ok_or_else(|| "No configuration given".to_string())?;

    let log_file = log_file_path(&first.setup.output_path, &args.jobname);
    init_logging(level, Some(&log_file))?;

    log(
        level,
        LogLevel::Normal,
        &format!(
            "Job {}: {} configuration(s), log at {}",
            args.jobname,
            specs.len(),
            log_file.display()
        ),
    );
    for spec in &specs {
        log(
            level,
            LogLevel::Verbose,
            &format!("  {} ({}) -> {}", spec.setup.name, spec.model.tag, spec.run_dir().display()),
        );
    }

    let fitter = GradientFitter::new();
    let comparison = run_all(&specs, &registry, &fitter, |spec| -> Box<dyn Evaluator> {
        Box::new(ThresholdEvaluator::from_spec(&spec.learning.threshold))
    })
    .map_err(|e| format!("Run failed: {e}"))?;

    log(level, LogLevel::Verbose, &comparison.to_markdown());
    log(
        level,
        LogLevel::Normal,
        &format!("Comparison written to {}", first.setup.output_path.display()),
    );
    Ok(())
}
