//! Validate command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_config, ExperimentSpec, Parallelization, Registry, ValidateArgs};

/// Format setup information as a string
pub fn format_setup_info(spec: &ExperimentSpec) -> String {
    format!(
        "  Name: {}\n  Output dir: {}\n  Train model: {}",
        spec.setup.name,
        spec.run_dir().display(),
        spec.setup.train_model
    )
}

/// Format dataset configuration as a string
pub fn format_dataset_info(spec: &ExperimentSpec) -> String {
    let dataset = &spec.dataset;
    let geometry = dataset.geometry();
    let mut lines = vec![format!("  Folder: {}", dataset.folder)];
    for path in dataset.pre_processed.paths() {
        lines.push(format!("  Source: {}", path.display()));
    }
    lines.push(format!(
        "  Subjects: {}..{} of {}",
        dataset.from_sbj,
        dataset.to_sbj(),
        dataset.num_sbjs
    ));
    lines.push(format!(
        "  Window: samples {}..{} ({} x {} channels)",
        geometry.start, geometry.end, geometry.len, geometry.channels
    ));
    if dataset.upsampling {
        lines.push(format!("  Upsampling: {:?}", dataset.upsampling_policy));
    }
    if let Some(kind) = dataset.scaler.kind {
        lines.push(format!("  Scaler: {kind:?}"));
    }
    lines.join("\n")
}

/// Format model configuration as a string
pub fn format_model_info(spec: &ExperimentSpec) -> String {
    let model = &spec.model;
    let mut lines = vec![format!("  Model: {} [{}]", model.model_name, model.tag)];
    if let Some(pretrained) = &model.pretrained {
        lines.push(format!("  Pretrained: {}", pretrained.display()));
    }
    if model.erp_forcing {
        lines.push("  ERP forcing: on".to_string());
    }
    lines.join("\n")
}

/// Format learning configuration as a string
pub fn format_learning_info(spec: &ExperimentSpec) -> String {
    let learning = &spec.learning;
    let running = &learning.running;
    let mut lines = vec![
        format!("  Optimizer: {}", learning.optimizer.opt),
        format!("  Learning rate: {}", learning.optimizer.lr),
        format!("  Loss: {}", learning.loss_function.name),
        format!("  Folds: {}", learning.n_fold),
        format!("  Epochs: {}", running.epochs),
        format!("  Batch size: {}", running.batch_size),
    ];
    if running.parallelization == Parallelization::MultiFold {
        lines.push(format!("  Devices: {}", running.device.join(", ")));
    }
    lines.join("\n")
}

/// Print detailed configuration summary
pub fn print_detailed_summary(spec: &ExperimentSpec) {
    println!();
    println!("Configuration Summary:");
    println!("{}", format_setup_info(spec));
    println!();
    println!("{}", format_dataset_info(spec));
    println!();
    println!("{}", format_model_info(spec));
    println!();
    println!("{}", format_learning_info(spec));
}

pub fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    let registry = Registry::with_defaults();
    for path in &args.configs {
        log(
            level,
            LogLevel::Normal,
            &format!("Validating config: {}", path.display()),
        );

        let spec = load_config(path, &registry).map_err(|e| format!("Config error: {e}"))?;

        log(level, LogLevel::Normal, "Configuration is valid");

        if args.detailed {
            print_detailed_summary(&spec);
        }
    }
    Ok(())
}
