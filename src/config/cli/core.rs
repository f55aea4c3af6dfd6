//! Core CLI types - Cli, Command, and argument structs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Atencion: auditory-attention ERP experiment harness
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "atencion")]
#[command(author = "PAIML")]
#[command(version)]
#[command(
    about = "Runs pooled, leave-one-subject-out and subject-specific validation of ERP classifiers"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run every protocol for each configuration and compare them
    Run(RunArgs),

    /// Validate configuration files without loading data
    Validate(ValidateArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct RunArgs {
    /// Job name (log file and run label)
    #[arg(short, long = "jobname", value_name = "JOB")]
    pub jobname: String,

    /// Experiment configuration files, compared in the given order
    #[arg(short, long = "configs", value_name = "CONFIG", num_args = 1.., required = true)]
    pub configs: Vec<PathBuf>,

    /// Override the output directory of every configuration
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Evaluate existing models instead of training
    #[arg(long)]
    pub evaluate_only: bool,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Experiment configuration files
    #[arg(short, long = "configs", value_name = "CONFIG", num_args = 1.., required = true)]
    pub configs: Vec<PathBuf>,

    /// Show detailed validation report
    #[arg(short, long)]
    pub detailed: bool,
}

/// Parse command line arguments
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides to an experiment configuration
pub fn apply_overrides(spec: &mut crate::config::ExperimentSpec, args: &RunArgs) {
    if let Some(output_dir) = &args.output_dir {
        spec.setup.output_path = output_dir.clone();
    }
    if args.evaluate_only {
        spec.setup.train_model = false;
    }
}
