//! Atencion CLI
//!
//! Entry point for the auditory-attention experiment harness.
//!
//! # Usage
//!
//! ```bash
//! # Run every protocol for two configurations and compare them
//! atencion run -j job1 -c configs/eegnet.yaml configs/lda.yaml
//!
//! # Re-evaluate saved models into another directory
//! atencion run -j job1 -c configs/eegnet.yaml --evaluate-only -o /tmp/eval
//!
//! # Validate configs
//! atencion validate -c configs/eegnet.yaml --detailed
//! ```

use atencion::cli::{run_command, Cli};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
