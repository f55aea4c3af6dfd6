//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! atencion run -j aec_run -c eegnet.yaml linear.yaml
//! atencion run -j aec_run -c eegnet.yaml --evaluate-only -v
//! atencion validate -c eegnet.yaml --detailed
//! ```

mod core;

pub use core::{apply_overrides, parse_args, Cli, Command, RunArgs, ValidateArgs};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use std::path::PathBuf;

    #[test]
    fn test_parse_run_command() {
        let cli = parse_args(["atencion", "run", "-j", "job1", "-c", "a.yaml", "b.yaml"]).unwrap();
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.jobname, "job1");
                assert_eq!(
                    args.configs,
                    vec![PathBuf::from("a.yaml"), PathBuf::from("b.yaml")]
                );
                assert!(!args.evaluate_only);
            }
            Command::Validate(_) => panic!("Expected Run command"),
        }
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_long_forms_and_global_flags() {
        let cli = parse_args([
            "atencion",
            "run",
            "--jobname",
            "j",
            "--configs",
            "a.yaml",
            "--output-dir",
            "./elsewhere",
            "--verbose",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.output_dir, Some(PathBuf::from("./elsewhere")));
            }
            Command::Validate(_) => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_requires_jobname_and_configs() {
        assert!(parse_args(["atencion", "run", "-c", "a.yaml"]).is_err());
        assert!(parse_args(["atencion", "run", "-j", "job"]).is_err());
    }

    #[test]
    fn test_parse_validate_command() {
        let cli = parse_args(["atencion", "-q", "validate", "-c", "a.yaml", "--detailed"]).unwrap();
        assert!(cli.quiet);
        match cli.command {
            Command::Validate(args) => {
                assert_eq!(args.configs.len(), 1);
                assert!(args.detailed);
            }
            Command::Run(_) => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_apply_overrides() {
        let mut spec = parse_config(
            r"
setup: { name: n, output_path: ./out }
dataset:
  folder: /d
  pre_processed: s.json
  min_seed: 1
  max_seed: 1
  channels: 1
  sr: 100
  num_sbjs: 1
  start: 0
  end: 100
model: { model_name: LinearProbe, tag: LP }
learning:
  optimizer: { opt: SGD, lr: 0.1 }
  loss_function: { name: BCELoss }
  running: { batch_size: 1, epochs: 1 }
  nFold: 3
",
        )
        .unwrap();
        let cli = parse_args([
            "atencion",
            "run",
            "-j",
            "j",
            "-c",
            "a.yaml",
            "-o",
            "/tmp/x",
            "--evaluate-only",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("Expected Run command");
        };
        apply_overrides(&mut spec, &args);
        assert_eq!(spec.setup.output_path, PathBuf::from("/tmp/x"));
        assert!(!spec.setup.train_model);
    }
}
