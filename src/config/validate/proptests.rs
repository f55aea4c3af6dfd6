//! Property-based tests for configuration validation

use super::error::ValidationError;
use super::validator::validate_config;
use crate::config::parse_config;
use crate::config::registry::Registry;
use crate::config::schema::*;
use proptest::prelude::*;

fn base() -> ExperimentSpec {
    parse_config(
        r"
setup: { name: p, output_path: ./out }
dataset:
  folder: /data
  pre_processed: sbj.json
  min_seed: 1
  max_seed: 1
  channels: 4
  sr: 128
  num_sbjs: 2
  start: 0
  end: 1000
model: { model_name: LinearProbe, tag: LP }
learning:
  optimizer: { opt: SGD, lr: 0.01 }
  loss_function: { name: BCELoss }
  running: { batch_size: 1, epochs: 1 }
  nFold: 3
",
    )
    .unwrap()
}

fn arb_valid_spec() -> impl Strategy<Value = ExperimentSpec> {
    (
        3usize..12,      // n_fold
        1usize..256,     // batch_size
        1e-6f32..1.0,    // lr
        1usize..100,     // epochs
        0u32..5,         // min_seed
        0u32..5,         // seed span
        1usize..40,      // num_sbjs
        0.0f32..400.0,   // start (ms)
        10.0f32..600.0,  // window (ms)
    )
        .prop_map(
            |(n_fold, batch_size, lr, epochs, min_seed, span, num_sbjs, start, window)| {
                let mut spec = base();
                spec.learning.n_fold = n_fold;
                spec.learning.running.batch_size = batch_size;
                spec.learning.optimizer.lr = lr;
                spec.learning.running.epochs = epochs;
                spec.dataset.min_seed = min_seed;
                spec.dataset.max_seed = min_seed + span;
                spec.dataset.num_sbjs = num_sbjs;
                spec.dataset.start = start;
                spec.dataset.end = start + window;
                spec
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_valid_spec_passes(spec in arb_valid_spec()) {
        prop_assert!(validate_config(&spec, &Registry::with_defaults()).is_ok());
    }

    #[test]
    fn prop_small_fold_count_rejected(n_fold in 0usize..3) {
        let mut spec = base();
        spec.learning.n_fold = n_fold;
        prop_assert_eq!(
            validate_config(&spec, &Registry::with_defaults()),
            Err(ValidationError::InvalidFoldCount(n_fold))
        );
    }

    #[test]
    fn prop_lr_above_one_rejected(lr in 1.0001f32..100.0) {
        let mut spec = base();
        spec.learning.optimizer.lr = lr;
        prop_assert!(matches!(
            validate_config(&spec, &Registry::with_defaults()),
            Err(ValidationError::InvalidLearningRate(_))
        ));
    }

    #[test]
    fn prop_inverted_seed_range_rejected(max in 0u32..100, gap in 1u32..10) {
        let mut spec = base();
        spec.dataset.min_seed = max + gap;
        spec.dataset.max_seed = max;
        prop_assert!(matches!(
            validate_config(&spec, &Registry::with_defaults()),
            Err(ValidationError::InvalidSeedRange { .. })
        ), "expected InvalidSeedRange");
    }
}
