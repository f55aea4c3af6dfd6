//! Declarative experiment configuration
//!
//! One YAML document per model configuration, validated against the
//! collaborator registry before any recording is read.

pub mod cli;
pub mod loader;
pub mod registry;
pub mod schema;
pub mod validate;

pub use cli::{apply_overrides, parse_args, Cli, Command, RunArgs, ValidateArgs};
pub use loader::{expand_env, load_config, parse_config};
pub use registry::{LossBuilder, OptimizerBuilder, Registry};
pub use schema::{
    BreakdownSpec, DataSource, DatasetSpec, ExperimentSpec, LearningSpec, LossSpec, ModelSpec,
    OptimizerSpec, Parallelization, RunningSpec, ScalerKind, ScalerSpec, SetupSpec,
    ThresholdCriterion, ThresholdSpec, WindowGeometry,
};
pub use validate::{validate_config, ValidationError};
