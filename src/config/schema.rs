//! YAML schema definitions for experiment configuration
//!
//! One document describes one model configuration run through all three
//! protocols. Key names follow the existing experiment files (`trainModel`,
//! `nFold`, `pre_processed`, ...) so those documents load unchanged.

use crate::data::{SplitPolicy, UpsamplingPolicy};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Deserialize a bool from either a YAML boolean (`true`) or a quoted string (`"true"`).
fn deserialize_bool_lenient<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::Str(s) => match s.to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected 'true' or 'false', got '{other}'"
            ))),
        },
    }
}

/// Deserialize a device list from either a single string or a sequence.
fn deserialize_devices<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(device) => vec![device],
        OneOrMany::Many(devices) => devices,
    })
}

/// Deserialize a threshold spec from either a bare number or a mapping.
fn deserialize_threshold<'de, D>(deserializer: D) -> Result<ThresholdSpec, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrSpec {
        Number(f32),
        Spec(ThresholdSpec),
    }

    Ok(match NumberOrSpec::deserialize(deserializer)? {
        NumberOrSpec::Number(default) => ThresholdSpec {
            default,
            ..ThresholdSpec::default()
        },
        NumberOrSpec::Spec(spec) => spec,
    })
}

/// Complete experiment specification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentSpec {
    /// Run identity and output location
    pub setup: SetupSpec,

    /// Recordings, windowing and composition policy
    pub dataset: DatasetSpec,

    /// Model architecture and hyperparameters
    pub model: ModelSpec,

    /// Optimisation, evaluation and fold settings
    pub learning: LearningSpec,
}

impl ExperimentSpec {
    /// Directory receiving this configuration's model and metric files
    pub fn run_dir(&self) -> PathBuf {
        self.setup.output_path.join(&self.setup.name)
    }
}

/// Run identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetupSpec {
    /// Experiment name, used as the output sub-directory
    pub name: String,

    /// Root output directory
    pub output_path: PathBuf,

    /// Train models (`true`) or only evaluate initialized/pretrained ones
    #[serde(
        rename = "trainModel",
        alias = "train_model",
        default = "default_true",
        deserialize_with = "deserialize_bool_lenient"
    )]
    pub train_model: bool,
}

/// Either one recording or an ordered list of recordings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataSource {
    /// A single recording file
    Single(PathBuf),
    /// Several recordings merged into one mixed stream
    Mixed(Vec<PathBuf>),
}

impl DataSource {
    /// Paths in declaration order
    pub fn paths(&self) -> Vec<&PathBuf> {
        match self {
            Self::Single(path) => vec![path],
            Self::Mixed(paths) => paths.iter().collect(),
        }
    }

    /// Whether the list form was used
    pub fn is_mixed(&self) -> bool {
        matches!(self, Self::Mixed(_))
    }
}

/// Dataset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetSpec {
    /// Data root; `$VAR` and `${VAR}` are expanded from the environment
    pub folder: String,

    /// Recording file(s) relative to `folder`
    pub pre_processed: DataSource,

    /// Balance classes in the train collection
    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub upsampling: bool,

    /// How minority samples are replicated when upsampling
    #[serde(default)]
    pub upsampling_policy: UpsamplingPolicy,

    /// Use soft labels instead of hard {0, 1} labels
    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub soft_label: bool,

    /// Accepted for compatibility; leave-one-subject-out always runs
    #[serde(default = "default_true", deserialize_with = "deserialize_bool_lenient")]
    pub leave_one_out: bool,

    /// Lowest trial repetition (seed) included
    pub min_seed: u32,

    /// Highest trial repetition (seed) included
    pub max_seed: u32,

    /// Declared window length in samples (checked against `start`/`end`)
    #[serde(rename = "L", default, skip_serializing_if = "Option::is_none")]
    pub window_len: Option<usize>,

    /// Number of EEG channels fed to the model
    pub channels: usize,

    /// Number of channels of the auxiliary ERP output
    #[serde(default = "default_channels_erp")]
    pub channels_erp: usize,

    /// Sample rate in Hz
    pub sr: f32,

    /// Number of subjects present in every recording (`0..num_sbjs`)
    pub num_sbjs: usize,

    /// First subject of the per-subject protocols (inclusive)
    #[serde(default)]
    pub from_sbj: usize,

    /// Last subject of the per-subject protocols (exclusive, defaults to `num_sbjs`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_sbj: Option<usize>,

    /// Window start in milliseconds after stimulus onset
    pub start: f32,

    /// Window end in milliseconds after stimulus onset
    pub end: f32,

    /// Paradigm names included in composition (all when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paradigms: Option<Vec<String>>,

    /// Fold assignment policy
    #[serde(default)]
    pub split: SplitPolicy,

    /// Auxiliary per-source evaluation settings
    #[serde(default)]
    pub breakdown: BreakdownSpec,

    /// Amplitude normalisation
    #[serde(default)]
    pub scaler: ScalerSpec,
}

impl DatasetSpec {
    /// Exclusive end of the per-subject protocol range
    pub fn to_sbj(&self) -> usize {
        self.to_sbj.unwrap_or(self.num_sbjs)
    }

    /// Window and channel geometry in samples
    pub fn geometry(&self) -> WindowGeometry {
        let start = ms_to_samples(self.start, self.sr);
        let end = ms_to_samples(self.end, self.sr);
        WindowGeometry {
            sample_rate: self.sr,
            start,
            end,
            len: end.saturating_sub(start),
            channels: self.channels,
            channels_erp: self.channels_erp,
        }
    }
}

fn ms_to_samples(ms: f32, sr: f32) -> usize {
    (ms * sr / 1000.0).floor().max(0.0) as usize
}

/// Model input geometry derived from the dataset section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowGeometry {
    /// Sample rate in Hz
    pub sample_rate: f32,
    /// First sample of the window
    pub start: usize,
    /// One past the last sample of the window
    pub end: usize,
    /// Window length in samples
    pub len: usize,
    /// Input channels
    pub channels: usize,
    /// Auxiliary ERP output channels
    pub channels_erp: usize,
}

impl WindowGeometry {
    /// Flattened input length (`channels * len`)
    pub fn input_len(&self) -> usize {
        self.channels * self.len
    }
}

/// Auxiliary per-source evaluation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BreakdownSpec {
    /// Single trial repetition evaluated per source
    #[serde(default = "default_breakdown_seed")]
    pub seed: u32,

    /// Paradigm evaluated per source (all when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paradigm: Option<String>,
}

impl Default for BreakdownSpec {
    fn default() -> Self {
        Self {
            seed: default_breakdown_seed(),
            paradigm: None,
        }
    }
}

fn default_breakdown_seed() -> u32 {
    1
}

/// Scaler transform kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalerKind {
    /// Affine map of [min, max] onto `feature_range`
    MinMaxScaler,
    /// Median centring and 5-95 percentile scaling
    RobustScaler,
}

/// Scaler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScalerSpec {
    /// Transform kind; `null` disables normalisation
    #[serde(rename = "type", default)]
    pub kind: Option<ScalerKind>,

    /// Persisted scaler artifact (`$VAR` expanded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Output range of the min-max transform
    #[serde(default = "default_feature_range")]
    pub feature_range: (f32, f32),

    /// Factor applied to raw values before fitting and transforming
    #[serde(default = "default_unit_factor")]
    pub unit_factor: f64,
}

impl Default for ScalerSpec {
    fn default() -> Self {
        Self {
            kind: None,
            path: None,
            feature_range: default_feature_range(),
            unit_factor: default_unit_factor(),
        }
    }
}

fn default_feature_range() -> (f32, f32) {
    (0.0, 1.0)
}

fn default_unit_factor() -> f64 {
    1e6
}

/// Model configuration
///
/// Architecture-specific hyperparameters are kept in `params` and handed to
/// the registered builder untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Registry name of the architecture
    pub model_name: String,

    /// Short label used in comparison tables and figures
    pub tag: String,

    /// Directory holding pretrained weights named like the output model files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pretrained: Option<PathBuf>,

    /// Add the auxiliary ERP objective during training
    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub erp_forcing: bool,

    /// Train classifier and ERP head jointly
    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub hybrid_training: bool,

    /// Architecture hyperparameters
    #[serde(flatten)]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl ModelSpec {
    /// Numeric hyperparameter lookup with fallback
    pub fn param_f64(&self, key: &str, default: f64) -> f64 {
        self.params
            .get(key)
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(default)
    }
}

/// Learning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LearningSpec {
    /// Optimizer and learning-rate schedule
    pub optimizer: OptimizerSpec,

    /// Loss functions
    pub loss_function: LossSpec,

    /// Batch, epoch and device settings
    pub running: RunningSpec,

    /// Decision-threshold policy
    #[serde(default, deserialize_with = "deserialize_threshold")]
    pub threshold: ThresholdSpec,

    /// Number of folds
    #[serde(rename = "nFold", alias = "n_fold")]
    pub n_fold: usize,
}

/// Optimizer specification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizerSpec {
    /// Registry name: "Adam" | "AdamW" | "SGD"
    pub opt: String,

    /// Learning rate
    pub lr: f32,

    /// Decay the learning rate every N epochs
    #[serde(default = "default_decay_step")]
    pub lr_decay_step: usize,

    /// Multiplicative decay factor
    #[serde(default = "default_decay_gamma")]
    pub lr_decay_gamma: f32,

    /// L2 weight decay
    #[serde(default)]
    pub weight_decay: f32,
}

fn default_decay_step() -> usize {
    1
}

fn default_decay_gamma() -> f32 {
    1.0
}

/// Loss function names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LossSpec {
    /// Classification loss registry name
    pub name: String,

    /// Auxiliary ERP loss registry name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erp_loss: Option<String>,
}

/// Parallelization mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Parallelization {
    /// Strictly sequential folds
    #[default]
    None,
    /// Pooled folds fanned out over one worker per device
    MultiFold,
}

/// Runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunningSpec {
    /// Samples per batch
    pub batch_size: usize,

    /// Loader workers (kept for compatibility, batches are built in-thread)
    #[serde(default)]
    pub num_workers: usize,

    /// Training epochs
    pub epochs: usize,

    /// Fold parallelization mode
    #[serde(default, deserialize_with = "deserialize_parallelization")]
    pub parallelization: Parallelization,

    /// Log every N epochs
    #[serde(default = "default_print_every")]
    pub print_every: usize,

    /// Device name or list of device names
    #[serde(default = "default_devices", deserialize_with = "deserialize_devices")]
    pub device: Vec<String>,

    /// Base seed for batch shuffling
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl RunningSpec {
    /// Device used by sequential protocols
    pub fn primary_device(&self) -> &str {
        self.device.first().map_or("cpu", String::as_str)
    }
}

/// `null` maps to sequential execution
fn deserialize_parallelization<'de, D>(deserializer: D) -> Result<Parallelization, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Parallelization>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_print_every() -> usize {
    1
}

fn default_devices() -> Vec<String> {
    vec!["cpu".to_string()]
}

fn default_seed() -> u64 {
    42
}

/// Criterion optimised by the validation threshold search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdCriterion {
    /// Maximise accuracy
    #[default]
    Accuracy,
    /// Maximise F1 of the positive class
    F1,
}

/// Decision-threshold policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdSpec {
    /// Criterion optimised on the validation pass
    #[serde(default)]
    pub criterion: ThresholdCriterion,

    /// Threshold used while training and as the search tie-breaker
    #[serde(default = "default_threshold")]
    pub default: f32,
}

impl Default for ThresholdSpec {
    fn default() -> Self {
        Self {
            criterion: ThresholdCriterion::default(),
            default: default_threshold(),
        }
    }
}

fn default_threshold() -> f32 {
    0.5
}

fn default_true() -> bool {
    true
}

fn default_channels_erp() -> usize {
    1
}
