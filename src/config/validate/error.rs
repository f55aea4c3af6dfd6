//! Validation error types
//!
//! Defines all validation error variants for experiment configurations.

/// Validation error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid fold count: {0} (must be >= 3)")]
    InvalidFoldCount(usize),

    #[error("Invalid batch size: {0} (must be > 0)")]
    InvalidBatchSize(usize),

    #[error("Invalid epochs: {0} (must be > 0)")]
    InvalidEpochs(usize),

    #[error("Invalid learning rate: {0} (must be > 0.0 and <= 1.0)")]
    InvalidLearningRate(f32),

    #[error("Invalid learning rate decay gamma: {0} (must be > 0.0)")]
    InvalidDecayGamma(f32),

    #[error("Invalid weight decay: {0} (must be >= 0.0)")]
    InvalidWeightDecay(f32),

    #[error("Invalid seed range: min_seed {min} > max_seed {max}")]
    InvalidSeedRange { min: u32, max: u32 },

    #[error("Invalid subject range: {from}..{to} with {num_sbjs} subjects")]
    InvalidSubjectRange {
        from: usize,
        to: usize,
        num_sbjs: usize,
    },

    #[error("Invalid sample rate: {0} (must be > 0)")]
    InvalidSampleRate(f32),

    #[error("Invalid channel count: {0} (must be > 0)")]
    InvalidChannels(usize),

    #[error("Invalid window: {start} ms .. {end} ms (end must be after start, both >= 0)")]
    InvalidWindow { start: f32, end: f32 },

    #[error("Window length mismatch: L = {declared} but start/end give {derived} samples")]
    WindowLengthMismatch { declared: usize, derived: usize },

    #[error("Invalid scaler feature range: ({0}, {1}) (min must be < max)")]
    InvalidFeatureRange(f32, f32),

    #[error("Invalid scaler unit factor: {0} (must be finite and non-zero)")]
    InvalidUnitFactor(f64),

    #[error("Scaler type set but dataset.scaler.path is missing")]
    MissingScalerPath,

    #[error("Invalid upsampling jitter: {0} (must be finite and >= 0)")]
    InvalidJitter(f32),

    #[error("Invalid default threshold: {0} (must be within [0, 1])")]
    InvalidThreshold(f32),

    #[error("dataset.pre_processed names no recording")]
    NoSources,

    #[error("Parallelization multi-fold requires at least one device")]
    NoDevices,

    #[error("Model tag cannot be empty")]
    EmptyTag,

    #[error("Unknown model: {name} (registered: {known})")]
    UnknownModel { name: String, known: String },

    #[error("Unknown optimizer: {name} (registered: {known})")]
    UnknownOptimizer { name: String, known: String },

    #[error("Unknown loss: {name} (registered: {known})")]
    UnknownLoss { name: String, known: String },
}
