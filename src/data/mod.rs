//! ERP data: loading, fold splitting, composition and scaling

pub mod compose;
pub mod loader;
pub mod recording;
pub mod sample;
pub mod scaler;
pub mod split;

pub use compose::{ComposedDataset, Composer, ProtocolContext, SubjectFilter, UpsamplingPolicy};
pub use loader::{check_recording, load_dataset, load_recording, load_sources, resolve_path};
pub use recording::{Epoch, RawRecording, Sources, SubjectRecording};
pub use sample::{Batch, BatchLoader, Batches, Sample, SampleSet, ScaledEpoch};
pub use scaler::{fit_or_load, Scaler, ROBUST_QUANTILE_RANGE};
pub use split::{EpochRef, FoldAssignment, FoldSplitter, Role, SplitPlan, SplitPlans, SplitPolicy, MIN_FOLDS};
