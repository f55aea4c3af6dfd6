//! Dataset composition
//!
//! Turns split plans and a protocol context into concrete train, validation
//! and test collections. Composition never copies signal data: a [`Sample`]
//! is a provenance record resolved against the shared [`Sources`] on
//! retrieval, which is also where the run scaler is applied.

use super::recording::{Epoch, RawRecording, Sources};
use super::sample::{Sample, SampleSet};
use super::scaler::Scaler;
use super::split::{Role, SplitPlan, SplitPlans};
use crate::config::{BreakdownSpec, DatasetSpec, WindowGeometry};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How minority samples are replicated when upsampling
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum UpsamplingPolicy {
    /// Verbatim repetition
    #[default]
    Duplicate,
    /// Repetition with additive Gaussian noise on the scaled signal
    Jitter {
        /// Noise standard deviation (scaled units)
        std: f32,
        /// Base noise seed
        #[serde(default)]
        seed: u64,
    },
}

/// Subject selection of one protocol iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectFilter {
    /// Every subject, roles as planned
    All,
    /// A single subject, roles as planned
    Only(usize),
    /// Leave one subject out: it forms the whole test collection
    HoldOut(usize),
}

impl SubjectFilter {
    fn subject(self) -> Option<usize> {
        match self {
            Self::All => None,
            Self::Only(s) | Self::HoldOut(s) => Some(s),
        }
    }

    fn includes(self, subject: usize, num_subjects: usize) -> bool {
        match self {
            Self::All => true,
            Self::Only(s) => s == subject,
            Self::HoldOut(s) => s == subject || subject < num_subjects,
        }
    }
}

/// Row selection for one composition
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolContext {
    /// Fold index into the split plans
    pub fold: usize,
    /// Subject selection
    pub subjects: SubjectFilter,
    /// Subjects `0..num_subjects` form the leave-one-out population
    pub num_subjects: usize,
    /// Lowest included trial repetition
    pub min_seed: u32,
    /// Highest included trial repetition
    pub max_seed: u32,
    /// Balance classes in the train collection
    pub upsampling: bool,
    /// Replication policy for upsampling
    pub upsampling_policy: UpsamplingPolicy,
    /// Substitute soft labels
    pub soft_label: bool,
    /// Included paradigms (all when `None`)
    pub paradigms: Option<Vec<String>>,
}

impl ProtocolContext {
    /// Context of one iteration from the dataset section
    pub fn from_dataset(dataset: &DatasetSpec, fold: usize, subjects: SubjectFilter) -> Self {
        Self {
            fold,
            subjects,
            num_subjects: dataset.num_sbjs,
            min_seed: dataset.min_seed,
            max_seed: dataset.max_seed,
            upsampling: dataset.upsampling,
            upsampling_policy: dataset.upsampling_policy,
            soft_label: dataset.soft_label,
            paradigms: dataset.paradigms.clone(),
        }
    }

    /// Auxiliary context for per-source evaluation: one seed, no upsampling
    pub fn breakdown(&self, spec: &BreakdownSpec) -> Self {
        Self {
            min_seed: spec.seed,
            max_seed: spec.seed,
            upsampling: false,
            paradigms: spec.paradigm.clone().map(|p| vec![p]),
            ..self.clone()
        }
    }

    fn keeps(&self, epoch: &Epoch) -> bool {
        (self.min_seed..=self.max_seed).contains(&epoch.seed)
            && self
                .paradigms
                .as_ref()
                .map_or(true, |names| names.iter().any(|n| *n == epoch.paradigm))
    }
}

impl fmt::Display for ProtocolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.subjects {
            SubjectFilter::All => write!(f, "fold {}", self.fold),
            SubjectFilter::Only(s) => write!(f, "subject {s} fold {}", self.fold),
            SubjectFilter::HoldOut(s) => write!(f, "held-out subject {s}"),
        }
    }
}

/// Train, validation and test collections of one iteration
#[derive(Debug, Clone)]
pub struct ComposedDataset {
    /// Training collection (possibly upsampled)
    pub train: SampleSet,
    /// Validation collection
    pub validation: SampleSet,
    /// Test collection
    pub test: SampleSet,
}

impl ComposedDataset {
    /// Scaler shared by the three collections
    pub fn scaler(&self) -> &Arc<Scaler> {
        self.train.scaler()
    }
}

#[derive(Default)]
struct Selection {
    train: Vec<(Sample, u8)>,
    validation: Vec<(Sample, u8)>,
    test: Vec<(Sample, u8)>,
}

/// Composes sample collections with a fixed scaler and input geometry
#[derive(Debug, Clone)]
pub struct Composer {
    scaler: Arc<Scaler>,
    geometry: WindowGeometry,
}

impl Composer {
    /// Create a composer
    pub fn new(scaler: Arc<Scaler>, geometry: WindowGeometry) -> Self {
        Self { scaler, geometry }
    }

    /// Input geometry of composed samples
    pub fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    /// Compose the three collections of one iteration
    pub fn compose(
        &self,
        sources: &Sources,
        plans: &SplitPlans,
        ctx: &ProtocolContext,
    ) -> Result<ComposedDataset> {
        self.check(sources, plans, ctx)?;

        let mut merged = Selection::default();
        for (index, recording) in sources.recordings().iter().enumerate() {
            let plan = plan_for(plans, index)?;
            let part = select(index, recording, plan, ctx);
            merged.train.extend(part.train);
            merged.validation.extend(part.validation);
            merged.test.extend(part.test);
        }

        let mut train: Vec<Sample> = merged.train.iter().map(|(s, _)| *s).collect();
        if ctx.upsampling {
            train = upsample(&merged.train, ctx.upsampling_policy);
        }
        let jitter = match ctx.upsampling_policy {
            UpsamplingPolicy::Jitter { std, .. } if ctx.upsampling => std,
            _ => 0.0,
        };

        let strip = |part: Vec<(Sample, u8)>| part.into_iter().map(|(s, _)| s).collect();
        let composed = ComposedDataset {
            train: self.collection("train", train, sources, ctx)?.with_jitter(jitter),
            validation: self.collection("validation", strip(merged.validation), sources, ctx)?,
            test: self.collection("test", strip(merged.test), sources, ctx)?,
        };

        tracing::debug!(
            context = %ctx,
            train = composed.train.len(),
            validation = composed.validation.len(),
            test = composed.test.len(),
            "composed dataset"
        );
        Ok(composed)
    }

    /// One evaluation collection per source under `ctx`
    ///
    /// Pooled and subject-specific contexts keep each source's test role; a
    /// hold-out context keeps every epoch of the held-out subject.
    pub fn compose_breakdown(
        &self,
        sources: &Sources,
        plans: &SplitPlans,
        ctx: &ProtocolContext,
    ) -> Result<Vec<SampleSet>> {
        self.check(sources, plans, ctx)?;
        let ctx = ProtocolContext {
            upsampling: false,
            ..ctx.clone()
        };

        sources
            .recordings()
            .iter()
            .enumerate()
            .map(|(index, recording)| {
                let plan = plan_for(plans, index)?;
                let part = select(index, recording, plan, &ctx);
                let samples = part.test.into_iter().map(|(s, _)| s).collect();
                self.collection("breakdown", samples, sources, &ctx)
            })
            .collect()
    }

    fn collection(
        &self,
        role: &'static str,
        samples: Vec<Sample>,
        sources: &Sources,
        ctx: &ProtocolContext,
    ) -> Result<SampleSet> {
        if samples.is_empty() {
            return Err(Error::EmptyCollection {
                role,
                context: ctx.to_string(),
            });
        }
        Ok(SampleSet::new(
            samples,
            sources.clone(),
            Arc::clone(&self.scaler),
            self.geometry,
        ))
    }

    fn check(&self, sources: &Sources, plans: &SplitPlans, ctx: &ProtocolContext) -> Result<()> {
        if sources.is_empty() {
            return Err(Error::InvalidSelection("no sources loaded".to_string()));
        }
        if plans.len() != sources.len() {
            return Err(Error::InvalidSelection(format!(
                "{} split plans for {} sources",
                plans.len(),
                sources.len()
            )));
        }
        let g = self.geometry;
        if g.len == 0 {
            return Err(Error::InvalidSelection("empty sample window".to_string()));
        }
        for (index, recording) in sources.recordings().iter().enumerate() {
            plan_for(plans, index)?.check_fold(ctx.fold)?;
            if g.end > recording.times || g.channels > recording.channels {
                return Err(Error::InvalidSelection(format!(
                    "source '{}' has {} channels x {} samples, window needs {} x {}..{}",
                    recording.name, recording.channels, recording.times, g.channels, g.start, g.end
                )));
            }
        }
        if let Some(subject) = ctx.subjects.subject() {
            let known = sources
                .recordings()
                .iter()
                .any(|r| r.subject(subject).is_some());
            if !known {
                return Err(Error::InvalidSelection(format!(
                    "subject {subject} is not present in any source"
                )));
            }
        }
        Ok(())
    }
}

fn plan_for(plans: &SplitPlans, index: usize) -> Result<&SplitPlan> {
    plans
        .get(index)
        .ok_or_else(|| Error::InvalidSelection(format!("no split plan for source {index}")))
}

fn select(
    source: usize,
    recording: &RawRecording,
    plan: &SplitPlan,
    ctx: &ProtocolContext,
) -> Selection {
    let mut selection = Selection::default();

    for subject in recording
        .subjects
        .iter()
        .filter(|s| ctx.subjects.includes(s.subject, ctx.num_subjects))
    {
        let Some(ids) = plan.fold_ids(subject.subject) else {
            continue;
        };
        for (epoch_index, (epoch, &fold_id)) in subject.epochs.iter().zip(ids).enumerate() {
            if !ctx.keeps(epoch) {
                continue;
            }
            let planned = plan.role_for(ctx.fold, fold_id);
            let role = match ctx.subjects {
                SubjectFilter::HoldOut(held) if held == subject.subject => Role::Test,
                SubjectFilter::HoldOut(_) => match planned {
                    Role::Train => Role::Train,
                    Role::Validation | Role::Test => Role::Validation,
                },
                SubjectFilter::All | SubjectFilter::Only(_) => planned,
            };
            let sample = Sample {
                source,
                subject: subject.subject,
                epoch: epoch_index,
                label: epoch.effective_label(ctx.soft_label),
                augmentation: None,
            };
            let entry = (sample, epoch.label);
            match role {
                Role::Train => selection.train.push(entry),
                Role::Validation => selection.validation.push(entry),
                Role::Test => selection.test.push(entry),
            }
        }
    }
    selection
}

/// Repeat minority-class samples in order until both classes are equal
fn upsample(train: &[(Sample, u8)], policy: UpsamplingPolicy) -> Vec<Sample> {
    let mut samples: Vec<Sample> = train.iter().map(|(s, _)| *s).collect();
    let positives: Vec<Sample> = train.iter().filter(|(_, c)| *c == 1).map(|(s, _)| *s).collect();
    let negatives: Vec<Sample> = train.iter().filter(|(_, c)| *c == 0).map(|(s, _)| *s).collect();

    let (minority, deficit) = if positives.len() < negatives.len() {
        let deficit = negatives.len() - positives.len();
        (positives, deficit)
    } else {
        let deficit = positives.len() - negatives.len();
        (negatives, deficit)
    };
    if minority.is_empty() || deficit == 0 {
        return samples;
    }

    let base_seed = match policy {
        UpsamplingPolicy::Duplicate => 0,
        UpsamplingPolicy::Jitter { seed, .. } => seed,
    };
    samples.extend(minority.iter().cycle().take(deficit).enumerate().map(|(i, s)| Sample {
        augmentation: Some(base_seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(i as u64 + 1)),
        ..*s
    }));
    samples
}
