//! In-memory ERP recordings

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// One stimulus-locked epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epoch {
    /// Row-major `channels x times` signal in volts
    pub signal: Vec<f32>,
    /// Attended (1) or unattended (0)
    pub label: u8,
    /// Continuous label used in soft-label mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_label: Option<f32>,
    /// Paradigm / experimental condition tag
    pub paradigm: String,
    /// Trial repetition index
    pub seed: u32,
}

impl Epoch {
    /// Label as seen by the classifier
    pub fn effective_label(&self, soft: bool) -> f32 {
        if soft {
            self.soft_label.unwrap_or(f32::from(self.label))
        } else {
            f32::from(self.label)
        }
    }
}

/// All epochs of one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecording {
    /// Subject index (shared across sources)
    pub subject: usize,
    /// Epochs in recording order
    pub epochs: Vec<Epoch>,
}

/// One pre-processed source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecording {
    /// Source name (defaults to the file stem)
    #[serde(default)]
    pub name: String,
    /// Sample rate in Hz
    pub sample_rate: f32,
    /// Channels per epoch
    pub channels: usize,
    /// Samples per channel per epoch
    pub times: usize,
    /// Per-subject epochs
    pub subjects: Vec<SubjectRecording>,
}

impl RawRecording {
    /// Subject entry by subject index
    pub fn subject(&self, subject: usize) -> Option<&SubjectRecording> {
        self.subjects.iter().find(|s| s.subject == subject)
    }

    /// Total number of epochs
    pub fn n_epochs(&self) -> usize {
        self.subjects.iter().map(|s| s.epochs.len()).sum()
    }

    /// Iterate over every raw value
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.subjects
            .iter()
            .flat_map(|s| s.epochs.iter())
            .flat_map(|e| e.signal.iter().copied())
    }

    /// Check the uniform-geometry invariant
    pub fn validate(&self, path: &Path) -> Result<()> {
        if self.sample_rate <= 0.0 || !self.sample_rate.is_finite() {
            return Err(Error::data(
                path,
                format!("invalid sample rate {}", self.sample_rate),
            ));
        }
        if self.channels == 0 || self.times == 0 {
            return Err(Error::data(path, "empty epoch geometry"));
        }
        if self.subjects.is_empty() {
            return Err(Error::data(path, "recording has no subjects"));
        }

        let expected = self.channels * self.times;
        let mut seen = std::collections::BTreeSet::new();
        for subject in &self.subjects {
            if !seen.insert(subject.subject) {
                return Err(Error::data(
                    path,
                    format!("subject {} listed twice", subject.subject),
                ));
            }
            for (i, epoch) in subject.epochs.iter().enumerate() {
                if epoch.signal.len() != expected {
                    return Err(Error::data(
                        path,
                        format!(
                            "subject {} epoch {i}: {} values, expected {expected}",
                            subject.subject,
                            epoch.signal.len()
                        ),
                    ));
                }
                if epoch.label > 1 {
                    return Err(Error::data(
                        path,
                        format!(
                            "subject {} epoch {i}: label {} outside {{0, 1}}",
                            subject.subject, epoch.label
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Loaded sources in declaration order
#[derive(Debug, Clone)]
pub struct Sources {
    recordings: Vec<Arc<RawRecording>>,
    mixed: bool,
}

impl Sources {
    /// One recording, composed without provenance breakdown
    pub fn single(recording: RawRecording) -> Self {
        Self {
            recordings: vec![Arc::new(recording)],
            mixed: false,
        }
    }

    /// Several recordings merged into one mixed stream
    pub fn mixed(recordings: Vec<RawRecording>) -> Self {
        Self {
            recordings: recordings.into_iter().map(Arc::new).collect(),
            mixed: true,
        }
    }

    /// Recordings in declaration order
    pub fn recordings(&self) -> &[Arc<RawRecording>] {
        &self.recordings
    }

    /// Number of sources
    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    /// Whether no source is loaded
    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }

    /// Whether per-source breakdowns apply
    pub fn is_mixed(&self) -> bool {
        self.mixed
    }
}
