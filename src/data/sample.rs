//! Composed sample collections and batch loading

use super::recording::Sources;
use super::scaler::Scaler;
use crate::config::WindowGeometry;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::sync::Arc;

/// One composed sample with provenance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Source index in declaration order
    pub source: usize,
    /// Subject index
    pub subject: usize,
    /// Epoch index within the subject
    pub epoch: usize,
    /// Effective label (hard or soft)
    pub label: f32,
    /// Noise seed of an augmented duplicate
    pub augmentation: Option<u64>,
}

impl Sample {
    /// Identity of the underlying epoch, ignoring duplication
    pub fn key(&self) -> (usize, usize, usize) {
        (self.source, self.subject, self.epoch)
    }

    /// Whether the sample was added by upsampling
    pub fn is_duplicate(&self) -> bool {
        self.augmentation.is_some()
    }
}

/// Scaled model input of one sample
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledEpoch {
    /// Flattened `channels x window` input
    pub input: Vec<f32>,
    /// Effective label
    pub label: f32,
    /// Source index
    pub source: usize,
}

/// A train, validation, test or breakdown collection
#[derive(Debug, Clone)]
pub struct SampleSet {
    samples: Vec<Sample>,
    sources: Sources,
    scaler: Arc<Scaler>,
    geometry: WindowGeometry,
    jitter_std: f32,
}

impl SampleSet {
    /// Create a collection over `sources`
    pub fn new(
        samples: Vec<Sample>,
        sources: Sources,
        scaler: Arc<Scaler>,
        geometry: WindowGeometry,
    ) -> Self {
        Self {
            samples,
            sources,
            scaler,
            geometry,
            jitter_std: 0.0,
        }
    }

    /// Noise standard deviation added to augmented duplicates
    pub fn with_jitter(mut self, std: f32) -> Self {
        self.jitter_std = std;
        self
    }

    /// Samples with provenance
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Scaler applied on retrieval
    pub fn scaler(&self) -> &Arc<Scaler> {
        &self.scaler
    }

    /// Model input geometry
    pub fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    /// Samples contributed by one source
    pub fn count_source(&self, source: usize) -> usize {
        self.samples.iter().filter(|s| s.source == source).count()
    }

    /// Samples per hard class `[negatives, positives]`
    pub fn class_counts(&self) -> [usize; 2] {
        let positives = self.samples.iter().filter(|s| s.label >= 0.5).count();
        [self.samples.len() - positives, positives]
    }

    /// Cropped, scaled input of sample `index`
    pub fn get(&self, index: usize) -> ScaledEpoch {
        let sample = self.samples[index];
        let recording = &self.sources.recordings()[sample.source];
        let epoch = &recording
            .subject(sample.subject)
            .map(|s| &s.epochs[sample.epoch])
            .unwrap_or_else(|| unreachable!("sample refers to a composed subject"));

        let g = self.geometry;
        let mut input = Vec::with_capacity(g.input_len());
        for channel in 0..g.channels {
            let row = channel * recording.times;
            input.extend_from_slice(&epoch.signal[row + g.start..row + g.end]);
        }
        self.scaler.transform_in_place(&mut input);

        if let Some(seed) = sample.augmentation {
            if self.jitter_std > 0.0 {
                let mut rng = StdRng::seed_from_u64(seed);
                let std = f64::from(self.jitter_std);
                for v in &mut input {
                    let u1: f64 = rng.random::<f64>().max(1e-10);
                    let u2: f64 = rng.random::<f64>();
                    *v += ((-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos() * std) as f32;
                }
            }
        }

        ScaledEpoch {
            input,
            label: sample.label,
            source: sample.source,
        }
    }
}

/// Mini-batch of scaled inputs
#[derive(Debug, Clone)]
pub struct Batch {
    /// `batch x input_len` inputs
    pub inputs: Array2<f32>,
    /// Effective labels
    pub labels: Array1<f32>,
    /// Source index per row
    pub sources: Vec<usize>,
}

impl Batch {
    /// Rows in the batch
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the batch has no rows
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Batched, optionally shuffled view over a collection
#[derive(Debug, Clone)]
pub struct BatchLoader<'a> {
    set: &'a SampleSet,
    batch_size: usize,
    shuffle_seed: Option<u64>,
}

impl<'a> BatchLoader<'a> {
    /// Sequential loader
    pub fn new(set: &'a SampleSet, batch_size: usize) -> Self {
        Self {
            set,
            batch_size: batch_size.max(1),
            shuffle_seed: None,
        }
    }

    /// Reshuffle every epoch from `seed + epoch`
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    /// Underlying collection
    pub fn set(&self) -> &'a SampleSet {
        self.set
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Whether the underlying collection is empty
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Batches of one pass
    pub fn batches(&self, epoch: usize) -> Batches<'a> {
        let mut order: Vec<usize> = (0..self.set.len()).collect();
        if let Some(seed) = self.shuffle_seed {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(epoch as u64));
            order.shuffle(&mut rng);
        }
        Batches {
            set: self.set,
            order,
            batch_size: self.batch_size,
            pos: 0,
        }
    }
}

/// Iterator over the batches of one pass
#[derive(Debug)]
pub struct Batches<'a> {
    set: &'a SampleSet,
    order: Vec<usize>,
    batch_size: usize,
    pos: usize,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.pos >= self.order.len() {
            return None;
        }
        let end = (self.pos + self.batch_size).min(self.order.len());
        let indices = &self.order[self.pos..end];
        self.pos = end;

        let width = self.set.geometry().input_len();
        let mut inputs = Array2::zeros((indices.len(), width));
        let mut labels = Array1::zeros(indices.len());
        let mut sources = Vec::with_capacity(indices.len());
        for (row, &index) in indices.iter().enumerate() {
            let item = self.set.get(index);
            inputs
                .row_mut(row)
                .assign(&ndarray::ArrayView1::from(item.input.as_slice()));
            labels[row] = item.label;
            sources.push(item.source);
        }
        Some(Batch {
            inputs,
            labels,
            sources,
        })
    }
}
