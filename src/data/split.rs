//! K-fold split plans
//!
//! A plan assigns every epoch of every subject a fold id in `0..K`. For fold
//! `k` an epoch plays the test role when its fold id is `k`, the validation
//! role when it is `(k + 1) mod K` and the train role otherwise, so each fold
//! partitions the subject's epochs and each epoch is tested exactly once per
//! cycle. Plans are computed per subject so that the subject-specific and
//! leave-one-out protocols can reuse the pooled plan.

use super::recording::{RawRecording, Sources};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minimum fold count (one test fold, one validation fold, one train fold)
pub const MIN_FOLDS: usize = 3;

/// Fold assignment policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case", deny_unknown_fields)]
pub enum SplitPolicy {
    /// Contiguous chunks in recording order
    #[default]
    Contiguous,
    /// Label-stratified, seeded shuffle dealt round-robin
    Stratified {
        /// Shuffle seed
        #[serde(default = "default_split_seed")]
        seed: u64,
    },
}

fn default_split_seed() -> u64 {
    42
}

/// Role of an epoch within one fold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Training collection
    Train,
    /// Validation collection (threshold fitting)
    Validation,
    /// Test collection
    Test,
}

impl Role {
    /// Lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Validation => "validation",
            Self::Test => "test",
        }
    }
}

/// Epoch address inside one recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpochRef {
    /// Subject index
    pub subject: usize,
    /// Epoch index within the subject
    pub epoch: usize,
}

/// Materialised roles of one fold
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldAssignment {
    /// Fold index
    pub fold: usize,
    /// Train-role epochs
    pub train: Vec<EpochRef>,
    /// Validation-role epochs
    pub validation: Vec<EpochRef>,
    /// Test-role epochs
    pub test: Vec<EpochRef>,
}

impl FoldAssignment {
    /// Total number of epochs assigned
    pub fn len(&self) -> usize {
        self.train.len() + self.validation.len() + self.test.len()
    }

    /// Whether nothing was assigned
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fold ids for every epoch of one recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPlan {
    n_folds: usize,
    subjects: BTreeMap<usize, Vec<usize>>,
}

impl SplitPlan {
    /// Number of folds
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Fold ids of a subject's epochs
    pub fn fold_ids(&self, subject: usize) -> Option<&[usize]> {
        self.subjects.get(&subject).map(Vec::as_slice)
    }

    /// Subjects covered by the plan
    pub fn subjects(&self) -> impl Iterator<Item = usize> + '_ {
        self.subjects.keys().copied()
    }

    /// Role played by an epoch with fold id `fold_id` in fold `fold`
    pub fn role_for(&self, fold: usize, fold_id: usize) -> Role {
        if fold_id == fold {
            Role::Test
        } else if fold_id == (fold + 1) % self.n_folds {
            Role::Validation
        } else {
            Role::Train
        }
    }

    /// Role of one epoch in `fold`
    pub fn role(&self, fold: usize, epoch: EpochRef) -> Option<Role> {
        self.fold_ids(epoch.subject)
            .and_then(|ids| ids.get(epoch.epoch))
            .map(|&id| self.role_for(fold, id))
    }

    /// Check a fold index against the plan
    pub fn check_fold(&self, fold: usize) -> Result<()> {
        if fold >= self.n_folds {
            return Err(Error::InvalidSelection(format!(
                "fold {fold} out of range (plan has {} folds)",
                self.n_folds
            )));
        }
        Ok(())
    }

    /// Materialise the three roles of `fold`
    pub fn assignment(&self, fold: usize) -> Result<FoldAssignment> {
        self.check_fold(fold)?;
        let mut assignment = FoldAssignment {
            fold,
            ..FoldAssignment::default()
        };
        for (&subject, ids) in &self.subjects {
            for (epoch, &id) in ids.iter().enumerate() {
                let epoch_ref = EpochRef { subject, epoch };
                match self.role_for(fold, id) {
                    Role::Train => assignment.train.push(epoch_ref),
                    Role::Validation => assignment.validation.push(epoch_ref),
                    Role::Test => assignment.test.push(epoch_ref),
                }
            }
        }
        Ok(assignment)
    }
}

/// One plan per source, in source order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPlans {
    plans: Vec<SplitPlan>,
}

impl SplitPlans {
    /// Plan of source `index`
    pub fn get(&self, index: usize) -> Option<&SplitPlan> {
        self.plans.get(index)
    }

    /// Plans in source order
    pub fn iter(&self) -> impl Iterator<Item = &SplitPlan> {
        self.plans.iter()
    }

    /// Number of plans
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Whether there are no plans
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Shared fold count
    pub fn n_folds(&self) -> usize {
        self.plans.first().map_or(0, SplitPlan::n_folds)
    }
}

/// Per-subject k-fold splitter
#[derive(Clone, Debug)]
pub struct FoldSplitter {
    n_folds: usize,
    policy: SplitPolicy,
}

impl FoldSplitter {
    /// Create a contiguous splitter
    pub fn new(n_folds: usize) -> Self {
        Self {
            n_folds,
            policy: SplitPolicy::Contiguous,
        }
    }

    /// Set the assignment policy
    pub fn with_policy(mut self, policy: SplitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Compute the plan for one recording
    pub fn split(&self, recording: &RawRecording) -> Result<SplitPlan> {
        if self.n_folds < MIN_FOLDS {
            return Err(Error::InvalidSelection(format!(
                "{} folds requested, at least {MIN_FOLDS} required",
                self.n_folds
            )));
        }

        let subjects = recording
            .subjects
            .iter()
            .map(|s| {
                let ids = match self.policy {
                    SplitPolicy::Contiguous => contiguous_ids(s.epochs.len(), self.n_folds),
                    SplitPolicy::Stratified { seed } => {
                        let labels: Vec<u8> = s.epochs.iter().map(|e| e.label).collect();
                        stratified_ids(&labels, self.n_folds, seed.wrapping_add(s.subject as u64))
                    }
                };
                (s.subject, ids)
            })
            .collect();

        Ok(SplitPlan {
            n_folds: self.n_folds,
            subjects,
        })
    }

    /// Compute one plan per source
    pub fn split_all(&self, sources: &Sources) -> Result<SplitPlans> {
        let plans = sources
            .recordings()
            .iter()
            .map(|r| self.split(r))
            .collect::<Result<Vec<_>>>()?;
        Ok(SplitPlans { plans })
    }
}

/// Contiguous chunks; the first `n % k` folds get one extra epoch
fn contiguous_ids(n: usize, k: usize) -> Vec<usize> {
    let fold_size = n / k;
    let remainder = n % k;
    let mut ids = Vec::with_capacity(n);
    for fold in 0..k {
        let size = fold_size + usize::from(fold < remainder);
        ids.extend(std::iter::repeat(fold).take(size));
    }
    ids
}

/// Per-label seeded shuffle, dealt round-robin with a running offset
fn stratified_ids(labels: &[u8], k: usize, seed: u64) -> Vec<usize> {
    let mut ids = vec![0; labels.len()];
    let mut dealt = 0usize;
    let mut rng_state = seed;

    for class in [0u8, 1u8] {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == class)
            .map(|(i, _)| i)
            .collect();

        for i in (1..members.len()).rev() {
            rng_state = rng_state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1);
            let j = (rng_state >> 33) as usize % (i + 1);
            members.swap(i, j);
        }

        for index in members {
            ids[index] = dealt % k;
            dealt += 1;
        }
    }
    ids
}
