//! Atencion: auditory-attention ERP experiment harness
//!
//! Trains and evaluates binary attended/unattended classifiers on
//! stimulus-locked EEG epochs under three validation protocols:
//!
//! - subject-pooled k-fold (`SI`)
//! - leave-one-subject-out (`CS`)
//! - subject-specific k-fold (`SS`)
//!
//! Each configuration fills one metric table per protocol; several
//! configurations are then compared in a Markdown/JSON report with
//! bar-chart figures.
//!
//! # Layout
//!
//! - [`config`]: YAML schema, loading, validation and the collaborator registry
//! - [`data`]: recordings, fold splitting, scaling and dataset composition
//! - [`model`]: reference classifier, losses, optimizers and training loop
//! - [`eval`]: threshold search and binary metrics
//! - [`protocol`]: the three protocol orchestrators and the fold worker pool
//! - [`report`]: metric tables, aggregation and figures
//! - [`run`]: per-configuration driver and the final comparison

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod model;
pub mod protocol;
pub mod report;
pub mod run;

pub use error::{Error, Result};
