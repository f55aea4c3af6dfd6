//! Evaluation
//!
//! - `binary`: confusion counts, accuracy, F1 and their class-balanced forms
//! - `threshold`: decision threshold search and [`ThresholdEvaluator`]
//!
//! Validation passes search the threshold; test and breakdown passes reuse it.

pub mod binary;
pub mod threshold;

pub use binary::BinaryConfusion;
pub use threshold::{search_threshold, ThresholdEvaluator};
