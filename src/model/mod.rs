//! Reference model collaborators
//!
//! - `LinearProbe` - logistic classifier over the flattened window
//! - `GradientFitter` - minibatch training loop with best-epoch selection
//! - `BCELoss`, `MSELoss` - losses on probabilities
//! - `SGD`, `Adam`, `AdamW` with a `StepDecayLR` schedule

mod fit;
mod linear_probe;
mod loss;
mod optimizer;

pub use fit::GradientFitter;
pub use linear_probe::LinearProbe;
pub use loss::{BCELoss, LossFn, MSELoss};
pub use optimizer::{Adam, AdamW, Optimizer, StepDecayLR, SGD};
