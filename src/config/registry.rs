//! Name-to-constructor registry for models, optimizers and losses
//!
//! Configuration files refer to collaborators by name (`model_name`, `opt`,
//! `loss_function.name`). Names are checked against the registry during
//! validation, before any data is loaded.

use super::schema::{ModelSpec, OptimizerSpec, WindowGeometry};
use crate::error::{Error, Result};
use crate::model::{Adam, AdamW, BCELoss, LinearProbe, LossFn, MSELoss, Optimizer, SGD};
use crate::protocol::{Classifier, ModelBuilder};
use std::collections::BTreeMap;

/// Optimizer constructor
pub type OptimizerBuilder = fn(&OptimizerSpec) -> Box<dyn Optimizer>;

/// Loss constructor
pub type LossBuilder = fn() -> Box<dyn LossFn>;

/// Registered collaborator constructors
#[derive(Clone, Default)]
pub struct Registry {
    models: BTreeMap<String, ModelBuilder>,
    optimizers: BTreeMap<String, OptimizerBuilder>,
    losses: BTreeMap<String, LossBuilder>,
}

fn known<V>(map: &BTreeMap<String, V>) -> String {
    map.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}

impl Registry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bundled reference collaborators
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register_model(LinearProbe::NAME, LinearProbe::build)
            .register_optimizer("SGD", |s| Box::new(SGD::new(s.lr, 0.9, s.weight_decay)))
            .register_optimizer("Adam", |s| Box::new(Adam::new(s.lr, s.weight_decay)))
            .register_optimizer("AdamW", |s| Box::new(AdamW::new(s.lr, s.weight_decay)))
            .register_loss("BCELoss", || Box::new(BCELoss))
            .register_loss("MSELoss", || Box::new(MSELoss));
        registry
    }

    /// Register or replace a model constructor
    pub fn register_model(&mut self, name: &str, builder: ModelBuilder) -> &mut Self {
        self.models.insert(name.to_string(), builder);
        self
    }

    /// Register or replace an optimizer constructor
    pub fn register_optimizer(&mut self, name: &str, builder: OptimizerBuilder) -> &mut Self {
        self.optimizers.insert(name.to_string(), builder);
        self
    }

    /// Register or replace a loss constructor
    pub fn register_loss(&mut self, name: &str, builder: LossBuilder) -> &mut Self {
        self.losses.insert(name.to_string(), builder);
        self
    }

    /// Whether a model name is registered
    pub fn has_model(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Whether an optimizer name is registered
    pub fn has_optimizer(&self, name: &str) -> bool {
        self.optimizers.contains_key(name)
    }

    /// Whether a loss name is registered
    pub fn has_loss(&self, name: &str) -> bool {
        self.losses.contains_key(name)
    }

    /// Registered model names, comma separated
    pub fn model_names(&self) -> String {
        known(&self.models)
    }

    /// Registered optimizer names, comma separated
    pub fn optimizer_names(&self) -> String {
        known(&self.optimizers)
    }

    /// Registered loss names, comma separated
    pub fn loss_names(&self) -> String {
        known(&self.losses)
    }

    /// Construct the configured classifier
    pub fn build_model(
        &self,
        spec: &ModelSpec,
        geometry: &WindowGeometry,
    ) -> Result<Box<dyn Classifier>> {
        let builder = self
            .models
            .get(&spec.model_name)
            .ok_or_else(|| Error::UnknownName {
                kind: "model",
                name: spec.model_name.clone(),
                known: self.model_names(),
            })?;
        builder(spec, geometry)
    }

    /// Construct the configured optimizer
    pub fn build_optimizer(&self, spec: &OptimizerSpec) -> Result<Box<dyn Optimizer>> {
        let builder = self.optimizers.get(&spec.opt).ok_or_else(|| Error::UnknownName {
            kind: "optimizer",
            name: spec.opt.clone(),
            known: self.optimizer_names(),
        })?;
        Ok(builder(spec))
    }

    /// Construct a loss by name
    pub fn build_loss(&self, name: &str) -> Result<Box<dyn LossFn>> {
        let builder = self.losses.get(name).ok_or_else(|| Error::UnknownName {
            kind: "loss",
            name: name.to_string(),
            known: self.loss_names(),
        })?;
        Ok(builder())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("models", &self.model_names())
            .field("optimizers", &self.optimizer_names())
            .field("losses", &self.loss_names())
            .finish()
    }
}
