//! Logistic classifier over the flattened ERP window

use crate::config::{ModelSpec, WindowGeometry};
use crate::error::{Error, Result};
use crate::protocol::Classifier;
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Numerically stable sigmoid
fn sigmoid(v: f32) -> f32 {
    if v >= 0.0 {
        1.0 / (1.0 + (-v).exp())
    } else {
        let e = v.exp();
        e / (1.0 + e)
    }
}

/// Persisted weights
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WeightsFile {
    model_name: String,
    input_len: usize,
    weights: Vec<f32>,
    bias: f32,
}

/// `p = sigmoid(w · x + b)`
#[derive(Debug, Clone)]
pub struct LinearProbe {
    input_len: usize,
    init_scale: f32,
    /// `input_len` weights followed by the bias
    params: Vec<f32>,
    pretrained: Option<PathBuf>,
}

impl LinearProbe {
    /// Registry name
    pub const NAME: &'static str = "LinearProbe";

    /// Zero-initialised probe for `input_len` features
    pub fn new(input_len: usize) -> Self {
        Self {
            input_len,
            init_scale: 0.01,
            params: vec![0.0; input_len + 1],
            pretrained: None,
        }
    }

    /// Registry constructor; reads `init_scale` from the model params
    pub fn build(spec: &ModelSpec, geometry: &WindowGeometry) -> Result<Box<dyn Classifier>> {
        let input_len = geometry.input_len();
        if input_len == 0 {
            return Err(Error::ConfigError(
                "LinearProbe needs a non-empty input window".to_string(),
            ));
        }
        let mut probe = Self::new(input_len);
        probe.init_scale = spec.param_f64("init_scale", 0.01) as f32;
        Ok(Box::new(probe))
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!(
                "cannot read pretrained weights {}: {e}",
                path.display()
            ))
        })?;
        let file: WeightsFile = serde_json::from_str(&content)
            .map_err(|e| Error::Serialization(format!("pretrained weights: {e}")))?;
        if file.input_len != self.input_len || file.weights.len() != self.input_len {
            return Err(Error::ConfigError(format!(
                "pretrained weights {} have {} inputs, model expects {}",
                path.display(),
                file.input_len,
                self.input_len
            )));
        }
        self.params = file.weights;
        self.params.push(file.bias);
        Ok(())
    }
}

impl Classifier for LinearProbe {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn initialize(&mut self, seed: u64) -> Result<()> {
        if let Some(path) = self.pretrained.clone() {
            tracing::info!(path = %path.display(), "loading pretrained weights");
            return self.load(&path);
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let scale = self.init_scale;
        for w in &mut self.params[..self.input_len] {
            *w = (rng.random::<f32>() * 2.0 - 1.0) * scale;
        }
        self.params[self.input_len] = 0.0;
        Ok(())
    }

    fn set_pretrained(&mut self, path: PathBuf) {
        self.pretrained = Some(path);
    }

    fn pretrained(&self) -> Option<&Path> {
        self.pretrained.as_deref()
    }

    fn forward(&self, inputs: ArrayView2<'_, f32>) -> Array1<f32> {
        let weights = ArrayView1::from(&self.params[..self.input_len]);
        let bias = self.params[self.input_len];
        inputs.dot(&weights).mapv(|z| sigmoid(z + bias))
    }

    fn backward(&self, inputs: ArrayView2<'_, f32>, grad_output: ArrayView1<'_, f32>) -> Vec<f32> {
        // dL/dz = dL/dp * p * (1 - p)
        let p = self.forward(inputs);
        let dz = &grad_output * &p.mapv(|p| p * (1.0 - p));
        let mut grads = inputs.t().dot(&dz).to_vec();
        grads.push(dz.sum());
        grads
    }

    fn parameters(&self) -> &[f32] {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut [f32] {
        &mut self.params
    }

    fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = WeightsFile {
            model_name: Self::NAME.to_string(),
            input_len: self.input_len,
            weights: self.params[..self.input_len].to_vec(),
            bias: self.params[self.input_len],
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::Serialization(format!("model serialization failed: {e}")))?;
        fs::write(path, json)?;
        Ok(())
    }
}
