//! Amplitude scaler
//!
//! A scaler is fit once per run over the pooled raw values of every source
//! and reused read-only by every composed collection. When the artifact path
//! already holds a scaler it is loaded unchanged, so repeated runs share the
//! exact same transform.

use super::recording::Sources;
use crate::config::{expand_env, ScalerKind, ScalerSpec};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Quantile range of the robust transform (percent)
pub const ROBUST_QUANTILE_RANGE: (f64, f64) = (5.0, 95.0);

/// Fitted affine transform `y = (x * unit_factor) * scale + offset`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    /// Transform kind (`None` is the identity after unit conversion)
    pub kind: Option<ScalerKind>,
    /// Unit conversion applied before the affine map
    pub unit_factor: f64,
    /// Multiplicative term
    pub scale: f64,
    /// Additive term
    pub offset: f64,
    /// Number of values the transform was fit on
    pub n_samples: usize,
}

impl Scaler {
    /// Unit conversion only
    pub fn identity(unit_factor: f64) -> Self {
        Self {
            kind: None,
            unit_factor,
            scale: 1.0,
            offset: 0.0,
            n_samples: 0,
        }
    }

    /// Transform one raw value
    #[inline]
    pub fn transform(&self, value: f32) -> f32 {
        (f64::from(value) * self.unit_factor * self.scale + self.offset) as f32
    }

    /// Transform raw values in place
    pub fn transform_in_place(&self, values: &mut [f32]) {
        for v in values {
            *v = self.transform(*v);
        }
    }

    /// Fit a min-max transform onto `range`
    pub fn fit_min_max(values: &[f64], range: (f32, f32), unit_factor: f64) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::InvalidSelection(
                "cannot fit scaler on zero values".to_string(),
            ));
        }
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let (a, b) = (f64::from(range.0), f64::from(range.1));
        let data_range = max - min;
        let scale = if data_range > 0.0 {
            (b - a) / data_range
        } else {
            1.0
        };
        Ok(Self {
            kind: Some(ScalerKind::MinMaxScaler),
            unit_factor,
            scale,
            offset: a - min * scale,
            n_samples: values.len(),
        })
    }

    /// Fit a median-centred, 5-95 percentile-scaled transform
    pub fn fit_robust(values: &mut [f64], unit_factor: f64) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::InvalidSelection(
                "cannot fit scaler on zero values".to_string(),
            ));
        }
        values.sort_unstable_by(f64::total_cmp);
        let median = percentile(values, 50.0);
        let spread =
            percentile(values, ROBUST_QUANTILE_RANGE.1) - percentile(values, ROBUST_QUANTILE_RANGE.0);
        let scale = if spread > 0.0 { 1.0 / spread } else { 1.0 };
        Ok(Self {
            kind: Some(ScalerKind::RobustScaler),
            unit_factor,
            scale,
            offset: -median * scale,
            n_samples: values.len(),
        })
    }

    /// Write the scaler as JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("scaler serialization failed: {e}")))?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read a scaler written by [`Scaler::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Serialization(format!("scaler deserialization failed: {e}")))
    }
}

/// Linear-interpolated percentile of sorted values
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Resolved artifact path of a scaler spec
pub fn scaler_path(spec: &ScalerSpec) -> Option<PathBuf> {
    spec.path.as_deref().map(|p| PathBuf::from(expand_env(p)))
}

/// Fit the configured transform over every raw value of every source
pub fn fit(sources: &Sources, spec: &ScalerSpec) -> Result<Scaler> {
    let Some(kind) = spec.kind else {
        return Ok(Scaler::identity(spec.unit_factor));
    };

    let mut values: Vec<f64> = sources
        .recordings()
        .iter()
        .flat_map(|r| r.values())
        .map(|v| f64::from(v) * spec.unit_factor)
        .collect();
    tracing::info!(values = values.len(), kind = ?kind, "fitting scaler on pooled raw data");

    match kind {
        ScalerKind::MinMaxScaler => {
            Scaler::fit_min_max(&values, spec.feature_range, spec.unit_factor)
        }
        ScalerKind::RobustScaler => Scaler::fit_robust(&mut values, spec.unit_factor),
    }
}

/// Load the scaler at the configured path, or fit and persist it
pub fn fit_or_load(sources: &Sources, spec: &ScalerSpec) -> Result<Scaler> {
    if spec.kind.is_none() {
        return Ok(Scaler::identity(spec.unit_factor));
    }

    let path = scaler_path(spec);
    if let Some(path) = &path {
        if path.exists() {
            tracing::info!(path = %path.display(), "loading scaler");
            return Scaler::load(path);
        }
    }

    let scaler = fit(sources, spec)?;
    if let Some(path) = &path {
        scaler.save(path)?;
        tracing::info!(path = %path.display(), "scaler saved");
    }
    Ok(scaler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::recording::{Epoch, RawRecording, SubjectRecording};
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    fn sources(values: &[f32]) -> Sources {
        Sources::mixed(vec![RawRecording {
            name: "s".into(),
            sample_rate: 100.0,
            channels: 1,
            times: values.len(),
            subjects: vec![SubjectRecording {
                subject: 0,
                epochs: vec![Epoch {
                    signal: values.to_vec(),
                    label: 0,
                    soft_label: None,
                    paradigm: "p".into(),
                    seed: 1,
                }],
            }],
        }])
    }

    fn spec(kind: Option<ScalerKind>, path: Option<String>) -> ScalerSpec {
        ScalerSpec {
            kind,
            path,
            feature_range: (-1.0, 1.0),
            unit_factor: 1e6,
        }
    }

    #[test]
    fn test_min_max_maps_extremes_to_range() {
        let src = sources(&[-2e-6, 0.0, 2e-6]);
        let scaler = fit(&src, &spec(Some(ScalerKind::MinMaxScaler), None)).unwrap();
        assert_relative_eq!(scaler.transform(-2e-6), -1.0, epsilon = 1e-5);
        assert_relative_eq!(scaler.transform(2e-6), 1.0, epsilon = 1e-5);
        assert_relative_eq!(scaler.transform(0.0), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_robust_centres_on_median() {
        let values: Vec<f32> = (0..=100).map(|i| i as f32 * 1e-6).collect();
        let scaler = fit(&sources(&values), &spec(Some(ScalerKind::RobustScaler), None)).unwrap();
        assert_relative_eq!(scaler.transform(50e-6), 0.0, epsilon = 1e-4);
        // 5th..95th percentile spans 90 units
        assert_relative_eq!(scaler.transform(95e-6), 45.0 / 90.0, epsilon = 1e-4);
    }

    #[test]
    fn test_constant_data_does_not_divide_by_zero() {
        let scaler = fit(&sources(&[1e-6; 4]), &spec(Some(ScalerKind::MinMaxScaler), None)).unwrap();
        assert!(scaler.transform(1e-6).is_finite());
    }

    #[test]
    fn test_no_kind_is_unit_conversion() {
        let scaler = fit_or_load(&sources(&[1e-6]), &spec(None, None)).unwrap();
        assert_relative_eq!(scaler.transform(1e-6), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_fit_or_load_second_call_loads_identical_parameters() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/scaler.json");
        let s = spec(
            Some(ScalerKind::RobustScaler),
            Some(path.to_string_lossy().to_string()),
        );

        let first = fit_or_load(&sources(&[1e-6, 3e-6, 7e-6, -2e-6]), &s).unwrap();
        assert!(path.exists());

        // Different data: a refit would change the parameters
        let second = fit_or_load(&sources(&[5e-5, 9e-5]), &s).unwrap();
        assert_eq!(first.scale.to_bits(), second.scale.to_bits());
        assert_eq!(first.offset.to_bits(), second.offset.to_bits());
        assert_eq!(first, second);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [0.0, 10.0, 20.0, 30.0];
        assert_relative_eq!(percentile(&sorted, 50.0), 15.0);
        assert_relative_eq!(percentile(&sorted, 0.0), 0.0);
        assert_relative_eq!(percentile(&sorted, 100.0), 30.0);
    }
}
