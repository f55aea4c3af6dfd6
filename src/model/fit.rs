//! Minibatch gradient training loop

use crate::data::BatchLoader;
use crate::error::{Error, Result};
use crate::protocol::{Classifier, FitReport, FitRequest, Fitter};

/// Epoch loop keeping the parameters of the best validation loss
///
/// Each epoch applies the scheduled learning rate, runs one shuffled pass over
/// the training batches and scores the validation batches. The parameters
/// with the lowest validation loss are restored and saved at the end.
#[derive(Debug, Clone, Copy, Default)]
pub struct GradientFitter;

impl GradientFitter {
    /// Create a fitter
    pub fn new() -> Self {
        Self
    }
}

fn validation_loss(
    model: &dyn Classifier,
    data: &BatchLoader<'_>,
    request: &FitRequest<'_>,
) -> f32 {
    let mut total = 0.0;
    let mut rows = 0usize;
    for batch in data.batches(0) {
        let p = model.forward(batch.inputs.view());
        total += request.loss.forward(p.view(), batch.labels.view()) * batch.len() as f32;
        rows += batch.len();
    }
    if rows == 0 {
        0.0
    } else {
        total / rows as f32
    }
}

impl Fitter for GradientFitter {
    fn fit(&self, model: &mut dyn Classifier, mut request: FitRequest<'_>) -> Result<FitReport> {
        if request.train.is_empty() {
            return Err(Error::EmptyCollection {
                role: "train",
                context: request.model_path.display().to_string(),
            });
        }

        let mut best_params = model.parameters().to_vec();
        let mut best_loss = f32::INFINITY;
        let mut best_epoch = 0;
        let mut train_loss = 0.0;

        for epoch in 0..request.epochs {
            request.scheduler.apply(request.optimizer.as_mut());

            let mut total = 0.0;
            let mut rows = 0usize;
            for batch in request.train.batches(epoch) {
                let inputs = batch.inputs.view();
                let p = model.forward(inputs);
                let mut grad_p = request.loss.gradient(p.view(), batch.labels.view());
                total += request.loss.forward(p.view(), batch.labels.view()) * batch.len() as f32;

                if let Some(erp) = request.erp_loss {
                    grad_p = grad_p + erp.gradient(p.view(), batch.labels.view()) * request.erp_weight;
                }

                let grads = model.backward(inputs, grad_p.view());
                request.optimizer.step(model.parameters_mut(), &grads);
                rows += batch.len();
            }
            train_loss = total / rows.max(1) as f32;

            let val_loss = validation_loss(model, request.validation, &request);
            if !train_loss.is_finite() {
                return Err(Error::Evaluation(format!(
                    "training diverged at epoch {epoch} (loss {train_loss})"
                )));
            }
            if val_loss < best_loss {
                best_loss = val_loss;
                best_epoch = epoch;
                best_params.copy_from_slice(model.parameters());
            }

            if request.print_every > 0 && (epoch + 1) % request.print_every == 0 {
                tracing::info!(
                    epoch = epoch + 1,
                    train_loss,
                    val_loss,
                    lr = request.optimizer.lr(),
                    device = request.device,
                    "epoch finished"
                );
            }
            request.scheduler.step();
        }

        if best_loss.is_finite() {
            model.parameters_mut().copy_from_slice(&best_params);
        }
        model.save(request.model_path)?;
        tracing::debug!(path = %request.model_path.display(), best_epoch, "model saved");

        Ok(FitReport {
            epochs: request.epochs,
            final_train_loss: train_loss,
            best_validation_loss: best_loss,
            best_epoch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowGeometry;
    use crate::data::{
        Epoch, RawRecording, Sample, SampleSet, Scaler, Sources, SubjectRecording,
    };
    use crate::model::{Adam, BCELoss, LinearProbe, LossFn, MSELoss, StepDecayLR};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Positive epochs have a positive mean, negatives a negative mean
    fn separable(n: usize) -> SampleSet {
        let epochs: Vec<Epoch> = (0..n)
            .map(|i| {
                let label = (i % 2) as u8;
                let sign = if label == 1 { 1.0 } else { -1.0 };
                Epoch {
                    signal: vec![sign * (1.0 + (i % 3) as f32 * 0.1), sign * 0.5],
                    label,
                    soft_label: None,
                    paradigm: "p".into(),
                    seed: 1,
                }
            })
            .collect();
        let samples = (0..n)
            .map(|epoch| Sample {
                source: 0,
                subject: 0,
                epoch,
                label: (epoch % 2) as f32,
                augmentation: None,
            })
            .collect();
        SampleSet::new(
            samples,
            Sources::single(RawRecording {
                name: "s".into(),
                sample_rate: 2.0,
                channels: 1,
                times: 2,
                subjects: vec![SubjectRecording { subject: 0, epochs }],
            }),
            Arc::new(Scaler::identity(1.0)),
            WindowGeometry {
                sample_rate: 2.0,
                start: 0,
                end: 2,
                len: 2,
                channels: 1,
                channels_erp: 1,
            },
        )
    }

    fn request<'a>(
        train: &'a BatchLoader<'a>,
        validation: &'a BatchLoader<'a>,
        path: &'a std::path::Path,
        erp_loss: Option<&'a dyn LossFn>,
    ) -> FitRequest<'a> {
        FitRequest {
            train,
            validation,
            loss: &BCELoss,
            erp_loss,
            erp_weight: 0.5,
            optimizer: Box::new(Adam::new(0.1, 0.0)),
            scheduler: StepDecayLR::new(0.1, 10, 0.5),
            epochs: 30,
            print_every: 10,
            device: "cpu",
            model_path: path,
        }
    }

    #[test]
    fn test_fit_learns_separable_data_and_saves() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m.json");
        let set = separable(40);
        let train = BatchLoader::new(&set, 8).with_shuffle(1);
        let validation = BatchLoader::new(&set, 8);

        let mut model = LinearProbe::new(2);
        model.initialize(0).unwrap();
        let report = GradientFitter::new()
            .fit(&mut model, request(&train, &validation, &path, None))
            .unwrap();

        assert!(path.exists());
        assert!(report.best_validation_loss < std::f32::consts::LN_2);
        let batch = validation.batches(0).next().unwrap();
        let p = model.forward(batch.inputs.view());
        for (prob, label) in p.iter().zip(batch.labels.iter()) {
            assert_eq!(*prob >= 0.5, *label >= 0.5);
        }
    }

    #[test]
    fn test_fit_with_auxiliary_loss() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m.json");
        let set = separable(20);
        let train = BatchLoader::new(&set, 4).with_shuffle(2);
        let validation = BatchLoader::new(&set, 4);

        let mut model = LinearProbe::new(2);
        model.initialize(0).unwrap();
        let report = GradientFitter::new()
            .fit(&mut model, request(&train, &validation, &path, Some(&MSELoss)))
            .unwrap();
        assert_eq!(report.epochs, 30);
        assert!(report.final_train_loss.is_finite());
    }
}
