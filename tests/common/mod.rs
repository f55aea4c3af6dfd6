//! Shared fixtures for the integration tests

#![allow(dead_code)]

use atencion::data::{Epoch, RawRecording, SubjectRecording};
use std::fs;
use std::path::Path;

/// Linearly separable recording with alternating labels
pub fn recording(name: &str, subjects: usize, epochs: usize, offset: f32) -> RawRecording {
    RawRecording {
        name: name.into(),
        sample_rate: 100.0,
        channels: 1,
        times: 2,
        subjects: (0..subjects)
            .map(|subject| SubjectRecording {
                subject,
                epochs: (0..epochs)
                    .map(|i| {
                        let label = (i % 2) as u8;
                        let sign = if label == 1 { 1.0 } else { -1.0 };
                        Epoch {
                            signal: vec![sign * (1.0 + offset + (i % 3) as f32 * 0.1), sign * 0.5],
                            label,
                            soft_label: None,
                            paradigm: name.into(),
                            seed: 1,
                        }
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Write `recording` as `<dir>/<name>.json`
pub fn write_recording(dir: &Path, recording: &RawRecording) {
    let path = dir.join(format!("{}.json", recording.name));
    fs::write(path, serde_json::to_string(recording).unwrap()).unwrap();
}

/// Experiment configuration over `sources` (file names inside `folder`)
pub fn config_yaml(folder: &Path, output: &Path, sources: &[&str], tag: &str, num_sbjs: usize) -> String {
    let pre_processed = if sources.len() == 1 {
        sources[0].to_string()
    } else {
        format!("[{}]", sources.join(", "))
    };
    format!(
        r"
setup: {{ name: {tag}_run, output_path: {output} }}
dataset:
  folder: {folder}
  pre_processed: {pre_processed}
  min_seed: 1
  max_seed: 1
  channels: 1
  sr: 100
  num_sbjs: {num_sbjs}
  start: 0
  end: 20
  scaler: {{ unit_factor: 1.0 }}
model: {{ model_name: LinearProbe, tag: {tag} }}
learning:
  optimizer: {{ opt: Adam, lr: 0.05 }}
  loss_function: {{ name: BCELoss }}
  running: {{ batch_size: 4, epochs: 3, seed: 11 }}
  nFold: 3
",
        output = output.display(),
        folder = folder.display(),
    )
}
