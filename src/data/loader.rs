//! Recording loader
//!
//! Recordings are stored as JSON (`.json`) or YAML (`.yaml`, `.yml`) documents
//! of [`RawRecording`]. The encoding is picked from the file extension.

use super::recording::{RawRecording, Sources};
use crate::config::{expand_env, DataSource, DatasetSpec};
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Load one recording and check its geometry
pub fn load_recording(path: impl AsRef<Path>) -> Result<RawRecording> {
    let path = path.as_ref();

    let content = fs::read_to_string(path)
        .map_err(|e| Error::data(path, format!("cannot read recording: {e}")))?;

    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let mut recording: RawRecording = match ext.as_str() {
        "json" => serde_json::from_str(&content)
            .map_err(|e| Error::data(path, format!("malformed JSON recording: {e}")))?,
        "yaml" | "yml" => serde_yaml::from_str(&content)
            .map_err(|e| Error::data(path, format!("malformed YAML recording: {e}")))?,
        other => {
            return Err(Error::data(
                path,
                format!("unsupported recording extension '{other}'"),
            ))
        }
    };

    if recording.name.is_empty() {
        recording.name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("recording")
            .to_string();
    }

    recording.validate(path)?;
    Ok(recording)
}

/// Resolve a source path against the (environment-expanded) data folder
pub fn resolve_path(folder: &str, file: &Path) -> PathBuf {
    let folder = PathBuf::from(expand_env(folder));
    let file = PathBuf::from(expand_env(&file.to_string_lossy()));
    folder.join(file)
}

/// Load every recording named by `source`
///
/// The single-path form yields an unmixed [`Sources`]; the list form yields a
/// mixed one even when the list has a single entry.
pub fn load_sources(folder: &str, source: &DataSource) -> Result<Sources> {
    load_checked(folder, source, |_, _| Ok(()))
}

/// Load the sources of `dataset` and check them against its declarations
///
/// Every recording must be sampled at `dataset.sr` and hold each subject of
/// `0..num_sbjs`.
pub fn load_dataset(dataset: &DatasetSpec) -> Result<Sources> {
    load_checked(&dataset.folder, &dataset.pre_processed, |recording, path| {
        check_recording(recording, path, dataset)
    })
}

/// Check one recording against the dataset section
pub fn check_recording(recording: &RawRecording, path: &Path, dataset: &DatasetSpec) -> Result<()> {
    if (recording.sample_rate - dataset.sr).abs() > dataset.sr * 1e-4 {
        return Err(Error::data(
            path,
            format!(
                "sampled at {} Hz, dataset.sr is {} Hz",
                recording.sample_rate, dataset.sr
            ),
        ));
    }
    if let Some(missing) = (0..dataset.num_sbjs).find(|&s| recording.subject(s).is_none()) {
        return Err(Error::data(
            path,
            format!("subject {missing} missing, dataset.num_sbjs is {}", dataset.num_sbjs),
        ));
    }
    Ok(())
}

fn load_checked(
    folder: &str,
    source: &DataSource,
    check: impl Fn(&RawRecording, &Path) -> Result<()>,
) -> Result<Sources> {
    let load = |file: &PathBuf| -> Result<RawRecording> {
        let path = resolve_path(folder, file);
        let recording = load_recording(&path)?;
        check(&recording, &path)?;
        tracing::info!(
            path = %path.display(),
            subjects = recording.subjects.len(),
            epochs = recording.n_epochs(),
            "recording loaded"
        );
        Ok(recording)
    };

    match source {
        DataSource::Single(file) => Ok(Sources::single(load(file)?)),
        DataSource::Mixed(files) => {
            if files.is_empty() {
                return Err(Error::ConfigError(
                    "dataset.pre_processed list is empty".to_string(),
                ));
            }
            let recordings = files.iter().map(load).collect::<Result<Vec<_>>>()?;
            Ok(Sources::mixed(recordings))
        }
    }
}
