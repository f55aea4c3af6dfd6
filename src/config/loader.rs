//! Configuration loading and environment expansion

use super::registry::Registry;
use super::schema::ExperimentSpec;
use super::validate::validate_config;
use crate::error::{Error, Result};
use regex::{Captures, Regex};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(\w+)\}|\$(\w+)").expect("Invalid environment variable regex")
});

/// Expand `$VAR` and `${VAR}` from the environment
///
/// Unset variables are left as written.
pub fn expand_env(input: &str) -> String {
    ENV_VAR
        .replace_all(input, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Parse an experiment configuration from YAML text
pub fn parse_config(yaml: &str) -> Result<ExperimentSpec> {
    serde_yaml::from_str(yaml)
        .map_err(|e| Error::ConfigError(format!("Failed to parse YAML config: {e}")))
}

/// Load and validate an experiment configuration file
pub fn load_config<P: AsRef<Path>>(config_path: P, registry: &Registry) -> Result<ExperimentSpec> {
    let yaml_content = fs::read_to_string(config_path.as_ref()).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to read config file {}: {}",
            config_path.as_ref().display(),
            e
        ))
    })?;

    let spec = parse_config(&yaml_content)?;
    validate_config(&spec, registry)?;
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_expand_env_both_forms() {
        std::env::set_var("ATENCION_TEST_ROOT", "/data/eeg");
        assert_eq!(expand_env("$ATENCION_TEST_ROOT/x"), "/data/eeg/x");
        assert_eq!(expand_env("${ATENCION_TEST_ROOT}_v2"), "/data/eeg_v2");
    }

    #[test]
    fn test_expand_env_leaves_unset_untouched() {
        assert_eq!(
            expand_env("$ATENCION_SURELY_UNSET_VAR/x"),
            "$ATENCION_SURELY_UNSET_VAR/x"
        );
        assert_eq!(expand_env("plain/path"), "plain/path");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = load_config("/nonexistent/config.yaml", &Registry::with_defaults()).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "setup: [unclosed").unwrap();
        assert!(matches!(
            load_config(&path, &Registry::with_defaults()),
            Err(Error::ConfigError(_))
        ));
    }
}
