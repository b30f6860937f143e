//! Config loading, validation, and CLI overrides.

use super::model::Config;
use super::types::{OutputFormat, UnknownLabelPolicy};
use crate::error::{Result, TreeLockError};
use std::path::{Path, PathBuf};

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            TreeLockError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // serde_yaml reads an empty document as null rather than an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| TreeLockError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| TreeLockError::Config(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - `journal`, when set, must be a non-empty path that is not an existing directory
    pub fn validate(&self) -> Result<()> {
        if let Some(journal) = &self.journal {
            if journal.as_os_str().is_empty() {
                return Err(TreeLockError::Config(
                    "config validation failed: journal must not be an empty path".to_string(),
                ));
            }
            if journal.is_dir() {
                return Err(TreeLockError::Config(format!(
                    "config validation failed: journal '{}' is a directory",
                    journal.display()
                )));
            }
        }

        Ok(())
    }

    /// Apply command-line overrides on top of file values, then re-validate.
    pub fn with_overrides(
        mut self,
        on_unknown_label: Option<UnknownLabelPolicy>,
        output_format: Option<OutputFormat>,
        journal: Option<PathBuf>,
        audit: bool,
    ) -> Result<Self> {
        if let Some(policy) = on_unknown_label {
            self.on_unknown_label = policy;
        }
        if let Some(format) = output_format {
            self.output_format = format;
        }
        if journal.is_some() {
            self.journal = journal;
        }
        self.audit |= audit;

        self.validate()?;
        Ok(self)
    }
}
