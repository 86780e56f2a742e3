//! Generator configuration.
//!
//! Every field has a default, so an empty YAML document is a valid config.
//! Command-line flags are applied on top of a loaded file.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::codegen::is_identifier;
use crate::errors::{unspanned, ErrorKind, ErrorReporting, PhaseContext, TestgenError};

/// How test cases share the instance under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceMode {
    /// One test method per case, each with a fresh instance from `setUp`.
    #[default]
    Isolated,
    /// One test method per documented method; its cases run as subtests on
    /// a single instance and may observe each other's state changes.
    Shared,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Restrict generation to one class (plain or dotted name).
    pub class_filter: Option<String>,
    pub instance_mode: InstanceMode,
    /// Attribute holding the instance under test, `self.<fixture_name>`.
    pub fixture_name: String,
    /// Module to import from; defaults to the source file stem.
    pub module_name: Option<String>,
    /// Precede each case with a comment quoting its docstring line.
    pub emit_source_comments: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            class_filter: None,
            instance_mode: InstanceMode::Isolated,
            fixture_name: "instance".to_string(),
            module_name: None,
            emit_source_comments: true,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("fixture_name '{0}' is not a Python identifier")]
    InvalidFixture(String),
    #[error("module_name '{0}' is not a dotted Python module path")]
    InvalidModule(String),
}

impl GeneratorConfig {
    /// Loads and validates a YAML config file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, TestgenError> {
        let path = path.as_ref();
        let ctx = PhaseContext::detached("config");
        let display = path.display().to_string();

        let text = fs::read_to_string(path).map_err(|e| {
            ctx.report(
                ErrorKind::Io {
                    operation: "read config".into(),
                    path: display.clone(),
                    reason: e.to_string(),
                },
                unspanned(),
            )
        })?;

        let invalid = |reason: String| {
            ctx.report(
                ErrorKind::InvalidConfig {
                    path: display.clone(),
                    reason,
                },
                unspanned(),
            )
        };
        // An empty document deserializes as null rather than a mapping.
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&text).map_err(|e| invalid(e.to_string()))?
        };
        config.validate().map_err(|e| invalid(e.to_string()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_identifier(&self.fixture_name) {
            return Err(ConfigError::InvalidFixture(self.fixture_name.clone()));
        }
        if let Some(module) = &self.module_name {
            if !module.split('.').all(is_identifier) {
                return Err(ConfigError::InvalidModule(module.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_overrides_defaults() {
        let config: GeneratorConfig =
            serde_yaml::from_str("instance_mode: shared\nfixture_name: calc\n").unwrap();
        assert_eq!(config.instance_mode, InstanceMode::Shared);
        assert_eq!(config.fixture_name, "calc");
        assert!(config.emit_source_comments);
        assert_eq!(config.class_filter, None);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_yaml::from_str::<GeneratorConfig>("fixture: x\n").is_err());
    }

    #[test]
    fn validation_checks_identifiers() {
        let mut config = GeneratorConfig::default();
        assert_eq!(config.validate(), Ok(()));
        config.fixture_name = "not valid".into();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidFixture("not valid".into()))
        );
        config.fixture_name = "obj".into();
        config.module_name = Some("pkg.calc".into());
        assert_eq!(config.validate(), Ok(()));
        config.module_name = Some("pkg..calc".into());
        assert!(config.validate().is_err());
    }
}
