//! Configuration file loading for codebox
//!
//! Handles loading and parsing configuration files using the config crate.

use std::path::Path;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};

use crate::config::{Config, ConfigError, ENV_PREFIX};
use crate::types::ResourceLimits;

impl Config {
    /// Load configuration from a file
    ///
    /// Environment variables prefixed with `CODEBOX_` override file values,
    /// with `__` separating nested keys (`CODEBOX_DEFAULT_LIMITS__TIMEOUT_MS`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.workspace_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("workspace_root is empty".to_owned()));
        }
        if self.max_parallel_runs == Some(0) {
            return Err(ConfigError::Invalid(
                "max_parallel_runs must be at least 1".to_owned(),
            ));
        }
        validate_limits("default_limits", &self.default_limits)?;

        // Validate all languages have required fields
        for (id, lang) in &self.languages {
            if lang.name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty name"
                )));
            }
            if lang.extension.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty extension"
                )));
            }
            if lang.run.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty run command"
                )));
            }
            if let Some(ref limits) = lang.run.limits {
                validate_limits(&format!("language '{id}' run limits"), limits)?;
            }
            if let Some(ref compile) = lang.compile {
                if compile.command.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' has empty compile command"
                    )));
                }
                if !is_plain_file_name(&compile.source_name) {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' has invalid source_name '{}'",
                        compile.source_name
                    )));
                }
                if let Some(ref limits) = compile.limits {
                    validate_limits(&format!("language '{id}' compile limits"), limits)?;
                }
            }
        }

        Ok(())
    }
}

fn validate_limits(context: &str, limits: &ResourceLimits) -> Result<(), ConfigError> {
    if limits.timeout_ms == Some(0) {
        return Err(ConfigError::Invalid(format!(
            "{context}: timeout_ms must be greater than zero"
        )));
    }
    Ok(())
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && name != "." && name != ".."
}
