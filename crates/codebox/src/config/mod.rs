use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

pub use crate::config::language::{
    CommandContext, CompileConfig, FileExtension, InputMode, Language, RunConfig,
};
use crate::types::ResourceLimits;

pub mod language;
mod loader;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../codebox.example.toml");

/// Prefix of environment variables layered over a config file
pub const ENV_PREFIX: &str = "CODEBOX";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid characters in file extension")]
    InvalidFileExtChars,

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("language '{0}' not found in configuration")]
    LanguageNotFound(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for codebox
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory under which per-submission workspaces are created.
    ///
    /// Defaults to `codebox` inside the system temp directory.
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Maximum number of runs of one submission executing at once.
    ///
    /// Defaults to the number of available cores. `1` runs inputs sequentially.
    #[serde(default)]
    pub max_parallel_runs: Option<usize>,

    /// Treat stderr output from a run that exited with code 0 as a failure.
    ///
    /// When disabled, stderr of clean exits (JVM warnings and the like) is
    /// discarded.
    #[serde(default)]
    pub fail_on_stderr: bool,

    /// Default resource limits applied to all runs.
    /// This will be overridden if the language or the request specifies different limits
    #[serde(default)]
    pub default_limits: ResourceLimits,

    /// Language configurations keyed by language ID
    #[serde(default)]
    pub languages: HashMap<String, Language>,
}

impl Config {
    /// Create a new config with embedded default languages
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty config with no languages
    pub fn empty() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            max_parallel_runs: None,
            fail_on_stderr: false,
            default_limits: ResourceLimits::default(),
            languages: HashMap::new(),
        }
    }

    /// Get a language by ID
    pub fn get_language(&self, id: &str) -> Result<&Language, ConfigError> {
        self.languages
            .get(id)
            .ok_or_else(|| ConfigError::LanguageNotFound(id.to_string()))
    }

    /// Merge resource limits with defaults
    pub fn effective_limits(&self, overrides: Option<&ResourceLimits>) -> ResourceLimits {
        match overrides {
            Some(limits) => self.default_limits.with_overrides(limits),
            None => self.default_limits.clone(),
        }
    }

    /// Number of runs allowed to execute at once
    pub fn parallelism(&self) -> usize {
        self.max_parallel_runs
            .filter(|&n| n > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(NonZeroUsize::get)
                    .unwrap_or(1)
            })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("codebox")
}
