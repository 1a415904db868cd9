use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::config::ConfigError;
use crate::types::ResourceLimits;

const INVALID_FILE_EXT_CHARS: [char; 2] = ['/', '.'];

/// Configuration for a programming language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    /// Human-readable name for the language (e.g., "Java (OpenJDK)")
    pub name: String,

    /// File extension
    pub extension: FileExtension,

    /// Compilation configuration (None for interpreted languages)
    #[serde(default)]
    pub compile: Option<CompileConfig>,

    /// Execution configuration
    pub run: RunConfig,
}

/// Values substituted into command templates
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    /// Source file name, relative to the workspace
    pub source: &'a str,
    /// Build artifact name, relative to the workspace
    pub binary: &'a str,
    /// Absolute workspace directory
    pub dir: &'a str,
    /// Memory ceiling in megabytes
    pub memory: Option<u64>,
}

impl Language {
    /// Check if the language is compiled
    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }

    /// Get the source file name for this language
    pub fn source_name(&self) -> String {
        if let Some(ref compile) = self.compile {
            compile.source_name.clone()
        } else {
            format!("main.{}", self.extension)
        }
    }

    /// Get the name the run command refers to as `{binary}`
    pub fn binary_name(&self) -> String {
        match self.compile {
            Some(ref compile) => compile.output_name.clone(),
            None => self.source_name(),
        }
    }

    /// Expand placeholders in the given command
    ///
    /// Arguments mentioning `{memory}` are dropped when no memory limit applies.
    pub fn expand_command(command: &[String], ctx: &CommandContext<'_>) -> Vec<String> {
        command
            .iter()
            .filter_map(|arg| {
                let arg = if arg.contains("{memory}") {
                    arg.replace("{memory}", &ctx.memory?.to_string())
                } else {
                    arg.clone()
                };
                Some(
                    arg.replace("{source}", ctx.source)
                        .replace("{output}", ctx.binary)
                        .replace("{binary}", ctx.binary)
                        .replace("{dir}", ctx.dir),
                )
            })
            .collect()
    }
}

/// File extension without dot (e.g., "java")
#[derive(Debug, Clone, Serialize)]
pub struct FileExtension(String);

impl FileExtension {
    pub fn new(extension: &str) -> Result<Self, ConfigError> {
        let contains_invalid = extension
            .chars()
            .any(|c| INVALID_FILE_EXT_CHARS.contains(&c));
        if contains_invalid {
            return Err(ConfigError::InvalidFileExtChars);
        }
        Ok(Self(extension.to_owned()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for FileExtension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FileExtension::new(&s).map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a file extension without '/' or '.' characters",
            )
        })
    }
}

impl std::fmt::Display for FileExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for the compilation step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {output}, {dir}, {memory}
    pub command: Vec<String>,

    /// Source file name in the workspace (e.g., "Main.java")
    pub source_name: String,

    /// Output artifact name (e.g., "Main")
    pub output_name: String,

    /// Environment variables to set during compilation
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Resource limits for compilation (overrides defaults)
    #[serde(default)]
    pub limits: Option<ResourceLimits>,
}

/// How each input string reaches the program
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Passed as a single trailing command-line argument
    #[default]
    Argument,

    /// Written to standard input, which is then closed
    Stdin,
}

/// Configuration for the execution step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {binary}, {dir}, {memory}
    pub command: Vec<String>,

    /// Environment Variables to set
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Input delivery convention
    #[serde(default)]
    pub input_mode: InputMode,

    /// Resource limits for execution (overrides defaults)
    #[serde(default)]
    pub limits: Option<ResourceLimits>,
}
