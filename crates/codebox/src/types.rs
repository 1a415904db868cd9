use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Wall clock deadline per process in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Memory ceiling in megabytes, passed to the program through the
    /// `{memory}` command placeholder
    #[serde(default)]
    pub memory_limit: Option<u64>,

    /// Maximum captured size of each output stream in kilobytes
    #[serde(default)]
    pub max_output: Option<u64>,
}

impl ResourceLimits {
    /// 1 megabyte in kilobytes
    pub const MB: u64 = 1024;

    /// Create new resource limits with the default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create resource limits with every field unset
    pub fn unset() -> Self {
        Self {
            timeout_ms: None,
            memory_limit: None,
            max_output: None,
        }
    }

    /// Set the wall clock deadline in milliseconds
    pub fn with_timeout_ms(mut self, millis: u64) -> Self {
        self.timeout_ms = Some(millis);
        self
    }

    /// Set the memory ceiling in megabytes
    pub fn with_memory_limit(mut self, mb: u64) -> Self {
        self.memory_limit = Some(mb);
        self
    }

    /// Set the maximum captured output size in kilobytes
    pub fn with_max_output(mut self, kb: u64) -> Self {
        self.max_output = Some(kb);
        self
    }

    /// Apply overrides from another ResourceLimits, preferring values from `overrides`
    ///
    /// Returns a new ResourceLimits with values from `overrides` taking precedence
    /// over values from `self` when both are present.
    pub fn with_overrides(&self, overrides: &ResourceLimits) -> ResourceLimits {
        ResourceLimits {
            timeout_ms: overrides.timeout_ms.or(self.timeout_ms),
            memory_limit: overrides.memory_limit.or(self.memory_limit),
            max_output: overrides.max_output.or(self.max_output),
        }
    }

    /// Captured output cap in bytes
    pub fn max_output_bytes(&self) -> Option<usize> {
        self.max_output
            .map(|kb| usize::try_from(kb.saturating_mul(1024)).unwrap_or(usize::MAX))
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            timeout_ms: Some(10_000),
            memory_limit: Some(256),
            max_output: Some(64 * Self::MB), // 64 MB
        }
    }
}

/// A submission to run through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Source code of the submission
    pub code: String,

    /// Language ID as configured in [`Config::languages`](crate::Config)
    pub language: String,

    /// Inputs, one run per entry
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Per-request limit overrides
    #[serde(default)]
    pub limits: Option<ResourceLimits>,
}

impl ExecutionRequest {
    pub fn new(
        code: impl Into<String>,
        language: impl Into<String>,
        inputs: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
            inputs: inputs.into_iter().map(Into::into).collect(),
            limits: None,
        }
    }

    /// Attach per-request limit overrides
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = Some(limits);
        self
    }
}

/// Captured result of a single run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Exit code if the program terminated on its own
    pub exit_code: Option<i32>,

    /// Signal number if the program was killed by a signal
    pub signal: Option<i32>,

    /// Standard output
    pub stdout: String,

    /// Standard error, populated on non-zero exit, timeout or launch failure
    pub stderr: String,

    /// Wall clock time of the run in milliseconds
    pub elapsed_ms: u64,

    /// Whether the run was killed at its deadline
    pub timed_out: bool,

    /// Whether the program could not be launched at all
    pub spawn_failed: bool,

    /// Whether output was cut at the cap or left unread behind an open pipe
    #[serde(default)]
    pub output_incomplete: bool,
}

impl ExecutionOutcome {
    /// Outcome for a program that could not be launched
    pub fn spawn_failure(message: impl Into<String>) -> Self {
        Self {
            stderr: message.into(),
            spawn_failed: true,
            ..Default::default()
        }
    }

    /// Whether this run halts aggregation
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !self.stderr.is_empty()
    }
}

/// Aggregate status of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Compiled and every run exited cleanly
    Success,

    /// Compilation failed, or a run failed or timed out
    RuntimeError,

    /// The pipeline itself failed; not attributable to the submission
    SandboxError,
}

impl ExecutionStatus {
    /// Numeric code used by judge services consuming the response
    pub fn code(&self) -> u8 {
        match self {
            ExecutionStatus::Success => 1,
            ExecutionStatus::SandboxError => 2,
            ExecutionStatus::RuntimeError => 3,
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::RuntimeError => "RUNTIME_ERROR",
            ExecutionStatus::SandboxError => "SANDBOX_ERROR",
        };
        f.write_str(name)
    }
}

/// Final result of a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResponse {
    /// Stdout of each run before the first failing one
    pub outputs: Vec<String>,

    pub status: ExecutionStatus,

    /// Compiler diagnostics, stderr of the first failing run, or the
    /// internal error description
    pub message: Option<String>,

    /// Largest elapsed time over the runs that were aggregated
    pub max_time_ms: u64,

    /// Every outcome that was aggregated, in input order
    pub outcomes: Vec<ExecutionOutcome>,

    /// Whether the compile stage passed (or was not needed)
    pub compiled: bool,
}

impl ExecutionResponse {
    /// Response for a submission that failed to compile
    pub fn compile_failed(diagnostics: impl Into<String>) -> Self {
        Self {
            outputs: Vec::new(),
            status: ExecutionStatus::RuntimeError,
            message: Some(diagnostics.into()),
            max_time_ms: 0,
            outcomes: Vec::new(),
            compiled: false,
        }
    }

    /// Response for an internal failure of the pipeline
    pub fn sandbox_error(message: impl Into<String>) -> Self {
        Self {
            outputs: Vec::new(),
            status: ExecutionStatus::SandboxError,
            message: Some(message.into()),
            max_time_ms: 0,
            outcomes: Vec::new(),
            compiled: false,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    /// Whether any aggregated run hit its deadline
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.outcomes.iter().any(|outcome| outcome.timed_out)
    }
}
