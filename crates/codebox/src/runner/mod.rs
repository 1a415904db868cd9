//! Code runner for codebox
//!
//! Provides the pipeline that takes a submission from source to response:
//! stage a workspace, compile, run every input under a deadline, aggregate,
//! and clean up.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, instrument};

pub use crate::runner::aggregate::aggregate;
pub use crate::runner::compile::{CompileResult, compile};
pub use crate::runner::execute::{RunSpec, TIME_LIMIT_EXCEEDED, run_one};

mod aggregate;
mod compile;
mod execute;

use crate::{
    config::{Config, ConfigError, Language},
    process::ProcessError,
    types::{ExecutionOutcome, ExecutionRequest, ExecutionResponse, ResourceLimits},
    workspace::{Workspace, WorkspaceError, WorkspaceManager},
};

/// Errors that occur during compilation
///
/// A compiler that runs and rejects the source is not an error; see
/// [`CompileResult::success`].
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("language '{0}' does not support compilation")]
    NotCompiled(String),

    #[error("compiler could not be run: {0}")]
    Process(#[from] ProcessError),
}

/// Errors that occur during execution
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("invalid run command: {0}")]
    Process(#[from] ProcessError),

    #[error("run task failed: {0}")]
    Join(String),

    #[error("run scheduler closed")]
    SchedulerClosed,
}

/// Errors that turn a submission into a sandbox error
///
/// This error type preserves which stage of the pipeline failed.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    /// Error during compilation phase
    #[error("compilation error: {0}")]
    Compile(#[from] CompileError),

    /// Error during execution phase (compilation succeeded)
    #[error("execution error: {0}")]
    Execute(#[from] ExecuteError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// High-level runner for code execution
#[derive(Debug, Clone)]
pub struct Runner {
    config: Arc<Config>,
    workspaces: WorkspaceManager,
}

impl Runner {
    /// Create a new runner with the given configuration
    pub fn new(config: Config) -> Self {
        Self {
            workspaces: WorkspaceManager::new(&config.workspace_root),
            config: Arc::new(config),
        }
    }

    /// Create a new runner with default configuration
    pub fn with_defaults() -> Self {
        Self::new(Config::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the workspace manager, for callers driving the stages themselves
    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Compile the source staged in `workspace`
    pub async fn compile(
        &self,
        workspace: &Workspace,
        language: &Language,
        limits: Option<&ResourceLimits>,
    ) -> Result<CompileResult, CompileError> {
        compile::compile(workspace, language, limits).await
    }

    /// Run the program in `workspace` once per input
    ///
    /// Up to [`Config::parallelism`] runs execute at once. Outcomes are
    /// returned in input order.
    pub async fn run(
        &self,
        workspace: &Workspace,
        language: &Language,
        inputs: &[String],
        limits: Option<&ResourceLimits>,
    ) -> Result<Vec<ExecutionOutcome>, ExecuteError> {
        let spec = RunSpec::prepare(workspace, &self.config, language, limits)?;
        run_all(Arc::new(spec), inputs, self.config.parallelism()).await
    }

    /// Take a submission through the whole pipeline
    ///
    /// Never fails: internal faults are reported as a
    /// [`SandboxError`](crate::ExecutionStatus::SandboxError) response. The
    /// workspace is removed before this returns, or on drop if the future is
    /// cancelled.
    #[instrument(skip_all, fields(language = %request.language, inputs = request.inputs.len()))]
    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionResponse {
        match self.try_execute(request).await {
            Ok(response) => {
                debug!(
                    status = %response.status,
                    outputs = response.outputs.len(),
                    max_time_ms = response.max_time_ms,
                    "submission finished"
                );
                response
            }
            Err(e) => {
                error!(error = %e, "sandbox error");
                ExecutionResponse::sandbox_error(e.to_string())
            }
        }
    }

    async fn try_execute(&self, request: &ExecutionRequest) -> Result<ExecutionResponse, RunnerError> {
        if request.code.is_empty() {
            return Err(RunnerError::InvalidRequest("source code is empty".to_owned()));
        }
        let language = self.config.get_language(&request.language)?;

        let mut workspace = self
            .workspaces
            .stage(&request.code, &language.source_name())
            .await?;
        debug!(workspace = %workspace.id(), "staged");

        let result = self.pipeline(&workspace, language, request).await;

        // failure is logged by destroy; the response stands either way
        let _ = workspace.destroy().await;
        result
    }

    async fn pipeline(
        &self,
        workspace: &Workspace,
        language: &Language,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResponse, RunnerError> {
        if language.is_compiled() {
            let compiled = self.compile(workspace, language, None).await?;
            if !compiled.success {
                debug!(exit_code = ?compiled.exit_code, timed_out = compiled.timed_out, "compilation failed");
                return Ok(ExecutionResponse::compile_failed(compiled.output));
            }
            debug!(duration_ms = compiled.duration_ms, "compiled");
        }

        let outcomes = self
            .run(workspace, language, &request.inputs, request.limits.as_ref())
            .await?;
        Ok(aggregate(outcomes))
    }
}

/// Run every input on a bounded set of tasks, keeping input order
///
/// Dropping the returned future aborts the outstanding runs.
async fn run_all(
    spec: Arc<RunSpec>,
    inputs: &[String],
    parallelism: usize,
) -> Result<Vec<ExecutionOutcome>, ExecuteError> {
    let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
    let mut tasks = JoinSet::new();

    for (index, input) in inputs.iter().cloned().enumerate() {
        let spec = Arc::clone(&spec);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| ExecuteError::SchedulerClosed)?;
            Ok::<_, ExecuteError>((index, run_one(&spec, &input).await))
        });
    }

    let mut slots: Vec<Option<ExecutionOutcome>> = vec![None; inputs.len()];
    while let Some(joined) = tasks.join_next().await {
        let (index, outcome) = joined.map_err(|e| ExecuteError::Join(e.to_string()))??;
        slots[index] = Some(outcome);
    }

    slots
        .into_iter()
        .map(|slot| slot.ok_or_else(|| ExecuteError::Join("run produced no outcome".to_owned())))
        .collect()
}
