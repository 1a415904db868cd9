//! Execution step for code running
//!
//! Handles running the compiled or interpreted program once per input.

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{CommandContext, Config, InputMode, Language};
use crate::process::{ProcessCommand, ProcessOutput, run_with_deadline};
use crate::runner::ExecuteError;
use crate::types::{ExecutionOutcome, ResourceLimits};
use crate::workspace::Workspace;

/// Deadline used when no limit layer sets one
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Appended to stderr of a run killed at its deadline
pub const TIME_LIMIT_EXCEEDED: &str = "time limit exceeded";

/// Appended to stderr of a run whose output pipe outlived it
pub const STREAM_LEFT_OPEN: &str = "output stream left open by a background process";

/// Everything needed to launch one run, shared by all runs of a submission
#[derive(Debug, Clone)]
pub struct RunSpec {
    command: ProcessCommand,
    input_mode: InputMode,
    timeout: Duration,
    fail_on_stderr: bool,
}

impl RunSpec {
    /// Resolve the run command and limits for `language` in `workspace`
    ///
    /// Limits are layered: config defaults, then the language's run limits,
    /// then `limits`.
    pub fn prepare(
        workspace: &Workspace,
        config: &Config,
        language: &Language,
        limits: Option<&ResourceLimits>,
    ) -> Result<Self, ExecuteError> {
        let mut effective_limits = config.effective_limits(language.run.limits.as_ref());
        if let Some(user_limits) = limits {
            effective_limits = effective_limits.with_overrides(user_limits);
        }

        let source = language.source_name();
        let binary = language.binary_name();
        let dir = workspace.path().to_string_lossy();
        let argv = Language::expand_command(
            &language.run.command,
            &CommandContext {
                source: &source,
                binary: &binary,
                dir: &dir,
                memory: effective_limits.memory_limit,
            },
        );

        let command = ProcessCommand::from_argv(argv)?
            .working_dir(workspace.path())
            .env_inherit("PATH")
            .env("HOME", &*dir)
            .envs(&language.run.env)
            .max_output(effective_limits.max_output_bytes());

        Ok(Self {
            command,
            input_mode: language.run.input_mode,
            timeout: Duration::from_millis(effective_limits.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
            fail_on_stderr: config.fail_on_stderr,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Run the program once against `input`
///
/// Never fails: a program that cannot be launched yields an outcome with
/// `spawn_failed` set.
pub async fn run_one(spec: &RunSpec, input: &str) -> ExecutionOutcome {
    let command = match spec.input_mode {
        InputMode::Argument => spec.command.clone().arg(input),
        InputMode::Stdin => spec.command.clone().stdin(input),
    };

    match run_with_deadline(&command, spec.timeout).await {
        Ok(output) => into_outcome(output, spec),
        Err(e) => {
            warn!(program = command.program(), error = %e, "run could not be launched");
            ExecutionOutcome::spawn_failure(e.to_string())
        }
    }
}

fn into_outcome(output: ProcessOutput, spec: &RunSpec) -> ExecutionOutcome {
    if output.truncated {
        debug!(elapsed_ms = output.elapsed_ms(), "run output truncated");
    }
    let output_incomplete = output.truncated || output.stream_left_open;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if output.timed_out {
        append_line(&mut stderr, TIME_LIMIT_EXCEEDED);
        return ExecutionOutcome {
            exit_code: None,
            signal: output.signal,
            stdout,
            stderr,
            elapsed_ms: output.elapsed_ms(),
            timed_out: true,
            spawn_failed: false,
            output_incomplete,
        };
    }

    match (output.exit_code, output.signal) {
        (Some(0), _) => {
            if !spec.fail_on_stderr {
                stderr.clear();
            }
        }
        (Some(code), _) if stderr.is_empty() => {
            stderr = format!("process exited with code {code}");
        }
        (None, Some(signal)) if stderr.is_empty() => {
            stderr = format!("process terminated by signal {signal}");
        }
        (None, None) if stderr.is_empty() => {
            stderr = "process terminated abnormally".to_owned();
        }
        _ => {}
    }

    // Output read so far is kept, but the run cannot count as clean
    if output.stream_left_open {
        append_line(&mut stderr, STREAM_LEFT_OPEN);
    }

    ExecutionOutcome {
        exit_code: output.exit_code,
        signal: output.signal,
        stdout,
        stderr,
        elapsed_ms: output.elapsed_ms(),
        timed_out: false,
        spawn_failed: false,
        output_incomplete,
    }
}

fn append_line(stderr: &mut String, message: &str) {
    if !stderr.is_empty() && !stderr.ends_with('\n') {
        stderr.push('\n');
    }
    stderr.push_str(message);
}
