//! Compilation step for code execution
//!
//! Handles compiling the staged source with the language's compiler.

use std::time::Duration;

use tracing::{debug, instrument};

use crate::config::{CommandContext, Language};
use crate::process::{ProcessCommand, run_with_deadline};
use crate::runner::CompileError;
use crate::types::ResourceLimits;
use crate::workspace::Workspace;

/// Result of a compilation
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// Whether compilation succeeded
    pub success: bool,

    /// Compiler exit code, absent if it was killed
    pub exit_code: Option<i32>,

    /// Compiler output: stdout, then stderr
    pub output: String,

    pub duration_ms: u64,

    /// Whether the compiler hit its deadline
    pub timed_out: bool,
}

/// Default compilation limits
fn default_compile_limits() -> ResourceLimits {
    ResourceLimits {
        timeout_ms: Some(30_000),
        memory_limit: None,
        max_output: Some(ResourceLimits::MB), // 1 MB of diagnostics
    }
}

/// Compile the workspace's source file
///
/// Limits are layered: built-in compile defaults, then the language's compile
/// limits, then `limits`.
#[instrument(skip_all, fields(language = %language.name, workspace = %workspace.id()))]
pub async fn compile(
    workspace: &Workspace,
    language: &Language,
    limits: Option<&ResourceLimits>,
) -> Result<CompileResult, CompileError> {
    let compile_config = language
        .compile
        .as_ref()
        .ok_or_else(|| CompileError::NotCompiled(language.name.clone()))?;

    let base_limits = default_compile_limits();
    let lang_limits = compile_config.limits.as_ref();
    let effective_limits = match (limits, lang_limits) {
        (Some(user), Some(lang)) => base_limits.with_overrides(lang).with_overrides(user),
        (Some(user), None) => base_limits.with_overrides(user),
        (None, Some(lang)) => base_limits.with_overrides(lang),
        (None, None) => base_limits,
    };
    let timeout_ms = effective_limits.timeout_ms.unwrap_or(30_000);

    let dir = workspace.path().to_string_lossy();
    let argv = Language::expand_command(
        &compile_config.command,
        &CommandContext {
            source: &compile_config.source_name,
            binary: &compile_config.output_name,
            dir: &dir,
            memory: effective_limits.memory_limit,
        },
    );

    let command = ProcessCommand::from_argv(argv)?
        .working_dir(workspace.path())
        .env_inherit("PATH")
        .env("HOME", &*dir)
        .envs(&compile_config.env)
        .max_output(effective_limits.max_output_bytes());

    debug!(program = command.program(), args = ?command.get_args(), timeout_ms, "compiling");

    let result = run_with_deadline(&command, Duration::from_millis(timeout_ms)).await?;

    let mut output = join_output(&result.stdout, &result.stderr);
    if result.timed_out {
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str(&format!("compilation timed out after {timeout_ms} ms"));
    } else if output.is_empty()
        && let Some(code) = result.exit_code.filter(|&code| code != 0)
    {
        output = format!("compiler exited with code {code}");
    }

    let success = result.is_success();

    debug!(
        success,
        exit_code = ?result.exit_code,
        duration_ms = result.elapsed_ms(),
        timed_out = result.timed_out,
        "compilation complete"
    );

    Ok(CompileResult {
        success,
        exit_code: result.exit_code,
        output,
        duration_ms: result.elapsed_ms(),
        timed_out: result.timed_out,
    })
}

/// stdout and stderr, separated by a newline when both are present
fn join_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    match (stdout.is_empty(), stderr.is_empty()) {
        (false, false) => format!("{stdout}\n{stderr}"),
        (false, true) => stdout.into_owned(),
        (true, _) => stderr.into_owned(),
    }
}
