//! A library for judging code submissions.
//!
//! codebox takes a source file, a language tag and a list of test inputs,
//! compiles the source in a throwaway workspace, runs the program once per
//! input under a wall-clock deadline, and folds the results into a single
//! verdict.
//!
//! # Features
//!
//! - **Isolated workspaces**: every submission gets its own UUID-named directory, removed on every exit path.
//! - **Multi-language**: supports both compiled and interpreted languages.
//! - **TOML configuration**: flexible per-language compiler/runtime settings.
//! - **Deadlines**: runs race a timer and are killed with their whole process group.
//! - **Bounded parallelism**: inputs run concurrently and are reported in input order.

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, InputMode, Language};
pub use process::{ProcessCommand, ProcessError, ProcessOutput, run_with_deadline};
pub use runner::{CompileError, CompileResult, ExecuteError, RunSpec, Runner, RunnerError};
pub use types::{
    ExecutionOutcome, ExecutionRequest, ExecutionResponse, ExecutionStatus, ResourceLimits,
};
pub use workspace::{Workspace, WorkspaceError, WorkspaceManager};

pub mod config;
pub mod process;
pub mod runner;
pub mod types;
pub mod workspace;
