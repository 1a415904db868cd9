//! Child process plumbing
//!
//! This module provides the process-spawn primitive the pipeline is built
//! on: a command builder and a deadline-bounded runner that drains both output
//! streams while the child runs and kills the child's whole process group when
//! the deadline fires.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use crate::process::command::ProcessCommand;
pub use crate::process::spawn::{ProcessOutput, run_with_deadline};

mod command;
mod spawn;

/// Errors that occur while launching or supervising a child process
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("empty command")]
    EmptyCommand,

    #[error("failed to spawn '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("child process has no {0} pipe")]
    MissingPipe(&'static str),

    #[error("output drain task failed: {0}")]
    Join(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolve a program name to an absolute path using the host's PATH.
///
/// Programs that already contain a `/` are returned as-is if they exist.
pub fn resolve_program(program: &str) -> Option<PathBuf> {
    if program.contains('/') {
        let path = Path::new(program);
        return path.exists().then(|| path.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
