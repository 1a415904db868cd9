//! Per-submission scratch directories
//!
//! Every submission gets its own directory under the configured workspace
//! root, named by a fresh UUID. The directory holds the source file and the
//! build artifacts and is removed when the submission finishes.

use std::path::PathBuf;

use thiserror::Error;

pub use crate::workspace::manager::{Workspace, WorkspaceManager};

mod manager;

/// Errors that occur while staging a workspace
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace root {path}: {source}")]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create workspace {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid path: {0}")]
    InvalidPath(String),
}
