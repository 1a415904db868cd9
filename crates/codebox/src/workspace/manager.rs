//! Workspace lifecycle management

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::workspace::WorkspaceError;

/// Creates workspaces under a fixed root directory
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the directory workspaces are created in
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh workspace and write `code` into `source_name`
    ///
    /// The root is created if missing. If writing the source fails the
    /// half-staged directory is removed before the error is returned.
    #[instrument(skip(self, code), fields(root = %self.root.display()))]
    pub async fn stage(&self, code: &str, source_name: &str) -> Result<Workspace, WorkspaceError> {
        validate_name(source_name)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| WorkspaceError::RootUnavailable {
                path: self.root.clone(),
                source,
            })?;
        let root = std::path::absolute(&self.root).map_err(|source| {
            WorkspaceError::RootUnavailable {
                path: self.root.clone(),
                source,
            }
        })?;

        let id = Uuid::new_v4();
        let path = root.join(id.to_string());

        // create_dir, not create_dir_all: an existing directory is never reused
        tokio::fs::create_dir(&path)
            .await
            .map_err(|source| WorkspaceError::CreateFailed {
                path: path.clone(),
                source,
            })?;

        let mut workspace = Workspace {
            id,
            source_path: path.join(source_name),
            path,
            destroyed: false,
        };

        if let Err(source) = tokio::fs::write(&workspace.source_path, code).await {
            let error = WorkspaceError::WriteFailed {
                path: workspace.source_path.clone(),
                source,
            };
            let _ = workspace.destroy().await;
            return Err(error);
        }

        debug!(%id, source = source_name, len = code.len(), "workspace staged");
        Ok(workspace)
    }
}

/// A staged workspace
///
/// Owned by exactly one submission. Call [`destroy()`](Self::destroy) when
/// the submission is finished; a workspace dropped without it (cancelled
/// request, panic) removes its directory synchronously in `Drop`.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    path: PathBuf,
    source_path: PathBuf,
    destroyed: bool,
}

impl Workspace {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get the workspace directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the path of the staged source file
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Get the path to a file inside the workspace
    ///
    /// Returns an error if the path contains path traversal attempts.
    pub fn file_path(&self, name: &str) -> Result<PathBuf, WorkspaceError> {
        validate_name(name)?;
        Ok(self.path.join(name))
    }

    /// Check if a file exists in the workspace
    pub async fn file_exists(&self, name: &str) -> Result<bool, WorkspaceError> {
        let path = self.file_path(name)?;
        Ok(tokio::fs::metadata(&path).await.is_ok())
    }

    /// Whether [`destroy()`](Self::destroy) has run
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Recursively remove the workspace directory
    ///
    /// Idempotent and infallible: failures are logged and reported as `false`.
    /// The removal is attempted once; later calls return `true` without
    /// touching the filesystem.
    #[must_use = "a failed removal leaves files behind"]
    #[instrument(skip(self), fields(id = %self.id))]
    pub async fn destroy(&mut self) -> bool {
        if self.destroyed {
            return true;
        }
        self.destroyed = true;

        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => {
                debug!("workspace removed");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to remove workspace");
                false
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.destroyed {
            return;
        }

        warn!(
            id = %self.id,
            path = %self.path.display(),
            "workspace dropped without destroy(), removing synchronously"
        );
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove workspace"),
        }
    }
}

fn validate_name(name: &str) -> Result<(), WorkspaceError> {
    if name.is_empty() || name.contains("..") || name.starts_with('/') {
        return Err(WorkspaceError::InvalidPath(format!(
            "path traversal not allowed: {name:?}"
        )));
    }
    Ok(())
}
