//! Integration tests for codebox
//!
//! Most tests use languages backed by POSIX `sh` (see
//! `tests/fixtures/configs/shell.toml`) and run wherever `sh` is installed.
//! Tests that need a JDK are behind the `integration-tests` feature:
//!    cargo test -p codebox --features integration-tests

use std::fs;
use std::path::Path;

use codebox::{Config, Runner};

mod cleanup;
mod config_loading;
#[cfg(feature = "integration-tests")]
mod java;

const FIXTURES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

/// Helper to get fixture file content
#[cfg_attr(not(feature = "integration-tests"), allow(dead_code))]
pub(crate) fn fixture_source(name: &str) -> String {
    let path = format!("{FIXTURES_PATH}/sources/{name}");
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}"))
}

/// Load the sh-backed test languages with workspaces under `root`
pub(crate) fn shell_config(root: &Path) -> Config {
    let path = format!("{FIXTURES_PATH}/configs/shell.toml");
    let mut config = Config::from_file(&path).expect("Failed to load shell config");
    config.workspace_root = root.to_path_buf();
    config
}

pub(crate) fn shell_runner(root: &Path) -> Runner {
    Runner::new(shell_config(root))
}

/// Number of entries left under a workspace root
pub(crate) fn leftover_entries(root: &Path) -> usize {
    match fs::read_dir(root) {
        Ok(entries) => entries.count(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
        Err(e) => panic!("Failed to read {}: {e}", root.display()),
    }
}
