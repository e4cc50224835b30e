//! Subcommand implementations.

pub mod classify;
pub mod completions;
pub mod config;
pub mod delete;
pub mod history;
pub mod ingest;
pub mod init;
pub mod list;
pub mod mark;
pub mod poll;
pub mod show;
pub mod stats;
pub mod version;
pub mod watch;

use std::path::PathBuf;

use crate::config::{CliOverrides, discover_workspace_dir, open_storage};
use crate::error::Result;
use crate::storage::SqliteStorage;

/// Locate the workspace and open its database.
pub(crate) fn open_workspace(cli: &CliOverrides) -> Result<(PathBuf, SqliteStorage)> {
    let workspace_dir = discover_workspace_dir(None)?;
    let (storage, _paths) = open_storage(&workspace_dir, cli)?;
    Ok((workspace_dir, storage))
}
