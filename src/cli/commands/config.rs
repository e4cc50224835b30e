//! Config command: inspect merged configuration and edit the DB layer.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::cli::ConfigCommands;
use crate::config::{
    self, CONFIG_FILENAME, CliOverrides, env_var_for_key, is_secret_key, is_startup_key,
    normalize_key, user_config_path,
};
use crate::error::{BugmailError, Result};
use crate::output::OutputContext;

const MASK: &str = "********";

#[derive(Serialize)]
struct PathsOutput {
    project: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<PathBuf>,
    db: PathBuf,
}

/// Execute a config subcommand.
///
/// # Errors
///
/// Returns a `Config` error for unknown keys, for startup keys on `set`, and
/// for `get` on a key with no value.
pub fn execute(command: &ConfigCommands, ctx: &OutputContext, cli: &CliOverrides) -> Result<()> {
    let (workspace_dir, mut storage) = super::open_workspace(cli)?;

    match command {
        ConfigCommands::Get { key } => {
            let layer = config::load_config(&workspace_dir, Some(&storage), cli)?;
            let key = normalize_key(key);
            let value = layer
                .get(&key)
                .ok_or_else(|| BugmailError::Config(format!("{key} is not set")))?;
            if ctx.is_json() {
                return ctx.json(&BTreeMap::from([(key, value.clone())]));
            }
            ctx.print(value);
        }
        ConfigCommands::Set { key, value } => {
            let key = checked_runtime_key(key)?;
            storage.set_config(&key, value)?;
            tracing::info!(key = %key, actor = %config::resolve_admin_actor(cli), "Config key set");
            if ctx.is_json() {
                return ctx.json(&BTreeMap::from([(key, value.clone())]));
            }
            ctx.success(&format!("Set {key} = {value}"));
        }
        ConfigCommands::Unset { key } => {
            let key = normalize_key(key);
            let removed = storage.delete_config(&key)?;
            if ctx.is_json() {
                return ctx.json(&serde_json::json!({ "key": key, "removed": removed }));
            }
            if removed {
                ctx.success(&format!("Removed {key}"));
            } else {
                ctx.print(&format!("{key} was not set in the database"));
            }
        }
        ConfigCommands::List => {
            let layer = config::load_config(&workspace_dir, Some(&storage), cli)?;
            let entries: BTreeMap<String, String> = layer
                .entries()
                .into_iter()
                .map(|(k, v)| {
                    let shown = if is_secret_key(&k) { MASK.to_string() } else { v };
                    (k, shown)
                })
                .collect();
            if ctx.is_json() {
                return ctx.json(&entries);
            }
            for (key, value) in &entries {
                ctx.print(&format!("{key} = {value}"));
            }
        }
        ConfigCommands::Path => {
            let (_, paths) = config::open_storage(&workspace_dir, cli)?;
            let output = PathsOutput {
                project: workspace_dir.join(CONFIG_FILENAME),
                user: user_config_path(),
                db: paths.db_path,
            };
            if ctx.is_json() {
                return ctx.json(&output);
            }
            ctx.print(&format!("project: {}", output.project.display()));
            if let Some(user) = &output.user {
                ctx.print(&format!("user:    {}", user.display()));
            }
            ctx.print(&format!("db:      {}", output.db.display()));
        }
    }
    Ok(())
}

/// Only known runtime keys may live in the database.
fn checked_runtime_key(key: &str) -> Result<String> {
    let key = normalize_key(key);
    if is_startup_key(&key) {
        return Err(BugmailError::Config(format!(
            "{key} is read at startup; set it in .bugmail/config.yaml or {}",
            env_var_for_key(&key)
        )));
    }
    if !config::KNOWN_KEYS.contains(&key.as_str()) {
        return Err(BugmailError::Config(format!("unknown config key: {key}")));
    }
    Ok(key)
}
