use crate::config::{CONFIG_FILENAME, DEFAULT_DB_FILENAME, WORKSPACE_DIR_NAME, config_template};
use crate::error::{BugmailError, Result};
use crate::output::OutputContext;
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct InitOutput {
    workspace: PathBuf,
    db: PathBuf,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns an error if the directory or database cannot be created, or if a
/// database already exists and `force` is not set.
pub fn execute(force: bool, root_dir: Option<&Path>, ctx: &OutputContext) -> Result<()> {
    let base_dir = root_dir.unwrap_or_else(|| Path::new("."));
    let workspace_dir = base_dir.join(WORKSPACE_DIR_NAME);
    let db_path = workspace_dir.join(DEFAULT_DB_FILENAME);

    if workspace_dir.exists() {
        if db_path.exists() {
            if !force {
                return Err(BugmailError::AlreadyInitialized { path: db_path });
            }
            remove_database(&db_path)?;
        }
    } else {
        fs::create_dir(&workspace_dir)?;
    }

    // Opening creates the file and applies the schema.
    SqliteStorage::open(&db_path)?;

    let config_path = workspace_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        fs::write(config_path, config_template())?;
    }

    let gitignore_path = workspace_dir.join(".gitignore");
    if !gitignore_path.exists() {
        let gitignore = r"# Database
*.db
*.db-shm
*.db-wal

# Logs
*.log
";
        fs::write(gitignore_path, gitignore)?;
    }

    tracing::info!(path = %workspace_dir.display(), "Initialized workspace");
    if ctx.is_json() {
        return ctx.json(&InitOutput {
            workspace: workspace_dir,
            db: db_path,
        });
    }
    ctx.success(&format!("Initialized bugmail workspace in {WORKSPACE_DIR_NAME}/"));
    Ok(())
}

fn remove_database(db_path: &Path) -> Result<()> {
    fs::remove_file(db_path)?;
    for suffix in ["-wal", "-shm"] {
        let mut sidecar = db_path.as_os_str().to_owned();
        sidecar.push(suffix);
        let sidecar = PathBuf::from(sidecar);
        if sidecar.exists() {
            fs::remove_file(sidecar)?;
        }
    }
    Ok(())
}
