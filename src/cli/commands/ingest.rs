//! Ingest command: run raw message files through parse → classify → upsert.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::classify::FieldClassifier;
use crate::cli::IngestArgs;
use crate::config::{self, CliOverrides};
use crate::error::{BugmailError, Result};
use crate::ingest::{IngestPipeline, PreparedMessage};
use crate::output::OutputContext;

#[derive(Debug, Serialize)]
struct FileResult {
    file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    bug_id: Option<String>,
    /// `created`, `updated`, `classified` (dry run) or `failed`.
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    modification_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<PreparedMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Execute the ingest command.
///
/// Each file is handled independently; one bad file does not stop the rest.
///
/// # Errors
///
/// Returns an error if the workspace cannot be opened, or a validation error
/// after processing when any file failed.
pub fn execute(args: &IngestArgs, ctx: &OutputContext, cli: &CliOverrides) -> Result<()> {
    let (workspace_dir, mut storage) = super::open_workspace(cli)?;
    let layer = config::load_config(&workspace_dir, Some(&storage), cli)?;
    let settings = config::poll_settings_from_layer(&layer)?;
    let policy = config::classifier_policy_from_layer(&layer);
    let pipeline = IngestPipeline::new(FieldClassifier::new(policy), &settings.actor);

    let mut results = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let result = match ingest_file(&pipeline, &mut storage, file, args.dry_run) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(file = %file.display(), error = %err, "Failed to ingest file");
                FileResult {
                    file: file.clone(),
                    bug_id: None,
                    action: "failed",
                    modification_count: None,
                    message: None,
                    error: Some(err.to_string()),
                }
            }
        };
        results.push(result);
    }

    if ctx.is_json() {
        ctx.json(&results)?;
    } else {
        for result in &results {
            let bug_id = result.bug_id.as_deref().unwrap_or("-");
            match (&result.error, &result.message) {
                (Some(err), _) => ctx.warning(&format!("{}: {err}", result.file.display())),
                (None, Some(message)) => ctx.print(&format!(
                    "{}: {bug_id} would be {} / {}",
                    result.file.display(),
                    message.classification.status,
                    message.classification.priority
                )),
                (None, None) => ctx.print(&format!(
                    "{}: {bug_id} {} (modifications: {})",
                    result.file.display(),
                    result.action,
                    result.modification_count.unwrap_or(0)
                )),
            }
        }
    }

    let failed = results.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        return Err(BugmailError::validation(
            "files",
            format!("{failed} of {} message(s) could not be ingested", results.len()),
        ));
    }
    Ok(())
}

fn ingest_file(
    pipeline: &IngestPipeline,
    storage: &mut crate::storage::SqliteStorage,
    file: &Path,
    dry_run: bool,
) -> Result<FileResult> {
    let raw = fs::read(file)?;
    let prepared = pipeline.prepare(&raw)?;

    if dry_run {
        return Ok(FileResult {
            file: file.to_path_buf(),
            bug_id: Some(prepared.bug_id.clone()),
            action: "classified",
            modification_count: None,
            message: Some(prepared),
            error: None,
        });
    }

    let outcome = pipeline.commit(storage, &prepared)?;
    tracing::info!(
        file = %file.display(),
        bug_id = %outcome.bug.bug_id,
        action = outcome.action(),
        "Ingested message"
    );
    Ok(FileResult {
        file: file.to_path_buf(),
        bug_id: Some(outcome.bug.bug_id.clone()),
        action: outcome.action(),
        modification_count: Some(outcome.bug.modification_count),
        message: None,
        error: None,
    })
}
