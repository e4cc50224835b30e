//! Mark command: bulk status change.

use serde::Serialize;

use crate::cli::MarkArgs;
use crate::config::{CliOverrides, resolve_admin_actor};
use crate::error::Result;
use crate::model::Status;
use crate::output::OutputContext;

#[derive(Serialize)]
struct MarkOutput {
    status: Status,
    updated: Vec<String>,
}

/// Execute the mark command.
///
/// Each identifier is changed in its own transaction; the first unknown
/// identifier stops the command, leaving earlier ones changed.
///
/// # Errors
///
/// Returns `InvalidStatus` for an unknown status and `BugNotFound` for an
/// unknown identifier.
pub fn execute(args: &MarkArgs, ctx: &OutputContext, cli: &CliOverrides) -> Result<()> {
    let status: Status = args.status.parse()?;
    let (_workspace_dir, mut storage) = super::open_workspace(cli)?;
    let actor = resolve_admin_actor(cli);

    let mut updated = Vec::with_capacity(args.ids.len());
    for id in &args.ids {
        let bug = storage.set_status(id, status, &actor)?;
        tracing::info!(bug_id = %bug.bug_id, status = %status, actor = %actor, "Marked bug");
        if !ctx.is_json() {
            ctx.success(&format!("{} marked {}", bug.bug_id, status.label()));
        }
        updated.push(bug.bug_id);
    }

    if ctx.is_json() {
        return ctx.json(&MarkOutput { status, updated });
    }
    Ok(())
}
