//! Delete command implementation.

use serde::Serialize;

use crate::cli::DeleteArgs;
use crate::config::{CliOverrides, resolve_admin_actor};
use crate::error::Result;
use crate::output::OutputContext;

#[derive(Serialize)]
struct DeleteOutput {
    deleted: Vec<String>,
}

/// Execute the delete command.
///
/// # Errors
///
/// Returns `BugNotFound` for the first identifier that does not exist.
pub fn execute(args: &DeleteArgs, ctx: &OutputContext, cli: &CliOverrides) -> Result<()> {
    let (_workspace_dir, mut storage) = super::open_workspace(cli)?;
    let actor = resolve_admin_actor(cli);

    let mut deleted = Vec::with_capacity(args.ids.len());
    for id in &args.ids {
        let bug = storage.delete_bug(id, &actor)?;
        tracing::info!(bug_id = %bug.bug_id, actor = %actor, "Deleted bug");
        if !ctx.is_json() {
            ctx.success(&format!("Deleted {}: {}", bug.bug_id, bug.subject));
        }
        deleted.push(bug.bug_id);
    }

    if ctx.is_json() {
        return ctx.json(&DeleteOutput { deleted });
    }
    Ok(())
}
