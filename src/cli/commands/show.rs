//! Show command implementation.

use crate::cli::ShowArgs;
use crate::config::CliOverrides;
use crate::error::{BugmailError, Result};
use crate::format::{BugDetails, format_bug_details};
use crate::output::OutputContext;

/// Execute the show command.
///
/// # Errors
///
/// Returns `BugNotFound` for the first identifier that does not exist.
pub fn execute(args: &ShowArgs, ctx: &OutputContext, cli: &CliOverrides) -> Result<()> {
    let (_workspace_dir, storage) = super::open_workspace(cli)?;

    let mut details_list = Vec::with_capacity(args.ids.len());
    for id in &args.ids {
        let bug = storage
            .get_bug(id)?
            .ok_or_else(|| BugmailError::BugNotFound { id: id.clone() })?;
        let events = if args.events == 0 {
            Vec::new()
        } else {
            storage.get_events(id, args.events)?
        };
        details_list.push(BugDetails { bug, events });
    }

    if ctx.is_json() {
        return ctx.json(&details_list);
    }
    for (i, details) in details_list.iter().enumerate() {
        if i > 0 {
            ctx.print("");
        }
        ctx.print(format_bug_details(details, ctx.use_color()).trim_end());
    }
    Ok(())
}
