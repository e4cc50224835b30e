//! History command: audit events of one bug, newest first.

use crate::cli::HistoryArgs;
use crate::config::CliOverrides;
use crate::error::{BugmailError, Result};
use crate::format::format_event_line;
use crate::output::OutputContext;

/// Execute the history command.
///
/// Deleted bugs keep their history, so an identifier is only unknown when it
/// has no events at all.
///
/// # Errors
///
/// Returns `BugNotFound` when the identifier has never been recorded.
pub fn execute(args: &HistoryArgs, ctx: &OutputContext, cli: &CliOverrides) -> Result<()> {
    let (_workspace_dir, storage) = super::open_workspace(cli)?;
    let events = storage.get_events(&args.id, args.limit)?;
    if events.is_empty() && storage.get_bug(&args.id)?.is_none() {
        return Err(BugmailError::BugNotFound {
            id: args.id.clone(),
        });
    }

    if ctx.is_json() {
        return ctx.json(&events);
    }
    ctx.print(&format!("History of {} ({} events)", args.id, events.len()));
    for event in &events {
        ctx.print(&format!("  {}", format_event_line(event)));
    }
    Ok(())
}
