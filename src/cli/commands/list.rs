//! List command implementation.

use crate::cli::ListArgs;
use crate::config::CliOverrides;
use crate::error::Result;
use crate::format::{TextFormatOptions, format_bug_line_with};
use crate::model::{Priority, Status};
use crate::output::OutputContext;
use crate::storage::{ListFilters, ListSort};
use crate::util::time::parse_flexible_timestamp;

const DEFAULT_LIMIT: usize = 50;

/// Execute the list command.
///
/// # Errors
///
/// Returns an error for an unknown status, priority or sort key, or if the
/// database cannot be read.
pub fn execute(args: &ListArgs, ctx: &OutputContext, cli: &CliOverrides) -> Result<()> {
    let filters = build_filters(args)?;
    let (_workspace_dir, storage) = super::open_workspace(cli)?;
    let bugs = storage.list_bugs(&filters)?;
    tracing::debug!(count = bugs.len(), ?filters, "Listed bugs");

    if ctx.is_json() {
        return ctx.json(&bugs);
    }
    if bugs.is_empty() {
        ctx.print("No bugs found.");
        return Ok(());
    }

    let options = TextFormatOptions {
        use_color: ctx.use_color(),
        max_width: Some(ctx.width()),
    };
    for bug in &bugs {
        ctx.print(&format_bug_line_with(bug, options));
    }
    Ok(())
}

/// Translate CLI arguments into storage filters.
///
/// # Errors
///
/// Returns a validation error for unknown values.
pub fn build_filters(args: &ListArgs) -> Result<ListFilters> {
    let statuses = args
        .status
        .iter()
        .map(|s| s.parse::<Status>())
        .collect::<Result<Vec<_>>>()?;
    let priorities = args
        .priority
        .iter()
        .map(|p| p.parse::<Priority>())
        .collect::<Result<Vec<_>>>()?;
    let sort = args
        .sort
        .as_deref()
        .map_or(Ok(ListSort::default()), str::parse)?;
    let updated_since = args
        .since
        .as_deref()
        .map(|s| parse_flexible_timestamp(s, "since"))
        .transpose()?;

    Ok(ListFilters {
        statuses: (!statuses.is_empty()).then_some(statuses),
        priorities: (!priorities.is_empty()).then_some(priorities),
        search: args.search.clone(),
        updated_since,
        sort,
        reverse: args.reverse,
        limit: Some(args.limit.unwrap_or(DEFAULT_LIMIT)),
    })
}
