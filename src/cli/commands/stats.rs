//! Stats command: totals and modifications per day.

use chrono::{Duration, Utc};

use crate::cli::StatsArgs;
use crate::config::CliOverrides;
use crate::error::Result;
use crate::format::{BreakdownEntry, DayCount, Statistics, format_statistics};
use crate::output::OutputContext;
use crate::storage::SqliteStorage;

/// Execute the stats command.
///
/// # Errors
///
/// Returns an error if the database cannot be read.
pub fn execute(args: &StatsArgs, ctx: &OutputContext, cli: &CliOverrides) -> Result<()> {
    let (_workspace_dir, storage) = super::open_workspace(cli)?;
    let stats = collect(&storage, args.days)?;

    if ctx.is_json() {
        return ctx.json(&stats);
    }
    ctx.print(format_statistics(&stats, ctx.use_color()).trim_end());
    Ok(())
}

/// Gather statistics covering the last `days` days (today included).
///
/// # Errors
///
/// Returns an error if the database cannot be read.
pub fn collect(storage: &SqliteStorage, days: u32) -> Result<Statistics> {
    let now = Utc::now();
    let window_start = (now - Duration::days(i64::from(days.saturating_sub(1))))
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(now, |midnight| midnight.and_utc());

    let by_status = storage
        .counts_by_status()?
        .into_iter()
        .map(|(status, count)| BreakdownEntry {
            value: status.as_str().to_string(),
            count,
        })
        .collect();
    let by_priority = storage
        .counts_by_priority()?
        .into_iter()
        .map(|(priority, count)| BreakdownEntry {
            value: priority.as_str().to_string(),
            count,
        })
        .collect();
    let sparse = storage.modifications_per_day(window_start)?;

    Ok(Statistics {
        total: storage.count_bugs()?,
        total_modifications: storage.total_modifications()?,
        by_status,
        by_priority,
        days,
        modifications_per_day: DayCount::fill(&sparse, days, now),
    })
}
