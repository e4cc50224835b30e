//! Watch command: poll cycles on a fixed interval.

use crate::cli::WatchArgs;
use crate::config::CliOverrides;
use crate::error::{BugmailError, Result};
use crate::format::format_cycle_report;
use crate::output::OutputContext;

/// Execute the watch command.
///
/// Cycle failures are reported and the loop continues; only a configuration
/// problem stops it before the first cycle.
///
/// # Errors
///
/// Returns an error if the workspace or configuration cannot be loaded.
pub fn execute(args: &WatchArgs, ctx: &OutputContext, cli: &CliOverrides) -> Result<()> {
    let cli = CliOverrides {
        poll_interval_secs: args.interval.or(cli.poll_interval_secs),
        ..cli.clone()
    };
    let (workspace_dir, storage) = super::open_workspace(&cli)?;
    let (mut poller, settings) = super::poll::build_poller(&workspace_dir, storage, &cli)?;

    tracing::info!(
        interval_secs = settings.interval.as_secs(),
        max_cycles = ?args.max_cycles,
        "Watching mailbox"
    );

    let mut output_error: Option<BugmailError> = None;
    let cycles = poller.watch(settings.interval, args.max_cycles, |cycle, result| {
        match result {
            Ok(report) if ctx.is_json() => {
                // One compact object per line so the stream stays parseable.
                match serde_json::to_string(report) {
                    Ok(line) => println!("{line}"),
                    Err(err) => {
                        if output_error.is_none() {
                            output_error = Some(err.into());
                        }
                    }
                }
            }
            Ok(report) => {
                let text = format_cycle_report(report, ctx.use_color());
                ctx.print(&format!("[cycle {cycle}] {}", text.trim_end()));
            }
            Err(err) => ctx.warning(&format!("cycle {cycle} failed: {err}")),
        }
    });

    tracing::info!(cycles, "Watch finished");
    output_error.map_or(Ok(()), Err)
}
