//! Poll command: one cycle against the configured mailbox.

use std::path::Path;

use crate::classify::FieldClassifier;
use crate::config::{self, CliOverrides, PollSettings};
use crate::error::Result;
use crate::format::format_cycle_report;
use crate::ingest::{IngestPipeline, InboxPoller};
use crate::mail::ImapServer;
use crate::output::OutputContext;
use crate::storage::SqliteStorage;

/// Execute the poll command.
///
/// # Errors
///
/// Returns a `Config` error for incomplete IMAP settings and `MailConnect`
/// when the mailbox cannot be opened. Per-message failures are reported,
/// not returned.
pub fn execute(ctx: &OutputContext, cli: &CliOverrides) -> Result<()> {
    let (workspace_dir, storage) = super::open_workspace(cli)?;
    let (mut poller, _settings) = build_poller(&workspace_dir, storage, cli)?;

    let report = poller.run_cycle()?;
    if ctx.is_json() {
        return ctx.json(&report);
    }
    ctx.print(format_cycle_report(&report, ctx.use_color()).trim_end());
    Ok(())
}

/// Wire an IMAP-backed poller from merged configuration.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded or is incomplete.
pub fn build_poller(
    workspace_dir: &Path,
    storage: SqliteStorage,
    cli: &CliOverrides,
) -> Result<(InboxPoller<ImapServer>, PollSettings)> {
    let layer = config::load_config(workspace_dir, Some(&storage), cli)?;
    let imap = config::imap_config_from_layer(&layer)?;
    let settings = config::poll_settings_from_layer(&layer)?;
    let policy = config::classifier_policy_from_layer(&layer);

    tracing::debug!(?imap, interval = ?settings.interval, actor = %settings.actor, "Poller configured");
    let pipeline = IngestPipeline::new(FieldClassifier::new(policy), &settings.actor);
    Ok((
        InboxPoller::new(ImapServer::new(imap), pipeline, storage),
        settings,
    ))
}
