//! Classify command: show the status and priority a message would get.

use crate::classify::FieldClassifier;
use crate::cli::ClassifyArgs;
use crate::config::{self, CliOverrides};
use crate::error::Result;
use crate::format::format_classification;
use crate::output::OutputContext;

/// Execute the classify command.
///
/// Uses the workspace keyword policy when run inside a workspace, and the
/// built-in keywords otherwise.
///
/// # Errors
///
/// Returns an error if workspace configuration exists but cannot be read.
pub fn execute(args: &ClassifyArgs, ctx: &OutputContext, cli: &CliOverrides) -> Result<()> {
    let classifier = match super::open_workspace(cli) {
        Ok((workspace_dir, storage)) => {
            let layer = config::load_config(&workspace_dir, Some(&storage), cli)?;
            FieldClassifier::new(config::classifier_policy_from_layer(&layer))
        }
        Err(crate::error::BugmailError::NotInitialized) => FieldClassifier::default(),
        Err(err) => return Err(err),
    };

    let classification = classifier.classify(&args.subject, &args.body);
    if ctx.is_json() {
        return ctx.json(&classification);
    }
    ctx.print(&format_classification(&classification, ctx.use_color()));
    Ok(())
}
