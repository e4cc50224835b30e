//! Bug identifier extraction and generation.
//!
//! Identifiers come from one of two places:
//! - an explicit `Bug ID: <token>` marker in a message subject
//! - a synthetic `AUTO-<timestamp>[-<slug>]` identifier when the marker is missing

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{BugmailError, Result};
use crate::model::MAX_BUG_ID_LEN;

/// Prefix that marks generated identifiers.
pub const AUTO_ID_PREFIX: &str = "AUTO-";

/// Number of subject characters that feed the slug.
const SLUG_SOURCE_CHARS: usize = 10;

static BUG_ID_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"Bug ID: (\S+)").unwrap());

/// Extract the identifier following `Bug ID: ` in a subject.
///
/// Matching is case-sensitive for the marker and the token is returned as-is.
#[must_use]
pub fn extract_bug_id(subject: &str) -> Option<String> {
    BUG_ID_MARKER
        .captures(subject)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Lowercased alphanumeric slug of the first characters of a subject.
#[must_use]
pub fn subject_slug(subject: &str) -> String {
    subject
        .chars()
        .take(SLUG_SOURCE_CHARS)
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Generate an identifier for a message without an explicit one.
///
/// Format: `AUTO-YYYYMMDDHHMMSS-<slug>`, or `AUTO-YYYYMMDDHHMMSS` when the
/// slug is empty. Two messages in the same second with the same subject
/// prefix map to the same identifier.
#[must_use]
pub fn generate_auto_id(subject: &str, now: DateTime<Utc>) -> String {
    let stamp = now.format("%Y%m%d%H%M%S");
    let slug = subject_slug(subject);
    if slug.is_empty() {
        format!("{AUTO_ID_PREFIX}{stamp}")
    } else {
        format!("{AUTO_ID_PREFIX}{stamp}-{slug}")
    }
}

/// Whether an identifier was generated rather than extracted.
#[must_use]
pub fn is_auto_id(id: &str) -> bool {
    id.starts_with(AUTO_ID_PREFIX)
}

/// Validate an identifier before it reaches the store.
///
/// # Errors
///
/// Returns a validation error if the identifier is empty, too long, or
/// contains whitespace.
pub fn validate_bug_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(BugmailError::validation("bug_id", "cannot be empty"));
    }
    if id.chars().count() > MAX_BUG_ID_LEN {
        return Err(BugmailError::validation(
            "bug_id",
            format!("longer than {MAX_BUG_ID_LEN} characters"),
        ));
    }
    if id.chars().any(char::is_whitespace) {
        return Err(BugmailError::validation("bug_id", "contains whitespace"));
    }
    Ok(())
}
