//! Content hashing for change detection.
//!
//! Uses SHA256 over stable ordered fields with null separators.

use sha2::{Digest, Sha256};

use crate::model::{Priority, Status};

/// Compute the content hash of a bug from its mutable fields.
///
/// Fields included (stable order with null separators):
/// - subject, description
/// - status, priority
///
/// The identifier, modification count, and timestamps are excluded so the
/// hash only changes when a re-processed message carries different content.
#[must_use]
pub fn content_hash_from_parts(
    subject: &str,
    description: &str,
    status: Status,
    priority: Priority,
) -> String {
    let mut hasher = Sha256::new();

    let mut add_field = |value: &str| {
        if value.contains('\0') {
            hasher.update(value.replace('\0', " ").as_bytes());
        } else {
            hasher.update(value.as_bytes());
        }
        hasher.update(b"\x00");
    };

    add_field(subject);
    add_field(description);
    add_field(status.as_str());
    add_field(priority.as_str());

    format!("{:x}", hasher.finalize())
}
