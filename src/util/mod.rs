//! Shared utilities for `bugmail`.
//!
//! Common functionality used across modules:
//! - Content hashing (SHA256)
//! - Time parsing and formatting (RFC3339)
//! - Bug identifier extraction and generation

mod hash;
pub mod id;
pub mod time;

pub use hash::content_hash_from_parts;
pub use id::{
    AUTO_ID_PREFIX, extract_bug_id, generate_auto_id, is_auto_id, subject_slug, validate_bug_id,
};

/// Truncate a string to at most `max_chars` characters on a char boundary.
#[must_use]
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
