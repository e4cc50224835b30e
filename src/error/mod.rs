//! Error types and handling for `bugmail`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration for wrapped errors
//! - Provides recovery hints for user-facing errors
//! - Provides structured JSON output for scripted callers

mod structured;

pub use structured::{ErrorCode, StructuredError};

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `bugmail` operations.
#[derive(Error, Debug)]
pub enum BugmailError {
    // === Storage Errors ===
    /// Database is locked by another process.
    #[error("Database is locked: {path}")]
    DatabaseLocked { path: PathBuf },

    /// `SQLite` database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // === Bug Errors ===
    /// Bug with the specified identifier was not found.
    #[error("Bug not found: {id}")]
    BugNotFound { id: String },

    // === Validation Errors ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Invalid status value.
    #[error("Invalid status: {status}")]
    InvalidStatus { status: String },

    /// Invalid priority value.
    #[error("Invalid priority: {priority}")]
    InvalidPriority { priority: String },

    // === Mail Errors ===
    /// Could not connect, authenticate, or select the mailbox.
    #[error("Mail connection to {host} failed: {reason}")]
    MailConnect { host: String, reason: String },

    /// The unseen-message search failed.
    #[error("Mail listing failed: {reason}")]
    MailListing { reason: String },

    /// Fetching a single message failed.
    #[error("Failed to fetch message {message_id}: {reason}")]
    MailFetch { message_id: u32, reason: String },

    /// Setting flags on a message failed.
    #[error("Failed to mark message {message_id} seen: {reason}")]
    MailStore { message_id: u32, reason: String },

    /// A raw message could not be parsed as an email.
    #[error("Malformed message: {reason}")]
    MessageParse { reason: String },

    // === Configuration Errors ===
    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Workspace not initialized.
    #[error("bugmail not initialized: run 'bugmail init' first")]
    NotInitialized,

    /// Already initialized.
    #[error("Already initialized at '{path}'")]
    AlreadyInitialized { path: PathBuf },

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BugmailError {
    /// Can the user fix this without code changes?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotInitialized
                | Self::BugNotFound { .. }
                | Self::Validation { .. }
                | Self::InvalidStatus { .. }
                | Self::InvalidPriority { .. }
                | Self::Config(_)
        )
    }

    /// Is this a mail-server error (as opposed to a local one)?
    #[must_use]
    pub const fn is_mail_error(&self) -> bool {
        matches!(
            self,
            Self::MailConnect { .. }
                | Self::MailListing { .. }
                | Self::MailFetch { .. }
                | Self::MailStore { .. }
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run: bugmail init"),
            Self::AlreadyInitialized { .. } => Some("Use --force to reinitialize"),
            Self::InvalidStatus { .. } => Some("Valid statuses: open, in_progress, resolved, closed"),
            Self::InvalidPriority { .. } => Some("Valid priorities: low, medium, high"),
            Self::MailConnect { .. } => {
                Some("Check imap.host, imap.user and imap.password in .bugmail/config.yaml")
            }
            Self::DatabaseLocked { .. } => Some("Another bugmail process holds the lock; retry"),
            _ => None,
        }
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type using `BugmailError`.
pub type Result<T> = std::result::Result<T, BugmailError>;
