//! Structured error output for scripted callers.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Retryability flags
//! - Context for debugging

use crate::error::BugmailError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// Format: `SCREAMING_SNAKE_CASE` for easy parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Database Errors (exit code 2) ===
    DatabaseLocked,
    DatabaseError,
    NotInitialized,
    AlreadyInitialized,

    // === Bug Errors (exit code 3) ===
    BugNotFound,

    // === Validation Errors (exit code 4) ===
    ValidationFailed,
    InvalidStatus,
    InvalidPriority,

    // === Config Errors (exit code 7) ===
    ConfigError,

    // === I/O Errors (exit code 8) ===
    IoError,
    JsonError,
    YamlError,

    // === Mail Errors (exit code 9) ===
    MailConnectFailed,
    MailListingFailed,
    MailFetchFailed,
    MailStoreFailed,
    MessageParseFailed,

    // === Internal Errors (exit code 1) ===
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DatabaseLocked => "DATABASE_LOCKED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::BugNotFound => "BUG_NOT_FOUND",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::InvalidPriority => "INVALID_PRIORITY",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
            Self::MailConnectFailed => "MAIL_CONNECT_FAILED",
            Self::MailListingFailed => "MAIL_LISTING_FAILED",
            Self::MailFetchFailed => "MAIL_FETCH_FAILED",
            Self::MailStoreFailed => "MAIL_STORE_FAILED",
            Self::MessageParseFailed => "MESSAGE_PARSE_FAILED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether this error is potentially retryable.
    ///
    /// Mail errors are retried by the next scheduled cycle.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseLocked
                | Self::ValidationFailed
                | Self::InvalidStatus
                | Self::InvalidPriority
                | Self::MailConnectFailed
                | Self::MailListingFailed
                | Self::MailFetchFailed
                | Self::MailStoreFailed
        )
    }

    /// Get the exit code for this error category.
    ///
    /// - 1: Internal/unknown errors
    /// - 2: Database errors
    /// - 3: Bug errors
    /// - 4: Validation errors
    /// - 7: Config errors
    /// - 8: I/O errors
    /// - 9: Mail errors
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::DatabaseLocked
            | Self::DatabaseError
            | Self::NotInitialized
            | Self::AlreadyInitialized => 2,
            Self::BugNotFound => 3,
            Self::ValidationFailed | Self::InvalidStatus | Self::InvalidPriority => 4,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::YamlError => 8,
            Self::MailConnectFailed
            | Self::MailListingFailed
            | Self::MailFetchFailed
            | Self::MailStoreFailed
            | Self::MessageParseFailed => 9,
            Self::InternalError => 1,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `BugmailError`.
    #[must_use]
    pub fn from_error(err: &BugmailError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);

        Self {
            code,
            message: err.to_string(),
            hint: err.suggestion().map(str::to_string),
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Serialize to JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_code_and_context(err: &BugmailError) -> (ErrorCode, Option<Value>) {
        match err {
            BugmailError::DatabaseLocked { path } => (
                ErrorCode::DatabaseLocked,
                Some(json!({"path": path.display().to_string()})),
            ),
            BugmailError::Database(_) => (ErrorCode::DatabaseError, None),
            BugmailError::NotInitialized => (ErrorCode::NotInitialized, None),
            BugmailError::AlreadyInitialized { path } => (
                ErrorCode::AlreadyInitialized,
                Some(json!({"path": path.display().to_string()})),
            ),
            BugmailError::BugNotFound { id } => {
                (ErrorCode::BugNotFound, Some(json!({"searched_id": id})))
            }
            BugmailError::Validation { field, reason } => (
                ErrorCode::ValidationFailed,
                Some(json!({"field": field, "reason": reason})),
            ),
            BugmailError::InvalidStatus { status } => {
                (ErrorCode::InvalidStatus, Some(json!({"provided": status})))
            }
            BugmailError::InvalidPriority { priority } => (
                ErrorCode::InvalidPriority,
                Some(json!({"provided": priority})),
            ),
            BugmailError::MailConnect { host, .. } => {
                (ErrorCode::MailConnectFailed, Some(json!({"host": host})))
            }
            BugmailError::MailListing { .. } => (ErrorCode::MailListingFailed, None),
            BugmailError::MailFetch { message_id, .. } => (
                ErrorCode::MailFetchFailed,
                Some(json!({"message_id": message_id})),
            ),
            BugmailError::MailStore { message_id, .. } => (
                ErrorCode::MailStoreFailed,
                Some(json!({"message_id": message_id})),
            ),
            BugmailError::MessageParse { .. } => (ErrorCode::MessageParseFailed, None),
            BugmailError::Config(_) => (ErrorCode::ConfigError, None),
            BugmailError::Io(_) => (ErrorCode::IoError, None),
            BugmailError::Json(_) => (ErrorCode::JsonError, None),
            BugmailError::Yaml(_) => (ErrorCode::YamlError, None),
            BugmailError::Other(_) => (ErrorCode::InternalError, None),
        }
    }
}
