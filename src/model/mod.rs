//! Core data types for `bugmail`.
//!
//! This module defines the fundamental types used throughout the application:
//! - `Bug` - The persisted bug record, keyed by its identifier
//! - `Status` - Bug lifecycle states
//! - `Priority` - Bug urgency levels
//! - `BugDraft` - The fields an ingested message carries into an upsert
//! - `UpsertOutcome` - Created-vs-updated result of an upsert
//! - `Event` - Audit log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a bug identifier.
pub const MAX_BUG_ID_LEN: usize = 50;

/// Maximum length of a bug subject, in characters.
pub const MAX_SUBJECT_LEN: usize = 255;

/// Bug lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl Status {
    pub const ALL: [Self; 4] = [Self::Open, Self::InProgress, Self::Resolved, Self::Closed];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    /// Human label, as shown in listings.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
            Self::Closed => "Closed",
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = crate::error::BugmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "in_progress" | "in-progress" | "in progress" | "inprogress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            other => Err(crate::error::BugmailError::InvalidStatus {
                status: other.to_string(),
            }),
        }
    }
}

/// Bug priority.
///
/// Ordered so that `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Capitalized label (`High`, `Medium`, `Low`).
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = crate::error::BugmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(crate::error::BugmailError::InvalidPriority {
                priority: other.to_string(),
            }),
        }
    }
}

/// Audit event type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Created,
    Updated,
    StatusChanged,
    PriorityChanged,
    Deleted,
    Custom(String),
}

impl EventType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::StatusChanged => "status_changed",
            Self::PriorityChanged => "priority_changed",
            Self::Deleted => "deleted",
            Self::Custom(value) => value,
        }
    }

    /// Parse a stored event type. Unknown values are kept as `Custom`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "created" => Self::Created,
            "updated" => Self::Updated,
            "status_changed" => Self::StatusChanged,
            "priority_changed" => Self::PriorityChanged,
            "deleted" => Self::Deleted,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

/// The persisted bug record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bug {
    /// Unique identifier, extracted from a subject (`Bug ID: X`) or generated (`AUTO-...`).
    pub bug_id: String,

    /// Short summary, overwritten on every re-processing.
    pub subject: String,

    /// Free text body.
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: Status,

    #[serde(default)]
    pub priority: Priority,

    /// Number of updates since creation.
    #[serde(default)]
    pub modification_count: u32,

    /// SHA256 over subject, description, status and priority.
    #[serde(skip)]
    pub content_hash: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Bug {
    /// Compute the content hash for this bug.
    #[must_use]
    pub fn compute_content_hash(&self) -> String {
        crate::util::content_hash_from_parts(
            &self.subject,
            &self.description,
            self.status,
            self.priority,
        )
    }
}

impl fmt::Display for Bug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.bug_id, self.subject)
    }
}

/// Fields carried by one ingested message into an upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BugDraft {
    pub bug_id: String,
    pub subject: String,
    pub description: String,
    pub status: Status,
    pub priority: Priority,
}

impl BugDraft {
    #[must_use]
    pub fn content_hash(&self) -> String {
        crate::util::content_hash_from_parts(
            &self.subject,
            &self.description,
            self.status,
            self.priority,
        )
    }
}

/// Result of an identifier-keyed create-or-update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    /// The bug as stored after the write.
    pub bug: Bug,
    /// `true` when the write created the bug, `false` when it updated an existing one.
    pub created: bool,
    /// Whether subject/description/status/priority differ from what was stored before.
    pub content_changed: bool,
}

impl UpsertOutcome {
    #[must_use]
    pub const fn action(&self) -> &'static str {
        if self.created { "created" } else { "updated" }
    }
}

/// An audit event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: i64,
    pub bug_id: String,
    pub event_type: EventType,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}
