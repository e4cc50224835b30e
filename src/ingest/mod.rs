//! Message → bug ingestion.
//!
//! `IngestPipeline` turns one raw message into an upsert:
//! parse (identifier, subject, body), classify (status, priority), then
//! create-or-update the bug. `InboxPoller` drives it over a mailbox.

pub mod poller;

pub use poller::{CycleReport, FailureStage, InboxPoller, MessageOutcome, MessageResult};

use serde::Serialize;

use crate::classify::{Classification, FieldClassifier};
use crate::error::Result;
use crate::mail::{ParsedMessage, parse_message};
use crate::model::{BugDraft, UpsertOutcome};
use crate::storage::SqliteStorage;

/// Actor recorded on events written by ingestion unless configured otherwise.
pub const DEFAULT_ACTOR: &str = "mail-ingest";

/// A parsed and classified message, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedMessage {
    pub bug_id: String,
    pub subject: String,
    #[serde(skip)]
    pub body: String,
    pub id_generated: bool,
    pub classification: Classification,
}

impl PreparedMessage {
    #[must_use]
    pub fn draft(&self) -> BugDraft {
        BugDraft {
            bug_id: self.bug_id.clone(),
            subject: self.subject.clone(),
            description: self.body.clone(),
            status: self.classification.status,
            priority: self.classification.priority,
        }
    }
}

/// Result of ingesting one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ingested {
    pub message: PreparedMessage,
    pub outcome: UpsertOutcome,
}

/// Parse → classify → upsert for one raw message.
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    classifier: FieldClassifier,
    actor: String,
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::new(FieldClassifier::default(), DEFAULT_ACTOR)
    }
}

impl IngestPipeline {
    #[must_use]
    pub fn new(classifier: FieldClassifier, actor: &str) -> Self {
        Self {
            classifier,
            actor: actor.to_string(),
        }
    }

    #[must_use]
    pub fn actor(&self) -> &str {
        &self.actor
    }

    #[must_use]
    pub const fn classifier(&self) -> &FieldClassifier {
        &self.classifier
    }

    /// Parse and classify without touching storage.
    ///
    /// # Errors
    ///
    /// Returns `MessageParse` when the bytes are not an email.
    pub fn prepare(&self, raw: &[u8]) -> Result<PreparedMessage> {
        let parsed = parse_message(raw)?;
        Ok(self.classify_parsed(parsed))
    }

    /// Classify an already parsed message.
    #[must_use]
    pub fn classify_parsed(&self, parsed: ParsedMessage) -> PreparedMessage {
        let classification = self.classifier.classify(&parsed.subject, &parsed.body);
        PreparedMessage {
            bug_id: parsed.bug_id,
            subject: parsed.subject,
            body: parsed.body,
            id_generated: parsed.id_generated,
            classification,
        }
    }

    /// Write a prepared message to storage.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unusable identifier or a database error.
    pub fn commit(
        &self,
        storage: &mut SqliteStorage,
        message: &PreparedMessage,
    ) -> Result<UpsertOutcome> {
        storage.upsert_bug(&message.draft(), &self.actor)
    }

    /// Parse, classify and upsert one raw message.
    ///
    /// # Errors
    ///
    /// Returns the first error from any stage.
    pub fn ingest(&self, storage: &mut SqliteStorage, raw: &[u8]) -> Result<Ingested> {
        let message = self.prepare(raw)?;
        let outcome = self.commit(storage, &message)?;
        Ok(Ingested { message, outcome })
    }
}
