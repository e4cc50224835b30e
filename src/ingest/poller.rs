//! One poll cycle over a mailbox, and a fixed-interval loop of cycles.
//!
//! `Disconnected → Connected → Listing → [ProcessingMessage]* → Disconnected`.
//! Only a connection failure fails the cycle. A listing failure reads as an
//! empty mailbox; a failure on one message is recorded and the next message
//! is processed. Messages are marked seen only after a successful upsert.

use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use super::IngestPipeline;
use crate::error::Result;
use crate::mail::{MailServer, MailSession};
use crate::storage::SqliteStorage;

/// Where a per-message failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Fetch,
    Parse,
    Upsert,
    MarkSeen,
}

/// What happened to one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MessageResult {
    Created { modification_count: u32 },
    Updated {
        modification_count: u32,
        /// Whether subject, body, status or priority differ from what was stored.
        content_changed: bool,
    },
    Failed { stage: FailureStage, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageOutcome {
    pub message_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bug_id: Option<String>,
    #[serde(flatten)]
    pub result: MessageResult,
}

impl MessageOutcome {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self.result, MessageResult::Failed { .. })
    }
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Unread messages the listing returned.
    pub listed: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    /// Set when the unread search failed and the cycle treated it as empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_error: Option<String>,
    pub messages: Vec<MessageOutcome>,
}

impl CycleReport {
    fn begin() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            listed: 0,
            created: 0,
            updated: 0,
            failed: 0,
            listing_error: None,
            messages: Vec::new(),
        }
    }

    fn push(&mut self, outcome: MessageOutcome) {
        match outcome.result {
            MessageResult::Created { .. } => self.created += 1,
            MessageResult::Updated { .. } => self.updated += 1,
            MessageResult::Failed { .. } => self.failed += 1,
        }
        self.messages.push(outcome);
    }

    /// Messages fully handled (upserted and marked seen).
    #[must_use]
    pub const fn processed(&self) -> usize {
        self.created + self.updated
    }
}

/// Polls a mailbox and feeds each unread message through the pipeline.
pub struct InboxPoller<S: MailServer> {
    server: S,
    pipeline: IngestPipeline,
    storage: SqliteStorage,
}

impl<S: MailServer> InboxPoller<S> {
    #[must_use]
    pub const fn new(server: S, pipeline: IngestPipeline, storage: SqliteStorage) -> Self {
        Self {
            server,
            pipeline,
            storage,
        }
    }

    #[must_use]
    pub const fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    #[must_use]
    pub const fn server(&self) -> &S {
        &self.server
    }

    /// Run one poll cycle.
    ///
    /// # Errors
    ///
    /// Returns `MailConnect` if the mailbox cannot be opened. Every other
    /// failure is recorded in the report.
    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        let mut report = CycleReport::begin();
        let endpoint = self.server.endpoint();
        info!(endpoint = %endpoint, "Starting poll cycle");

        let mut session = match self.server.connect() {
            Ok(session) => session,
            Err(err) => {
                error!(endpoint = %endpoint, error = %err, "Failed to connect to mail server");
                return Err(err);
            }
        };

        let ids = match session.search_unseen() {
            Ok(ids) => ids,
            Err(err) => {
                warn!(error = %err, "Unread search failed; treating mailbox as empty");
                report.listing_error = Some(err.to_string());
                Vec::new()
            }
        };
        report.listed = ids.len();
        if ids.is_empty() {
            info!("No unread messages to process");
        }

        for message_id in ids {
            let outcome = self.process_message(&mut session, message_id);
            report.push(outcome);
        }

        if let Err(err) = session.logout() {
            warn!(error = %err, "Logout failed");
        }

        report.finished_at = Utc::now();
        info!(
            listed = report.listed,
            created = report.created,
            updated = report.updated,
            failed = report.failed,
            "Poll cycle finished"
        );
        Ok(report)
    }

    fn process_message(&mut self, session: &mut S::Session, message_id: u32) -> MessageOutcome {
        let failed = |bug_id: Option<String>, stage: FailureStage, err: &dyn std::fmt::Display| {
            warn!(
                message_id,
                bug_id = bug_id.as_deref().unwrap_or("-"),
                stage = ?stage,
                error = %err,
                "Failed to process message"
            );
            MessageOutcome {
                message_id,
                bug_id,
                result: MessageResult::Failed {
                    stage,
                    error: err.to_string(),
                },
            }
        };

        let raw = match session.fetch(message_id) {
            Ok(raw) => raw,
            Err(err) => return failed(None, FailureStage::Fetch, &err),
        };

        let prepared = match self.pipeline.prepare(&raw) {
            Ok(prepared) => prepared,
            Err(err) => return failed(None, FailureStage::Parse, &err),
        };
        let bug_id = prepared.bug_id.clone();

        let outcome = match self.pipeline.commit(&mut self.storage, &prepared) {
            Ok(outcome) => outcome,
            Err(err) => return failed(Some(bug_id), FailureStage::Upsert, &err),
        };

        if let Err(err) = session.mark_seen(message_id) {
            return failed(Some(bug_id), FailureStage::MarkSeen, &err);
        }

        let modification_count = outcome.bug.modification_count;
        let result = if outcome.created {
            info!(message_id, bug_id = %bug_id, "Created new bug");
            MessageResult::Created { modification_count }
        } else {
            let content_changed = outcome.content_changed;
            info!(
                message_id,
                bug_id = %bug_id,
                modification_count,
                content_changed,
                "Updated bug with {} modification(s)",
                modification_count
            );
            MessageResult::Updated {
                modification_count,
                content_changed,
            }
        };

        MessageOutcome {
            message_id,
            bug_id: Some(bug_id),
            result,
        }
    }

    /// Run cycles back to back, sleeping `interval` between them.
    ///
    /// A failed cycle is reported to `on_cycle` and the loop continues.
    /// Stops after `max_cycles` cycles when given, otherwise never returns.
    pub fn watch<F>(&mut self, interval: Duration, max_cycles: Option<u64>, mut on_cycle: F) -> u64
    where
        F: FnMut(u64, &Result<CycleReport>),
    {
        let mut cycle = 0_u64;
        loop {
            cycle += 1;
            let result = self.run_cycle();
            on_cycle(cycle, &result);

            if max_cycles.is_some_and(|max| cycle >= max) {
                return cycle;
            }
            thread::sleep(interval);
        }
    }
}

impl<S: MailServer + std::fmt::Debug> std::fmt::Debug for InboxPoller<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboxPoller")
            .field("server", &self.server)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BugmailError;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    #[derive(Default)]
    struct Mailbox {
        messages: BTreeMap<u32, Vec<u8>>,
        seen: Vec<u32>,
        fail_fetch: Vec<u32>,
        logged_out: bool,
    }

    #[derive(Clone, Default)]
    struct StubServer {
        mailbox: Rc<RefCell<Mailbox>>,
        refuse: bool,
    }

    struct StubSession {
        mailbox: Rc<RefCell<Mailbox>>,
    }

    impl MailServer for StubServer {
        type Session = StubSession;

        fn endpoint(&self) -> String {
            "stub".to_string()
        }

        fn connect(&self) -> Result<StubSession> {
            if self.refuse {
                return Err(BugmailError::MailConnect {
                    host: "stub".to_string(),
                    reason: "refused".to_string(),
                });
            }
            Ok(StubSession {
                mailbox: Rc::clone(&self.mailbox),
            })
        }
    }

    impl MailSession for StubSession {
        fn search_unseen(&mut self) -> Result<Vec<u32>> {
            let mb = self.mailbox.borrow();
            Ok(mb
                .messages
                .keys()
                .filter(|id| !mb.seen.contains(id))
                .copied()
                .collect())
        }

        fn fetch(&mut self, message_id: u32) -> Result<Vec<u8>> {
            let mb = self.mailbox.borrow();
            if mb.fail_fetch.contains(&message_id) {
                return Err(BugmailError::MailFetch {
                    message_id,
                    reason: "timeout".to_string(),
                });
            }
            Ok(mb.messages[&message_id].clone())
        }

        fn mark_seen(&mut self, message_id: u32) -> Result<()> {
            self.mailbox.borrow_mut().seen.push(message_id);
            Ok(())
        }

        fn logout(&mut self) -> Result<()> {
            self.mailbox.borrow_mut().logged_out = true;
            Ok(())
        }
    }

    fn poller(server: StubServer) -> InboxPoller<StubServer> {
        InboxPoller::new(
            server,
            IngestPipeline::default(),
            SqliteStorage::open_memory().unwrap(),
        )
    }

    #[test]
    fn second_cycle_sees_nothing_new() {
        let server = StubServer::default();
        server
            .mailbox
            .borrow_mut()
            .messages
            .insert(1, b"Subject: Bug ID: S-1\r\n\r\nbody\r\n".to_vec());
        let mut poller = poller(server.clone());

        let first = poller.run_cycle().unwrap();
        assert_eq!(first.listed, 1);
        assert_eq!(first.created, 1);
        assert!(server.mailbox.borrow().logged_out);

        let second = poller.run_cycle().unwrap();
        assert_eq!(second.listed, 0);
        assert_eq!(second.processed(), 0);
    }

    #[test]
    fn fetch_failure_leaves_message_unseen() {
        let server = StubServer::default();
        {
            let mut mb = server.mailbox.borrow_mut();
            mb.messages
                .insert(7, b"Subject: Bug ID: S-7\r\n\r\nbody\r\n".to_vec());
            mb.fail_fetch.push(7);
        }
        let mut poller = poller(server.clone());
        let report = poller.run_cycle().unwrap();
        assert_eq!(report.failed, 1);
        assert!(matches!(
            report.messages[0].result,
            MessageResult::Failed {
                stage: FailureStage::Fetch,
                ..
            }
        ));
        assert!(server.mailbox.borrow().seen.is_empty());
    }

    #[test]
    fn refused_connection_fails_cycle() {
        let mut poller = poller(StubServer {
            refuse: true,
            ..StubServer::default()
        });
        assert!(matches!(
            poller.run_cycle(),
            Err(BugmailError::MailConnect { .. })
        ));
    }

    #[test]
    fn watch_runs_bounded_cycles_through_failures() {
        let mut poller = poller(StubServer {
            refuse: true,
            ..StubServer::default()
        });
        let mut seen = Vec::new();
        let cycles = poller.watch(Duration::ZERO, Some(3), |n, result| {
            seen.push((n, result.is_err()));
        });
        assert_eq!(cycles, 3);
        assert_eq!(seen, vec![(1, true), (2, true), (3, true)]);
    }

    #[test]
    fn report_serializes_outcomes() {
        let outcome = MessageOutcome {
            message_id: 3,
            bug_id: Some("X".to_string()),
            result: MessageResult::Updated {
                modification_count: 2,
                content_changed: false,
            },
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["result"], "updated");
        assert_eq!(value["modification_count"], 2);
        assert_eq!(value["content_changed"], false);
        assert_eq!(value["bug_id"], "X");
    }
}
