//! Scripted in-memory mail server for poller tests.

use bugmail::error::{BugmailError, Result};
use bugmail::mail::{MailServer, MailSession};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct MailboxState {
    pub messages: BTreeMap<u32, Vec<u8>>,
    pub seen: BTreeSet<u32>,
    pub fail_fetch: BTreeSet<u32>,
    pub fail_mark_seen: BTreeSet<u32>,
    pub fail_listing: bool,
    pub refuse_connect: bool,
    pub connects: usize,
    pub logouts: usize,
}

/// Shares state with every session it opens, so tests can inspect flags
/// after a cycle.
#[derive(Debug, Clone, Default)]
pub struct FakeMailServer {
    pub state: Rc<RefCell<MailboxState>>,
}

impl FakeMailServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliver(&self, id: u32, raw: Vec<u8>) {
        self.state.borrow_mut().messages.insert(id, raw);
    }

    pub fn fail_fetch(&self, id: u32) {
        self.state.borrow_mut().fail_fetch.insert(id);
    }

    pub fn fail_mark_seen(&self, id: u32) {
        self.state.borrow_mut().fail_mark_seen.insert(id);
    }

    pub fn fail_listing(&self) {
        self.state.borrow_mut().fail_listing = true;
    }

    pub fn refuse_connect(&self) {
        self.state.borrow_mut().refuse_connect = true;
    }

    pub fn is_seen(&self, id: u32) -> bool {
        self.state.borrow().seen.contains(&id)
    }

    pub fn unseen(&self) -> Vec<u32> {
        let state = self.state.borrow();
        state
            .messages
            .keys()
            .filter(|id| !state.seen.contains(id))
            .copied()
            .collect()
    }
}

pub struct FakeSession {
    state: Rc<RefCell<MailboxState>>,
}

impl MailServer for FakeMailServer {
    type Session = FakeSession;

    fn endpoint(&self) -> String {
        "fake:993/INBOX".to_string()
    }

    fn connect(&self) -> Result<FakeSession> {
        let mut state = self.state.borrow_mut();
        state.connects += 1;
        if state.refuse_connect {
            return Err(BugmailError::MailConnect {
                host: "fake:993".to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(FakeSession {
            state: Rc::clone(&self.state),
        })
    }
}

impl MailSession for FakeSession {
    fn search_unseen(&mut self) -> Result<Vec<u32>> {
        let state = self.state.borrow();
        if state.fail_listing {
            return Err(BugmailError::MailListing {
                reason: "BAD search".to_string(),
            });
        }
        Ok(state
            .messages
            .keys()
            .filter(|id| !state.seen.contains(id))
            .copied()
            .collect())
    }

    fn fetch(&mut self, message_id: u32) -> Result<Vec<u8>> {
        let state = self.state.borrow();
        if state.fail_fetch.contains(&message_id) {
            return Err(BugmailError::MailFetch {
                message_id,
                reason: "connection reset".to_string(),
            });
        }
        state
            .messages
            .get(&message_id)
            .cloned()
            .ok_or_else(|| BugmailError::MailFetch {
                message_id,
                reason: "no such message".to_string(),
            })
    }

    fn mark_seen(&mut self, message_id: u32) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_mark_seen.contains(&message_id) {
            return Err(BugmailError::MailStore {
                message_id,
                reason: "read-only mailbox".to_string(),
            });
        }
        state.seen.insert(message_id);
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        self.state.borrow_mut().logouts += 1;
        Ok(())
    }
}
