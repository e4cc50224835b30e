//! Mail server access and message parsing.
//!
//! The poller talks to the mailbox only through `MailServer` and
//! `MailSession`, so cycles can run against IMAP or an in-memory fake.

pub mod parser;
pub mod server;

pub use parser::{ParsedMessage, parse_message, parse_message_at};
pub use server::{ImapConfig, ImapServer, ImapSession};

use crate::error::Result;

/// Something that can open an authenticated session on a selected mailbox.
pub trait MailServer {
    type Session: MailSession;

    /// Human-readable location, for logs. Never includes credentials.
    fn endpoint(&self) -> String;

    /// Connect, authenticate and select the mailbox.
    ///
    /// # Errors
    ///
    /// Returns `MailConnect` if any of those steps fails.
    fn connect(&self) -> Result<Self::Session>;
}

/// Operations on one open mailbox session.
pub trait MailSession {
    /// Identifiers of unread messages, ascending.
    ///
    /// # Errors
    ///
    /// Returns `MailListing` on a failed or unparseable search response.
    fn search_unseen(&mut self) -> Result<Vec<u32>>;

    /// Full raw content of one message. Must not set `\Seen`.
    ///
    /// # Errors
    ///
    /// Returns `MailFetch` when the message cannot be retrieved.
    fn fetch(&mut self, message_id: u32) -> Result<Vec<u8>>;

    /// Flag one message as seen.
    ///
    /// # Errors
    ///
    /// Returns `MailStore` when the flag update is rejected.
    fn mark_seen(&mut self, message_id: u32) -> Result<()>;

    /// End the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the logout.
    fn logout(&mut self) -> Result<()>;
}
