//! IMAP over TLS implementation of the mail seams.

use std::fmt;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use native_tls::{TlsConnector, TlsStream};

use super::{MailServer, MailSession};
use crate::error::{BugmailError, Result};

/// Connection settings for an IMAP mailbox.
#[derive(Clone, PartialEq, Eq)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub mailbox: String,
    /// Bound on connect, read and write.
    pub timeout: Duration,
}

impl fmt::Debug for ImapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("mailbox", &self.mailbox)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Opens authenticated sessions against one IMAP mailbox.
#[derive(Debug, Clone)]
pub struct ImapServer {
    config: ImapConfig,
}

impl ImapServer {
    #[must_use]
    pub const fn new(config: ImapConfig) -> Self {
        Self { config }
    }

    fn connect_error(&self, reason: impl fmt::Display) -> BugmailError {
        BugmailError::MailConnect {
            host: format!("{}:{}", self.config.host, self.config.port),
            reason: reason.to_string(),
        }
    }

    fn open_tcp(&self) -> Result<TcpStream> {
        let cfg = &self.config;
        let addr = (cfg.host.as_str(), cfg.port)
            .to_socket_addrs()
            .map_err(|e| self.connect_error(e))?
            .next()
            .ok_or_else(|| self.connect_error("host did not resolve"))?;

        let tcp = TcpStream::connect_timeout(&addr, cfg.timeout).map_err(|e| self.connect_error(e))?;
        tcp.set_read_timeout(Some(cfg.timeout))
            .map_err(|e| self.connect_error(e))?;
        tcp.set_write_timeout(Some(cfg.timeout))
            .map_err(|e| self.connect_error(e))?;
        Ok(tcp)
    }
}

impl MailServer for ImapServer {
    type Session = ImapSession;

    fn endpoint(&self) -> String {
        format!("{}:{}/{}", self.config.host, self.config.port, self.config.mailbox)
    }

    fn connect(&self) -> Result<ImapSession> {
        let cfg = &self.config;
        let tcp = self.open_tcp()?;
        let tls = TlsConnector::new().map_err(|e| self.connect_error(e))?;
        let stream = tls
            .connect(&cfg.host, tcp)
            .map_err(|e| self.connect_error(e))?;

        let mut client = imap::Client::new(stream);
        client.read_greeting().map_err(|e| self.connect_error(e))?;

        let mut session = client
            .login(&cfg.user, &cfg.password)
            .map_err(|(e, _)| self.connect_error(e))?;
        session
            .select(&cfg.mailbox)
            .map_err(|e| self.connect_error(format!("select {}: {e}", cfg.mailbox)))?;

        tracing::debug!(host = %cfg.host, mailbox = %cfg.mailbox, "IMAP session established");
        Ok(ImapSession { inner: session })
    }
}

/// An authenticated IMAP session with the mailbox selected.
pub struct ImapSession {
    inner: imap::Session<TlsStream<TcpStream>>,
}

impl fmt::Debug for ImapSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapSession").finish_non_exhaustive()
    }
}

impl MailSession for ImapSession {
    fn search_unseen(&mut self) -> Result<Vec<u32>> {
        let ids = self
            .inner
            .search("UNSEEN")
            .map_err(|e| BugmailError::MailListing {
                reason: e.to_string(),
            })?;
        let mut ids: Vec<u32> = ids.into_iter().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn fetch(&mut self, message_id: u32) -> Result<Vec<u8>> {
        let fetch_error = |reason: String| BugmailError::MailFetch { message_id, reason };

        // PEEK leaves \Seen unset until the message is fully handled.
        let fetches = self
            .inner
            .fetch(message_id.to_string(), "BODY.PEEK[]")
            .map_err(|e| fetch_error(e.to_string()))?;
        let body = fetches
            .iter()
            .find_map(imap::types::Fetch::body)
            .ok_or_else(|| fetch_error("server returned no body".to_string()))?;
        Ok(body.to_vec())
    }

    fn mark_seen(&mut self, message_id: u32) -> Result<()> {
        self.inner
            .store(message_id.to_string(), "+FLAGS (\\Seen)")
            .map_err(|e| BugmailError::MailStore {
                message_id,
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        self.inner
            .logout()
            .map_err(|e| BugmailError::Other(anyhow::anyhow!("IMAP logout failed: {e}")))
    }
}
