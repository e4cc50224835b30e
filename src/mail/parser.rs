//! Raw email → `(bug_id, subject, body)`.

use chrono::{DateTime, Utc};
use mail_parser::{Message, MessageParser, MimeHeaders, PartType};

use crate::error::{BugmailError, Result};
use crate::util::{extract_bug_id, generate_auto_id};

/// Fields pulled out of one raw message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub bug_id: String,
    pub subject: String,
    pub body: String,
    /// `true` when `bug_id` was synthesised because the subject had no marker.
    pub id_generated: bool,
}

/// Parse a raw message, generating an identifier from the current time if needed.
///
/// # Errors
///
/// Returns `MessageParse` if the bytes are not an email message.
pub fn parse_message(raw: &[u8]) -> Result<ParsedMessage> {
    parse_message_at(raw, Utc::now())
}

/// Parse a raw message with an explicit clock for identifier generation.
///
/// # Errors
///
/// Returns `MessageParse` if the bytes are not an email message.
pub fn parse_message_at(raw: &[u8], now: DateTime<Utc>) -> Result<ParsedMessage> {
    let message = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| BugmailError::MessageParse {
            reason: "no RFC 5322 headers found".to_string(),
        })?;

    let subject = message.subject().unwrap_or("").to_string();
    let body = body_text(&message);

    let (bug_id, id_generated) = match extract_bug_id(&subject) {
        Some(id) => (id, false),
        None => (generate_auto_id(&subject, now), true),
    };

    Ok(ParsedMessage {
        bug_id,
        subject,
        body,
        id_generated,
    })
}

/// First non-attachment `text/plain` part of a multipart message, or the
/// sole part of a single-part one. Empty when neither yields text.
fn body_text(message: &Message<'_>) -> String {
    let Some(root) = message.parts.first() else {
        return String::new();
    };

    if !matches!(root.body, PartType::Multipart(_)) {
        return root.text_contents().unwrap_or("").to_string();
    }

    message
        .parts
        .iter()
        .find(|part| {
            matches!(part.body, PartType::Text(_))
                && part.content_type().is_none_or(|ct| {
                    ct.ctype().eq_ignore_ascii_case("text")
                        && ct
                            .subtype()
                            .is_none_or(|sub| sub.eq_ignore_ascii_case("plain"))
                })
                && !part
                    .content_disposition()
                    .is_some_and(mail_parser::ContentType::is_attachment)
        })
        .and_then(|part| part.text_contents())
        .unwrap_or("")
        .to_string()
}
