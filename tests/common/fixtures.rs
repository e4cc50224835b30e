//! Raw message builders.

/// A single-part plain text message.
pub fn plain_message(subject: &str, body: &str) -> Vec<u8> {
    format!(
        "From: Reporter <reporter@example.com>\r\n\
         To: bugs@example.com\r\n\
         Subject: {subject}\r\n\
         Date: Mon, 2 Mar 2026 10:00:00 +0000\r\n\
         Message-ID: <{}@example.com>\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         \r\n\
         {body}\r\n",
        subject.len()
    )
    .into_bytes()
}

/// A message with no Subject header at all.
pub fn message_without_subject(body: &str) -> Vec<u8> {
    format!(
        "From: reporter@example.com\r\n\
         To: bugs@example.com\r\n\
         Content-Type: text/plain\r\n\
         \r\n\
         {body}\r\n"
    )
    .into_bytes()
}

/// multipart/mixed with an HTML alternative first, then the plain part,
/// then a text attachment that must be ignored.
pub fn multipart_message(subject: &str, plain: &str, attachment: &str) -> Vec<u8> {
    format!(
        "From: reporter@example.com\r\n\
         To: bugs@example.com\r\n\
         Subject: {subject}\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/mixed; boundary=\"OUTER\"\r\n\
         \r\n\
         --OUTER\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         \r\n\
         <p>html version</p>\r\n\
         --OUTER\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         \r\n\
         {plain}\r\n\
         --OUTER\r\n\
         Content-Type: text/plain; name=\"log.txt\"\r\n\
         Content-Disposition: attachment; filename=\"log.txt\"\r\n\
         \r\n\
         {attachment}\r\n\
         --OUTER--\r\n"
    )
    .into_bytes()
}

/// A message tagged with a bug identifier.
pub fn bug_message(bug_id: &str, title: &str, body: &str) -> Vec<u8> {
    plain_message(&format!("Bug ID: {bug_id} {title}"), body)
}
