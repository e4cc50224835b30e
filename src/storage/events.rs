//! Event storage operations for `bugmail`.
//!
//! This module implements the audit event system with:
//! - Event insertion (atomic with mutations)
//! - Event retrieval (newest first, DESC ordering)
//! - Daily aggregation of modifications for `stats`

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, params};

use crate::error::Result;
use crate::model::{Event, EventType};
use crate::util::time::parse_stored_datetime;

/// Insert an event within a transaction.
///
/// Must be called within the same transaction as the mutation that
/// triggered the event.
///
/// # Errors
///
/// Returns an error if the database insert fails.
pub fn insert_event(tx: &Transaction<'_>, event: &Event) -> Result<i64> {
    tx.execute(
        r"
        INSERT INTO events (bug_id, event_type, actor, old_value, new_value, comment, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
        params![
            event.bug_id,
            event.event_type.as_str(),
            event.actor,
            event.old_value,
            event.new_value,
            event.comment,
            super::sqlite::format_timestamp(event.created_at),
        ],
    )?;

    Ok(tx.last_insert_rowid())
}

/// Get events for a bug, newest first.
///
/// `limit` of 0 means no limit.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_events(conn: &Connection, bug_id: &str, limit: usize) -> Result<Vec<Event>> {
    let query = if limit > 0 {
        r"
            SELECT id, bug_id, event_type, actor, old_value, new_value, comment, created_at
            FROM events
            WHERE bug_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "
    } else {
        r"
            SELECT id, bug_id, event_type, actor, old_value, new_value, comment, created_at
            FROM events
            WHERE bug_id = ?1
            ORDER BY created_at DESC, id DESC
            "
    };

    let mut stmt = conn.prepare(query)?;
    let events: Vec<Event> = if limit > 0 {
        stmt.query_map(params![bug_id, limit], event_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?
    } else {
        stmt.query_map(params![bug_id], event_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?
    };

    Ok(events)
}

/// Get the most recent events across all bugs.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_recent_events(conn: &Connection, limit: usize) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        r"
        SELECT id, bug_id, event_type, actor, old_value, new_value, comment, created_at
        FROM events
        ORDER BY created_at DESC, id DESC
        LIMIT ?1
        ",
    )?;
    let events = stmt
        .query_map(params![limit.max(1)], event_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(events)
}

/// Get event count for a bug.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn count_events(conn: &Connection, bug_id: &str) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM events WHERE bug_id = ?1",
        params![bug_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Count `updated` events per UTC day since `since`, oldest day first.
///
/// Days without modifications are absent; callers fill gaps.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn modifications_per_day(
    conn: &Connection,
    since: DateTime<Utc>,
) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        r"
        SELECT substr(created_at, 1, 10) AS day, COUNT(*)
        FROM events
        WHERE event_type = 'updated' AND created_at >= ?1
        GROUP BY day
        ORDER BY day ASC
        ",
    )?;
    let rows = stmt
        .query_map(params![super::sqlite::format_timestamp(since)], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn event_from_row(row: &rusqlite::Row) -> rusqlite::Result<Event> {
    let event_type_str: String = row.get(2)?;
    let created_at_str: String = row.get(7)?;

    Ok(Event {
        id: row.get(0)?,
        bug_id: row.get(1)?,
        event_type: EventType::parse(&event_type_str),
        actor: row.get(3)?,
        old_value: row.get(4)?,
        new_value: row.get(5)?,
        comment: row.get(6)?,
        created_at: parse_stored_datetime(&created_at_str),
    })
}
