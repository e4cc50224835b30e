//! `SQLite` storage implementation.

use crate::error::{BugmailError, Result};
use crate::model::{Bug, BugDraft, Event, EventType, MAX_SUBJECT_LEN, Priority, Status, UpsertOutcome};
use crate::storage::events;
use crate::storage::schema::apply_schema;
use crate::util::time::{advance_past, now_micros, parse_stored_datetime};
use crate::util::{truncate_chars, validate_bug_id};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Transaction};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

const BUG_COLUMNS: &str = "bug_id, subject, description, status, priority, modification_count, \
                           content_hash, created_at, updated_at";

/// Persisted timestamp format: RFC3339, microseconds, `Z` suffix.
///
/// Fixed width so that text ordering matches chronological ordering.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation, collecting audit events.
pub struct MutationContext {
    pub op_name: String,
    pub actor: String,
    /// Single clock reading shared by every write in the mutation.
    pub now: DateTime<Utc>,
    pub events: Vec<Event>,
}

impl MutationContext {
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            now: now_micros(),
            events: Vec::new(),
        }
    }

    pub fn record_event(&mut self, event_type: EventType, bug_id: &str, details: Option<String>) {
        self.record_field_change(event_type, bug_id, None, None, details);
    }

    /// Record a field change event with old and new values.
    pub fn record_field_change(
        &mut self,
        event_type: EventType,
        bug_id: &str,
        old_value: Option<String>,
        new_value: Option<String>,
        comment: Option<String>,
    ) {
        self.events.push(Event {
            id: 0,
            bug_id: bug_id.to_string(),
            event_type,
            actor: self.actor.clone(),
            old_value,
            new_value,
            comment,
            created_at: self.now,
        });
    }
}

impl SqliteStorage {
    /// Open a new connection to the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a new connection with an optional busy timeout (ms).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open_with_timeout(path: &Path, lock_timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;
        if let Some(timeout) = lock_timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        }
        apply_schema(&conn).map_err(|e| map_lock_error(e, path))?;
        Ok(Self { conn })
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Execute a mutation with the 4-step transaction protocol:
    /// begin immediate, run `f`, write recorded events, commit.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let mut ctx = MutationContext::new(op, actor);

        let result = f(&tx, &mut ctx)?;

        for event in &ctx.events {
            events::insert_event(&tx, event)?;
        }

        tx.commit()?;
        tracing::trace!(op = %ctx.op_name, events = ctx.events.len(), "mutation committed");

        Ok(result)
    }

    /// Create the bug for `draft.bug_id`, or update it if it already exists.
    ///
    /// The lookup and the write share one immediate transaction. An insert
    /// that loses a race on the unique identifier falls back to the update
    /// path instead of failing.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unusable identifier, or a database error.
    pub fn upsert_bug(&mut self, draft: &BugDraft, actor: &str) -> Result<UpsertOutcome> {
        validate_bug_id(&draft.bug_id)?;
        self.mutate("upsert_bug", actor, |tx, ctx| {
            let existing = select_bug(tx, &draft.bug_id)?;
            apply_upsert(tx, ctx, draft, existing)
        })
    }

    /// Set the status of one bug, recording a `status_changed` event.
    ///
    /// Administrative status changes do not count as modifications:
    /// `modification_count` and `updated_at` are left as they are.
    ///
    /// # Errors
    ///
    /// Returns `BugNotFound` if the bug doesn't exist.
    pub fn set_status(&mut self, bug_id: &str, status: Status, actor: &str) -> Result<Bug> {
        self.mutate("set_status", actor, |tx, ctx| {
            let mut bug = select_bug(tx, bug_id)?.ok_or_else(|| BugmailError::BugNotFound {
                id: bug_id.to_string(),
            })?;
            if bug.status == status {
                return Ok(bug);
            }

            let old = bug.status;
            bug.status = status;
            let hash = bug.compute_content_hash();
            tx.execute(
                "UPDATE bugs SET status = ?, content_hash = ? WHERE bug_id = ?",
                rusqlite::params![status.as_str(), hash, bug_id],
            )?;
            bug.content_hash = Some(hash);

            ctx.record_field_change(
                EventType::StatusChanged,
                bug_id,
                Some(old.as_str().to_string()),
                Some(status.as_str().to_string()),
                None,
            );
            Ok(bug)
        })
    }

    /// Delete a bug. Its events stay, followed by a `deleted` event.
    ///
    /// # Errors
    ///
    /// Returns `BugNotFound` if the bug doesn't exist.
    pub fn delete_bug(&mut self, bug_id: &str, actor: &str) -> Result<Bug> {
        self.mutate("delete_bug", actor, |tx, ctx| {
            let bug = select_bug(tx, bug_id)?.ok_or_else(|| BugmailError::BugNotFound {
                id: bug_id.to_string(),
            })?;
            tx.execute("DELETE FROM bugs WHERE bug_id = ?", [bug_id])?;
            ctx.record_event(
                EventType::Deleted,
                bug_id,
                Some(format!("Deleted bug: {}", bug.subject)),
            );
            Ok(bug)
        })
    }

    /// Get a bug by identifier (exact, case-sensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_bug(&self, bug_id: &str) -> Result<Option<Bug>> {
        select_bug(&self.conn, bug_id)
    }

    /// List bugs with optional filters.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_bugs(&self, filters: &ListFilters) -> Result<Vec<Bug>> {
        let mut sql = format!("SELECT {BUG_COLUMNS} FROM bugs WHERE 1=1");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref statuses) = filters.statuses {
            if !statuses.is_empty() {
                let placeholders: Vec<&str> = statuses.iter().map(|_| "?").collect();
                let _ = write!(sql, " AND status IN ({})", placeholders.join(","));
                for s in statuses {
                    params.push(Box::new(s.as_str().to_string()));
                }
            }
        }

        if let Some(ref priorities) = filters.priorities {
            if !priorities.is_empty() {
                let placeholders: Vec<&str> = priorities.iter().map(|_| "?").collect();
                let _ = write!(sql, " AND priority IN ({})", placeholders.join(","));
                for p in priorities {
                    params.push(Box::new(p.as_str().to_string()));
                }
            }
        }

        if let Some(ref search) = filters.search {
            let trimmed = search.trim();
            if !trimmed.is_empty() {
                sql.push_str(" AND (bug_id LIKE ? OR subject LIKE ? OR description LIKE ?)");
                let pattern = format!("%{trimmed}%");
                params.push(Box::new(pattern.clone()));
                params.push(Box::new(pattern.clone()));
                params.push(Box::new(pattern));
            }
        }

        if let Some(since) = filters.updated_since {
            sql.push_str(" AND updated_at >= ?");
            params.push(Box::new(format_timestamp(since)));
        }

        let order = if filters.reverse { "ASC" } else { "DESC" };
        match filters.sort {
            ListSort::Updated => {
                let _ = write!(sql, " ORDER BY updated_at {order}, id {order}");
            }
            ListSort::Created => {
                let _ = write!(sql, " ORDER BY created_at {order}, id {order}");
            }
            ListSort::Priority => {
                let _ = write!(
                    sql,
                    " ORDER BY CASE priority WHEN 'high' THEN 2 WHEN 'medium' THEN 1 ELSE 0 END {order}, updated_at DESC"
                );
            }
            ListSort::Modifications => {
                let _ = write!(sql, " ORDER BY modification_count {order}, updated_at DESC");
            }
            ListSort::BugId => {
                // Identifiers read naturally A..Z, so the default direction is ascending.
                let order = if filters.reverse { "DESC" } else { "ASC" };
                let _ = write!(sql, " ORDER BY bug_id {order}");
            }
        }

        if let Some(limit) = filters.limit {
            if limit > 0 {
                sql.push_str(" LIMIT ?");
                params.push(Box::new(limit));
            }
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();
        let bugs = stmt
            .query_map(params_refs.as_slice(), bug_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(bugs)
    }

    /// Count all bugs.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn count_bugs(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM bugs", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Bug counts per status, in lifecycle order, zeros included.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn counts_by_status(&self) -> Result<Vec<(Status, usize)>> {
        let counts = self.grouped_counts("status")?;
        Ok(Status::ALL
            .iter()
            .map(|s| (*s, counts.get(s.as_str()).copied().unwrap_or(0)))
            .collect())
    }

    /// Bug counts per priority, highest first, zeros included.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn counts_by_priority(&self) -> Result<Vec<(Priority, usize)>> {
        let counts = self.grouped_counts("priority")?;
        Ok(Priority::ALL
            .iter()
            .map(|p| (*p, counts.get(p.as_str()).copied().unwrap_or(0)))
            .collect())
    }

    fn grouped_counts(&self, column: &str) -> Result<HashMap<String, usize>> {
        let sql = format!("SELECT {column}, COUNT(*) FROM bugs GROUP BY {column}");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut map = HashMap::new();
        for row in rows {
            let (key, count) = row?;
            map.insert(key, usize::try_from(count).unwrap_or(0));
        }
        Ok(map)
    }

    /// Total of all modification counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn total_modifications(&self) -> Result<u64> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(modification_count), 0) FROM bugs",
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    /// Get events for a bug, newest first. `limit` of 0 means all.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_events(&self, bug_id: &str, limit: usize) -> Result<Vec<Event>> {
        events::get_events(&self.conn, bug_id, limit)
    }

    /// Get the most recent events across all bugs.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_recent_events(&self, limit: usize) -> Result<Vec<Event>> {
        events::get_recent_events(&self.conn, limit)
    }

    /// Number of updates per UTC day since `since`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn modifications_per_day(&self, since: DateTime<Utc>) -> Result<Vec<(String, i64)>> {
        events::modifications_per_day(&self.conn, since)
    }

    /// Fetch a config value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM config WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Fetch all config values from the config table.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_all_config(&self) -> Result<HashMap<String, String>> {
        let mut stmt = self.conn.prepare("SELECT key, value FROM config")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

        let mut map = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            map.insert(key, value);
        }
        Ok(map)
    }

    /// Set a config value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub fn set_config(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO config (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    /// Delete a config value.
    ///
    /// Returns `true` if a value was deleted, `false` if the key didn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub fn delete_config(&mut self, key: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM config WHERE key = ?", rusqlite::params![key])?;
        Ok(deleted > 0)
    }
}

/// Sort key for `list_bugs`. Defaults to most recently updated first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListSort {
    #[default]
    Updated,
    Created,
    Priority,
    Modifications,
    BugId,
}

impl std::str::FromStr for ListSort {
    type Err = BugmailError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "updated" | "updated_at" => Ok(Self::Updated),
            "created" | "created_at" => Ok(Self::Created),
            "priority" => Ok(Self::Priority),
            "modifications" | "modification_count" | "mods" => Ok(Self::Modifications),
            "id" | "bug_id" => Ok(Self::BugId),
            other => Err(BugmailError::validation(
                "sort",
                format!("unknown sort key '{other}' (use updated, created, priority, modifications, id)"),
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    pub statuses: Option<Vec<Status>>,
    pub priorities: Option<Vec<Priority>>,
    /// Substring match over identifier, subject and description.
    pub search: Option<String>,
    pub updated_since: Option<DateTime<Utc>>,
    pub sort: ListSort,
    /// Reverse sort order
    pub reverse: bool,
    pub limit: Option<usize>,
}

/// Create-or-update against an already looked-up row.
///
/// `existing` is what the caller saw for `draft.bug_id`. When it is `None`
/// but the insert hits the unique constraint (another writer got there
/// first), the row is re-read and updated instead.
pub(crate) fn apply_upsert(
    tx: &Transaction<'_>,
    ctx: &mut MutationContext,
    draft: &BugDraft,
    existing: Option<Bug>,
) -> Result<UpsertOutcome> {
    if let Some(existing) = existing {
        return update_existing(tx, ctx, draft, existing);
    }

    match insert_new(tx, ctx, draft) {
        Ok(bug) => {
            ctx.record_event(
                EventType::Created,
                &bug.bug_id,
                Some(format!("Created bug: {}", bug.subject)),
            );
            Ok(UpsertOutcome {
                bug,
                created: true,
                content_changed: true,
            })
        }
        Err(err) if is_unique_violation(&err) => {
            tracing::debug!(bug_id = %draft.bug_id, "bug created concurrently; updating instead");
            let existing = select_bug(tx, &draft.bug_id)?.ok_or_else(|| BugmailError::BugNotFound {
                id: draft.bug_id.clone(),
            })?;
            update_existing(tx, ctx, draft, existing)
        }
        Err(err) => Err(err.into()),
    }
}

fn insert_new(
    tx: &Transaction<'_>,
    ctx: &MutationContext,
    draft: &BugDraft,
) -> rusqlite::Result<Bug> {
    let bug = Bug {
        bug_id: draft.bug_id.clone(),
        subject: truncate_chars(&draft.subject, MAX_SUBJECT_LEN).to_string(),
        description: draft.description.clone(),
        status: draft.status,
        priority: draft.priority,
        modification_count: 0,
        content_hash: None,
        created_at: ctx.now,
        updated_at: ctx.now,
    };
    let hash = bug.compute_content_hash();
    let stamp = format_timestamp(ctx.now);

    tx.execute(
        "INSERT INTO bugs (bug_id, subject, description, status, priority, modification_count,
                           content_hash, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?)",
        rusqlite::params![
            bug.bug_id,
            bug.subject,
            bug.description,
            bug.status.as_str(),
            bug.priority.as_str(),
            hash,
            stamp,
            stamp,
        ],
    )?;

    Ok(Bug {
        content_hash: Some(hash),
        ..bug
    })
}

fn update_existing(
    tx: &Transaction<'_>,
    ctx: &mut MutationContext,
    draft: &BugDraft,
    existing: Bug,
) -> Result<UpsertOutcome> {
    let subject = truncate_chars(&draft.subject, MAX_SUBJECT_LEN).to_string();
    let bug = Bug {
        bug_id: existing.bug_id.clone(),
        subject,
        description: draft.description.clone(),
        status: draft.status,
        priority: draft.priority,
        modification_count: existing.modification_count.saturating_add(1),
        content_hash: None,
        created_at: existing.created_at,
        updated_at: advance_past(existing.updated_at, ctx.now),
    };
    let hash = bug.compute_content_hash();
    let content_changed = hash != existing.compute_content_hash();

    tx.execute(
        "UPDATE bugs SET subject = ?, description = ?, status = ?, priority = ?,
                         modification_count = ?, content_hash = ?, updated_at = ?
         WHERE bug_id = ?",
        rusqlite::params![
            bug.subject,
            bug.description,
            bug.status.as_str(),
            bug.priority.as_str(),
            bug.modification_count,
            hash,
            format_timestamp(bug.updated_at),
            bug.bug_id,
        ],
    )?;

    ctx.record_field_change(
        EventType::Updated,
        &bug.bug_id,
        Some(existing.modification_count.to_string()),
        Some(bug.modification_count.to_string()),
        None,
    );
    if existing.status != bug.status {
        ctx.record_field_change(
            EventType::StatusChanged,
            &bug.bug_id,
            Some(existing.status.as_str().to_string()),
            Some(bug.status.as_str().to_string()),
            None,
        );
    }
    if existing.priority != bug.priority {
        ctx.record_field_change(
            EventType::PriorityChanged,
            &bug.bug_id,
            Some(existing.priority.as_str().to_string()),
            Some(bug.priority.as_str().to_string()),
            None,
        );
    }

    Ok(UpsertOutcome {
        bug: Bug {
            content_hash: Some(hash),
            ..bug
        },
        created: false,
        content_changed,
    })
}

fn select_bug(conn: &Connection, bug_id: &str) -> Result<Option<Bug>> {
    let sql = format!("SELECT {BUG_COLUMNS} FROM bugs WHERE bug_id = ?");
    let mut stmt = conn.prepare(&sql)?;
    let result = stmt.query_row([bug_id], bug_from_row);

    match result {
        Ok(bug) => Ok(Some(bug)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn bug_from_row(row: &rusqlite::Row) -> rusqlite::Result<Bug> {
    let status: String = row.get(3)?;
    let priority: String = row.get(4)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(Bug {
        bug_id: row.get(0)?,
        subject: row.get(1)?,
        description: row.get(2)?,
        status: status.parse().map_err(|e| stored_value_error(3, e))?,
        priority: priority.parse().map_err(|e| stored_value_error(4, e))?,
        modification_count: row.get(5)?,
        content_hash: row.get(6)?,
        created_at: parse_stored_datetime(&created_at),
        updated_at: parse_stored_datetime(&updated_at),
    })
}

fn stored_value_error(column: usize, err: BugmailError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        err.to_string().into(),
    )
}

/// Whether an error is a UNIQUE/PRIMARY KEY constraint violation.
#[must_use]
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

fn map_lock_error(err: rusqlite::Error, path: &Path) -> BugmailError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
        {
            BugmailError::DatabaseLocked {
                path: path.to_path_buf(),
            }
        }
        _ => BugmailError::Database(err),
    }
}

#[cfg(test)]
impl SqliteStorage {
    /// Run raw SQL against the connection, for test setup.
    pub(crate) fn execute_test_sql(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}
