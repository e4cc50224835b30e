//! Persistent bug store backed by `SQLite`.
//!
//! - `schema` creates tables and pragmas
//! - `sqlite` holds `SqliteStorage` and the transactional upsert
//! - `events` reads and writes the audit trail

pub mod events;
pub mod schema;
pub mod sqlite;

pub use sqlite::{ListFilters, ListSort, MutationContext, SqliteStorage, format_timestamp};
