//! `bugmail` - bug tracker fed by an IMAP inbox
//!
//! Each unread message is parsed for a `Bug ID:` marker, classified into a
//! status and priority, and upserted into a SQLite-backed bug record.
//!
//! # Architecture
//!
//! - [`mail`] - Mail server seams, IMAP over TLS, message parsing
//! - [`classify`] - Status/priority heuristics
//! - [`ingest`] - Parse → classify → upsert, and the inbox poll cycle
//! - [`storage`] - `SQLite` database layer
//! - [`model`] - Data types (Bug, Event)
//! - [`config`] - Layered configuration
//! - [`cli`] - Command-line interface using clap
//! - [`format`] / [`output`] - Text and JSON rendering
//! - [`error`] - Error types and handling
//! - [`util`] - Identifiers, hashing, time helpers

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod ingest;
pub mod logging;
pub mod mail;
pub mod model;
pub mod output;
pub mod storage;
pub mod util;

pub use error::{BugmailError, ErrorCode, Result, StructuredError};
