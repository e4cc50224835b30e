//! Output formatting for `bugmail`.
//!
//! Human-readable text for terminals and serializable view types for
//! `--json`. JSON goes to stdout, diagnostics to stderr.
//!
//! # Output Types
//!
//! - [`BugDetails`] - Bug with its recent audit events (show)
//! - [`Statistics`] - Totals and modifications per day (stats)

mod output;
mod text;

pub use output::{BreakdownEntry, BugDetails, DayCount, Statistics};
pub use text::{
    TextFormatOptions, format_bug_details, format_bug_line, format_bug_line_with,
    format_classification, format_cycle_report, format_event_line, format_priority_badge,
    format_priority_label, format_statistics, format_status_icon, format_status_icon_colored,
    format_status_label, terminal_width, truncate_subject,
};
