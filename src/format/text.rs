//! Text formatting functions for `bugmail`.
//!
//! Plain or colored terminal output:
//! - Status icons (○ ◐ ✓ ●)
//! - Priority badges ([High], [Medium], [Low])
//! - Bug lines, details, statistics and poll cycle summaries

use std::fmt::Write as _;

use crossterm::style::Stylize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::output::{BugDetails, Statistics};
use crate::classify::Classification;
use crate::ingest::{CycleReport, MessageResult};
use crate::model::{Bug, Event, Priority, Status};

/// Status icon characters.
pub mod icons {
    /// Open bug (hollow circle).
    pub const OPEN: &str = "○";
    /// Being worked on (half-filled).
    pub const IN_PROGRESS: &str = "◐";
    /// Fix delivered (checkmark).
    pub const RESOLVED: &str = "✓";
    /// Closed (filled circle).
    pub const CLOSED: &str = "●";
}

/// Width of the longest bar in the per-day chart.
const CHART_WIDTH: i64 = 40;

/// Formatting options for text output.
#[derive(Debug, Clone, Copy)]
pub struct TextFormatOptions {
    pub use_color: bool,
    pub max_width: Option<usize>,
}

impl TextFormatOptions {
    #[must_use]
    pub const fn plain() -> Self {
        Self {
            use_color: false,
            max_width: None,
        }
    }
}

/// Return the icon character for a status.
#[must_use]
pub const fn format_status_icon(status: Status) -> &'static str {
    match status {
        Status::Open => icons::OPEN,
        Status::InProgress => icons::IN_PROGRESS,
        Status::Resolved => icons::RESOLVED,
        Status::Closed => icons::CLOSED,
    }
}

/// Format status label with optional color.
#[must_use]
pub fn format_status_label(status: Status, use_color: bool) -> String {
    let label = status.as_str();
    if !use_color {
        return label.to_string();
    }

    match status {
        Status::Open => label.green().to_string(),
        Status::InProgress => label.yellow().to_string(),
        Status::Resolved => label.blue().to_string(),
        Status::Closed => label.dark_grey().to_string(),
    }
}

/// Format status icon with optional color.
#[must_use]
pub fn format_status_icon_colored(status: Status, use_color: bool) -> String {
    let icon = format_status_icon(status);
    if !use_color {
        return icon.to_string();
    }

    match status {
        Status::Open => icon.green().to_string(),
        Status::InProgress => icon.yellow().to_string(),
        Status::Resolved => icon.blue().to_string(),
        Status::Closed => icon.dark_grey().to_string(),
    }
}

/// Format priority label with optional color.
#[must_use]
pub fn format_priority_label(priority: Priority, use_color: bool) -> String {
    let label = priority.label();
    if !use_color {
        return label.to_string();
    }

    match priority {
        Priority::High => label.red().bold().to_string(),
        Priority::Medium => label.yellow().to_string(),
        Priority::Low => label.dark_grey().to_string(),
    }
}

/// Format priority badge with optional color.
#[must_use]
pub fn format_priority_badge(priority: Priority, use_color: bool) -> String {
    format!("[{}]", format_priority_label(priority, use_color))
}

/// Determine terminal width from environment (falls back to 80).
#[must_use]
pub fn terminal_width() -> usize {
    if let Ok(columns) = std::env::var("COLUMNS") {
        if let Ok(value) = columns.trim().parse::<usize>() {
            if value > 0 {
                return value;
            }
        }
    }
    80
}

/// Truncate a subject to fit within `max_len` visible columns.
///
/// Handles wide characters (emojis, CJK) correctly using `unicode-width`.
#[must_use]
pub fn truncate_subject(subject: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(subject) <= max_len {
        return subject.to_string();
    }

    let (target, ellipsis) = if max_len <= 3 {
        (max_len, "")
    } else {
        (max_len - 3, "...")
    };
    let mut w = 0;
    let mut s = String::new();
    for c in subject.chars() {
        let cw = UnicodeWidthChar::width(c).unwrap_or(0);
        if w + cw > target {
            break;
        }
        w += cw;
        s.push(c);
    }
    s.push_str(ellipsis);
    s
}

fn visible_len(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// Format a single-line bug summary with options.
///
/// Format: `{icon} {id} [{priority}] {subject}`
#[must_use]
pub fn format_bug_line_with(bug: &Bug, options: TextFormatOptions) -> String {
    let priority_badge_plain = format_priority_badge(bug.priority, false);
    let prefix_len = visible_len(format_status_icon(bug.status))
        + 1
        + visible_len(&bug.bug_id)
        + 1
        + visible_len(&priority_badge_plain)
        + 1;

    let subject = options.max_width.map_or_else(
        || bug.subject.clone(),
        |width| truncate_subject(&bug.subject, width.saturating_sub(prefix_len)),
    );

    let icon = format_status_icon_colored(bug.status, options.use_color);
    let badge = format_priority_badge(bug.priority, options.use_color);
    format!("{icon} {} {badge} {subject}", bug.bug_id)
}

/// Format a single-line bug summary.
#[must_use]
pub fn format_bug_line(bug: &Bug) -> String {
    format_bug_line_with(bug, TextFormatOptions::plain())
}

/// One audit event: `{timestamp} {type} {change} by {actor}`.
#[must_use]
pub fn format_event_line(event: &Event) -> String {
    let mut line = format!(
        "{} {}",
        event.created_at.format("%Y-%m-%d %H:%M:%S"),
        event.event_type.as_str()
    );
    match (&event.old_value, &event.new_value) {
        (Some(old), Some(new)) => {
            let _ = write!(line, " {old} → {new}");
        }
        (None, Some(new)) => {
            let _ = write!(line, " {new}");
        }
        _ => {}
    }
    if let Some(comment) = &event.comment {
        let _ = write!(line, " ({comment})");
    }
    let _ = write!(line, " by {}", event.actor);
    line
}

/// Multi-line view of one bug.
#[must_use]
pub fn format_bug_details(details: &BugDetails, use_color: bool) -> String {
    let bug = &details.bug;
    let header = if use_color {
        bug.bug_id.as_str().bold().to_string()
    } else {
        bug.bug_id.clone()
    };

    let mut out = format!("{header}: {}\n", bug.subject);
    let _ = writeln!(
        out,
        "Status: {}    Priority: {}    Modifications: {}",
        format_status_label(bug.status, use_color),
        format_priority_label(bug.priority, use_color),
        bug.modification_count
    );
    let _ = writeln!(
        out,
        "Created: {}    Updated: {}",
        bug.created_at.format("%Y-%m-%d %H:%M:%S"),
        bug.updated_at.format("%Y-%m-%d %H:%M:%S")
    );

    if !bug.description.trim().is_empty() {
        out.push('\n');
        for line in bug.description.trim_end().lines() {
            let _ = writeln!(out, "  {line}");
        }
    }

    if !details.events.is_empty() {
        out.push_str("\nHistory:\n");
        for event in &details.events {
            let _ = writeln!(out, "  {}", format_event_line(event));
        }
    }
    out
}

/// What the classifier decided and which rule decided it.
#[must_use]
pub fn format_classification(classification: &Classification, use_color: bool) -> String {
    let status_rule = classification.status_rule.unwrap_or("default");
    let mut out = format!(
        "Status:   {} (rule: {status_rule})\n",
        format_status_label(classification.status, use_color)
    );
    let _ = write!(
        out,
        "Priority: {} (rule: {}",
        format_priority_label(classification.priority, use_color),
        classification.priority_rule.as_str()
    );
    if let Some(keyword) = &classification.matched_keyword {
        let _ = write!(out, ", keyword: {keyword:?}");
    }
    out.push(')');
    out
}

/// Summary of a poll cycle, one line per message.
#[must_use]
pub fn format_cycle_report(report: &CycleReport, use_color: bool) -> String {
    let mut out = format!(
        "Poll cycle: {} unread, {} created, {} updated, {} failed\n",
        report.listed, report.created, report.updated, report.failed
    );
    if let Some(reason) = &report.listing_error {
        let _ = writeln!(out, "  listing failed, treated as empty: {reason}");
    }

    for message in &report.messages {
        let bug = message.bug_id.as_deref().unwrap_or("-");
        let line = match &message.result {
            MessageResult::Created { .. } => format!("#{} {bug} created", message.message_id),
            MessageResult::Updated {
                modification_count,
                content_changed,
            } => format!(
                "#{} {bug} updated (modifications: {modification_count}{})",
                message.message_id,
                if *content_changed { "" } else { ", unchanged" }
            ),
            MessageResult::Failed { stage, error } => {
                let text = format!("#{} {bug} failed at {stage:?}: {error}", message.message_id);
                if use_color { text.red().to_string() } else { text }
            }
        };
        let _ = writeln!(out, "  {line}");
    }
    out
}

/// Totals plus a bar chart of modifications per day.
#[must_use]
pub fn format_statistics(stats: &Statistics, use_color: bool) -> String {
    let mut out = format!(
        "Bugs: {}    Total modifications: {}\n",
        stats.total, stats.total_modifications
    );

    out.push_str("\nBy status:\n");
    for entry in &stats.by_status {
        let _ = writeln!(out, "  {:<12} {}", entry.value, entry.count);
    }
    out.push_str("\nBy priority:\n");
    for entry in &stats.by_priority {
        let _ = writeln!(out, "  {:<12} {}", entry.value, entry.count);
    }

    let _ = writeln!(out, "\nModifications, last {} days:", stats.days);
    let max = stats
        .modifications_per_day
        .iter()
        .map(|d| d.modifications)
        .max()
        .unwrap_or(0);
    for day in &stats.modifications_per_day {
        let len = if max > 0 {
            usize::try_from(day.modifications * CHART_WIDTH / max).unwrap_or(0)
        } else {
            0
        };
        let bar = "█".repeat(len);
        let bar = if use_color { bar.cyan().to_string() } else { bar };
        let _ = writeln!(out, "  {} {:>4} {bar}", day.day, day.modifications);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{BreakdownEntry, DayCount};
    use crate::ingest::{FailureStage, MessageOutcome};
    use crate::model::EventType;
    use chrono::{TimeZone, Utc};

    fn make_test_bug() -> Bug {
        let ts = Utc.with_ymd_and_hms(2026, 2, 1, 9, 30, 0).unwrap();
        Bug {
            bug_id: "BUG-42".to_string(),
            subject: "Checkout fails".to_string(),
            description: "Steps:\n1. add item\n2. pay".to_string(),
            status: Status::Open,
            priority: Priority::Medium,
            modification_count: 2,
            content_hash: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_status_icons() {
        assert_eq!(format_status_icon(Status::Open), "○");
        assert_eq!(format_status_icon(Status::InProgress), "◐");
        assert_eq!(format_status_icon(Status::Resolved), "✓");
        assert_eq!(format_status_icon(Status::Closed), "●");
    }

    #[test]
    fn test_plain_labels() {
        assert_eq!(format_status_label(Status::InProgress, false), "in_progress");
        assert_eq!(format_priority_badge(Priority::High, false), "[High]");
    }

    #[test]
    fn test_format_bug_line() {
        let line = format_bug_line(&make_test_bug());
        assert_eq!(line, "○ BUG-42 [Medium] Checkout fails");
    }

    #[test]
    fn test_format_bug_line_with_truncation() {
        let mut bug = make_test_bug();
        bug.subject = "A very long subject that will not fit".to_string();
        let options = TextFormatOptions {
            use_color: false,
            max_width: Some(30),
        };
        let line = format_bug_line_with(&bug, options);
        assert!(line.ends_with("..."));
        assert!(visible_len(&line) <= 30);
    }

    #[test]
    fn test_truncate_subject() {
        assert_eq!(truncate_subject("This is a long subject", 10), "This is...");
        assert_eq!(truncate_subject("short", 10), "short");
        assert_eq!(truncate_subject("abcdef", 2), "ab");
        assert_eq!(truncate_subject("abc", 0), "");
    }

    #[test]
    fn test_event_line() {
        let event = Event {
            id: 1,
            bug_id: "BUG-42".to_string(),
            event_type: EventType::StatusChanged,
            actor: "admin".to_string(),
            old_value: Some("open".to_string()),
            new_value: Some("resolved".to_string()),
            comment: None,
            created_at: Utc.with_ymd_and_hms(2026, 2, 2, 8, 0, 0).unwrap(),
        };
        assert_eq!(
            format_event_line(&event),
            "2026-02-02 08:00:00 status_changed open → resolved by admin"
        );
    }

    #[test]
    fn test_details_include_description_and_history() {
        let details = BugDetails {
            bug: make_test_bug(),
            events: vec![Event {
                id: 1,
                bug_id: "BUG-42".to_string(),
                event_type: EventType::Created,
                actor: "mail-ingest".to_string(),
                old_value: None,
                new_value: None,
                comment: None,
                created_at: Utc.with_ymd_and_hms(2026, 2, 1, 9, 30, 0).unwrap(),
            }],
        };
        let text = format_bug_details(&details, false);
        assert!(text.starts_with("BUG-42: Checkout fails\n"));
        assert!(text.contains("Modifications: 2"));
        assert!(text.contains("  1. add item"));
        assert!(text.contains("History:\n  2026-02-01 09:30:00 created by mail-ingest"));
    }

    #[test]
    fn test_cycle_report_lines() {
        let now = Utc::now();
        let report = CycleReport {
            started_at: now,
            finished_at: now,
            listed: 3,
            created: 1,
            updated: 1,
            failed: 1,
            listing_error: None,
            messages: vec![
                MessageOutcome {
                    message_id: 1,
                    bug_id: Some("A-1".to_string()),
                    result: MessageResult::Created {
                        modification_count: 0,
                    },
                },
                MessageOutcome {
                    message_id: 3,
                    bug_id: Some("A-2".to_string()),
                    result: MessageResult::Updated {
                        modification_count: 4,
                        content_changed: false,
                    },
                },
                MessageOutcome {
                    message_id: 2,
                    bug_id: None,
                    result: MessageResult::Failed {
                        stage: FailureStage::Fetch,
                        error: "timeout".to_string(),
                    },
                },
            ],
        };
        let text = format_cycle_report(&report, false);
        assert!(text.starts_with("Poll cycle: 3 unread, 1 created, 1 updated, 1 failed"));
        assert!(text.contains("#3 A-2 updated (modifications: 4, unchanged)"));
        assert!(text.contains("#1 A-1 created"));
        assert!(text.contains("#2 - failed at Fetch: timeout"));
    }

    #[test]
    fn test_statistics_chart_scales_to_max() {
        let stats = Statistics {
            total: 3,
            total_modifications: 6,
            by_status: vec![BreakdownEntry {
                value: "open".to_string(),
                count: 3,
            }],
            by_priority: vec![],
            days: 2,
            modifications_per_day: vec![
                DayCount {
                    day: "2026-02-01".to_string(),
                    modifications: 2,
                },
                DayCount {
                    day: "2026-02-02".to_string(),
                    modifications: 4,
                },
            ],
        };
        let text = format_statistics(&stats, false);
        assert!(text.contains(&format!("2026-02-02    4 {}", "█".repeat(40))));
        assert!(text.contains(&format!("2026-02-01    2 {}", "█".repeat(20))));
    }
}
