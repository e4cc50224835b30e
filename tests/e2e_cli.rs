//! End-to-end tests driving the `bugmail` binary.

mod common;

use common::cli::{Workspace, extract_json_payload, run_bugmail, run_bugmail_with_env};
use common::fixtures::{bug_message, plain_message};
use predicates::prelude::*;
use predicates::str::contains;

fn error_code(stderr: &str) -> String {
    let value: serde_json::Value = serde_json::from_str(&extract_json_payload(stderr))
        .unwrap_or_else(|e| panic!("stderr is not JSON ({e}):\n{stderr}"));
    value["error"]["code"].as_str().unwrap_or_default().to_string()
}

#[test]
fn error_payload_is_found_after_log_lines() {
    let stderr = "2026-10-19T08:46:50Z DEBUG bugmail::config: Opened storage\n\
                  2026-10-19T08:46:50Z  INFO bugmail: starting\n\
                  {\n  \"error\": {\n    \"code\": \"CONFIG_ERROR\"\n  }\n}\n";
    assert_eq!(error_code(stderr), "CONFIG_ERROR");
}

#[test]
fn e2e_init_creates_workspace() {
    let _log = common::test_log("e2e_init_creates_workspace");
    let ws = Workspace::new();

    let run = run_bugmail(&ws, ["init"]);
    assert!(run.status.success(), "init failed: {}", run.stderr);
    assert!(ws.root.join(".bugmail").join("bugmail.db").is_file());
    assert!(ws.root.join(".bugmail").join("config.yaml").is_file());
    assert!(ws.root.join(".bugmail").join(".gitignore").is_file());

    let again = run_bugmail(&ws, ["init"]);
    assert_eq!(again.status.code(), Some(2));
    assert_eq!(error_code(&again.stderr), "ALREADY_INITIALIZED");

    let forced = run_bugmail(&ws, ["init", "--force"]);
    assert!(forced.status.success(), "init --force failed: {}", forced.stderr);
}

#[test]
fn e2e_ingest_creates_then_updates() {
    let _log = common::test_log("e2e_ingest_creates_then_updates");
    let ws = Workspace::initialized();
    let first = ws.write_message(
        "first.eml",
        &bug_message("WEB-7", "login crashes", "Urgent: the login page crashes."),
    );
    let second = ws.write_message(
        "second.eml",
        &bug_message("WEB-7", "login crashes", "Status: resolved after deploy."),
    );

    let run = run_bugmail(&ws, ["ingest", "--json", first.to_str().unwrap()]);
    assert!(run.status.success(), "ingest failed: {}", run.stderr);
    let results = run.json();
    assert_eq!(results[0]["bug_id"], "WEB-7");
    assert_eq!(results[0]["action"], "created");
    assert_eq!(results[0]["modification_count"], 0);

    let run = run_bugmail(&ws, ["ingest", "--json", second.to_str().unwrap()]);
    assert!(run.status.success(), "ingest failed: {}", run.stderr);
    let results = run.json();
    assert_eq!(results[0]["action"], "updated");
    assert_eq!(results[0]["modification_count"], 1);

    let show = run_bugmail(&ws, ["show", "--json", "WEB-7"]);
    assert!(show.status.success(), "show failed: {}", show.stderr);
    let details = show.json();
    assert_eq!(details[0]["status"], "resolved");
    assert_eq!(details[0]["priority"], "medium");
    assert_eq!(details[0]["modification_count"], 1);
}

#[test]
fn e2e_ingest_dry_run_writes_nothing() {
    let _log = common::test_log("e2e_ingest_dry_run_writes_nothing");
    let ws = Workspace::initialized();
    let path = ws.write_message("dry.eml", &bug_message("DRY-1", "[closed] old", "body"));

    let run = run_bugmail(&ws, ["ingest", "--dry-run", "--json", path.to_str().unwrap()]);
    assert!(run.status.success(), "dry run failed: {}", run.stderr);
    assert_eq!(run.json()[0]["action"], "classified");

    let list = run_bugmail(&ws, ["list", "--json"]);
    assert_eq!(list.json().as_array().map(Vec::len), Some(0));
}

#[test]
fn e2e_ingest_reports_missing_file() {
    let _log = common::test_log("e2e_ingest_reports_missing_file");
    let ws = Workspace::initialized();
    let good = ws.write_message("good.eml", &bug_message("OK-1", "fine", "body"));

    let run = run_bugmail(
        &ws,
        ["ingest", "--json", good.to_str().unwrap(), "missing.eml"],
    );
    assert_eq!(run.status.code(), Some(4));
    let results = run.json();
    assert_eq!(results[0]["action"], "created");
    assert_eq!(results[1]["action"], "failed");

    let show = run_bugmail(&ws, ["show", "--json", "OK-1"]);
    assert!(show.status.success());
}

#[test]
fn e2e_list_filters_by_status() {
    let _log = common::test_log("e2e_list_filters_by_status");
    let ws = Workspace::initialized();
    let open = ws.write_message("a.eml", &bug_message("L-1", "broken", "still broken"));
    let closed = ws.write_message("b.eml", &bug_message("L-2", "[closed] gone", "done"));
    let run = run_bugmail(
        &ws,
        ["ingest", open.to_str().unwrap(), closed.to_str().unwrap()],
    );
    assert!(run.status.success(), "ingest failed: {}", run.stderr);

    let all = run_bugmail(&ws, ["list", "--json"]).json();
    assert_eq!(all.as_array().map(Vec::len), Some(2));

    let closed_only = run_bugmail(&ws, ["list", "--json", "--status", "closed"]).json();
    let ids: Vec<&str> = closed_only
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|b| b["bug_id"].as_str())
        .collect();
    assert_eq!(ids, vec!["L-2"]);

    let bad = run_bugmail(&ws, ["list", "--json", "--status", "sleeping"]);
    assert_eq!(bad.status.code(), Some(4));
    assert_eq!(error_code(&bad.stderr), "INVALID_STATUS");
}

#[test]
fn e2e_mark_history_and_delete() {
    let _log = common::test_log("e2e_mark_history_and_delete");
    let ws = Workspace::initialized();
    let path = ws.write_message("m.eml", &bug_message("M-1", "slow page", "it is slow"));
    assert!(run_bugmail(&ws, ["ingest", path.to_str().unwrap()]).status.success());

    let mark = run_bugmail(&ws, ["mark", "--json", "--actor", "ops", "resolved", "M-1"]);
    assert!(mark.status.success(), "mark failed: {}", mark.stderr);
    assert_eq!(mark.json()["updated"][0], "M-1");

    let show = run_bugmail(&ws, ["show", "--json", "M-1"]).json();
    assert_eq!(show[0]["status"], "resolved");
    assert_eq!(show[0]["modification_count"], 0);

    let history = run_bugmail(&ws, ["history", "--json", "M-1"]).json();
    let events = history.as_array().unwrap();
    assert_eq!(events[0]["event_type"], "status_changed");
    assert_eq!(events[0]["actor"], "ops");
    assert_eq!(events.last().unwrap()["event_type"], "created");

    let delete = run_bugmail(&ws, ["delete", "--json", "M-1"]);
    assert!(delete.status.success(), "delete failed: {}", delete.stderr);
    assert_eq!(delete.json()["deleted"][0], "M-1");

    let gone = run_bugmail(&ws, ["show", "M-1"]);
    assert_eq!(gone.status.code(), Some(3));
    assert_eq!(error_code(&gone.stderr), "BUG_NOT_FOUND");

    let kept = run_bugmail(&ws, ["history", "--json", "M-1"]).json();
    assert_eq!(kept[0]["event_type"], "deleted");
}

#[test]
fn e2e_mark_unknown_bug_fails() {
    let _log = common::test_log("e2e_mark_unknown_bug_fails");
    let ws = Workspace::initialized();
    let run = run_bugmail(&ws, ["mark", "closed", "NOPE-1"]);
    assert_eq!(run.status.code(), Some(3));
}

#[test]
fn e2e_stats_counts_modifications() {
    let _log = common::test_log("e2e_stats_counts_modifications");
    let ws = Workspace::initialized();
    let raw = bug_message("S-1", "crash", "urgent crash");
    let path = ws.write_message("s.eml", &raw);
    for _ in 0..3 {
        assert!(run_bugmail(&ws, ["ingest", path.to_str().unwrap()]).status.success());
    }
    let other = ws.write_message("t.eml", &plain_message("no marker here", "minor glitch"));
    assert!(run_bugmail(&ws, ["ingest", other.to_str().unwrap()]).status.success());

    let stats = run_bugmail(&ws, ["stats", "--json", "--days", "3"]);
    assert!(stats.status.success(), "stats failed: {}", stats.stderr);
    let stats = stats.json();
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["total_modifications"], 2);
    let days = stats["modifications_per_day"].as_array().unwrap();
    assert_eq!(days.len(), 3);
    assert_eq!(days[2]["modifications"], 2);
}

#[test]
fn e2e_classify_reports_rules() {
    let _log = common::test_log("e2e_classify_reports_rules");
    let ws = Workspace::new();

    let run = run_bugmail(
        &ws,
        ["classify", "--json", "--subject", "URGENT: server down"],
    );
    assert!(run.status.success(), "classify failed: {}", run.stderr);
    let c = run.json();
    assert_eq!(c["priority"], "high");
    assert_eq!(c["priority_rule"], "high_keyword");
    assert_eq!(c["status"], "open");

    let run = run_bugmail(&ws, ["classify", "--json", "-s", "status", "-b", "Status: resolved"]);
    assert_eq!(run.json()["status"], "resolved");
}

#[test]
fn e2e_poll_without_password_is_config_error() {
    let _log = common::test_log("e2e_poll_without_password_is_config_error");
    let ws = Workspace::initialized();

    let run = run_bugmail(&ws, ["poll"]);
    assert_eq!(run.status.code(), Some(7));
    assert_eq!(error_code(&run.stderr), "CONFIG_ERROR");
    assert!(run.stderr.contains("BUGMAIL_IMAP_PASSWORD"));
}

#[test]
fn e2e_poll_unreachable_host_is_mail_error() {
    let _log = common::test_log("e2e_poll_unreachable_host_is_mail_error");
    let ws = Workspace::initialized();

    let run = run_bugmail_with_env(
        &ws,
        ["poll"],
        [
            ("BUGMAIL_IMAP_HOST", "127.0.0.1"),
            ("BUGMAIL_IMAP_PORT", "1"),
            ("BUGMAIL_IMAP_PASSWORD", "secret"),
        ],
    );
    assert_eq!(run.status.code(), Some(9));
    assert_eq!(error_code(&run.stderr), "MAIL_CONNECT_FAILED");
    assert!(!run.stderr.contains("secret"));
}

#[test]
fn e2e_config_set_and_get() {
    let _log = common::test_log("e2e_config_set_and_get");
    let ws = Workspace::initialized();

    let set = run_bugmail(&ws, ["config", "set", "poll.interval-secs", "30"]);
    assert!(set.status.success(), "config set failed: {}", set.stderr);

    let get = run_bugmail(&ws, ["config", "get", "--json", "poll.interval-secs"]);
    assert_eq!(get.json()["poll.interval-secs"], "30");

    let startup = run_bugmail(&ws, ["config", "set", "imap.host", "mail.example.com"]);
    assert_eq!(startup.status.code(), Some(7));
    assert_eq!(error_code(&startup.stderr), "CONFIG_ERROR");

    let list = run_bugmail_with_env(
        &ws,
        ["config", "list", "--json"],
        [("BUGMAIL_IMAP_PASSWORD", "hunter2")],
    );
    assert!(list.status.success(), "config list failed: {}", list.stderr);
    assert_eq!(list.json()["imap.password"], "********");
    assert!(!list.stdout.contains("hunter2"));
}

#[test]
fn e2e_commands_outside_workspace() {
    let _log = common::test_log("e2e_commands_outside_workspace");
    let ws = Workspace::new();

    for args in [vec!["list"], vec!["poll"], vec!["stats"], vec!["history", "X-1"]] {
        let run = run_bugmail(&ws, &args);
        assert_eq!(run.status.code(), Some(2), "{args:?}: {}", run.stderr);
        assert_eq!(error_code(&run.stderr), "NOT_INITIALIZED");
    }
}

#[test]
fn e2e_version_and_completions() {
    let _log = common::test_log("e2e_version_and_completions");
    let ws = Workspace::new();

    let version = run_bugmail(&ws, ["version", "--json"]);
    assert!(version.status.success());
    assert_eq!(version.json()["version"], env!("CARGO_PKG_VERSION"));

    let completions = run_bugmail(&ws, ["completions", "bash"]);
    assert!(completions.status.success());
    assert!(contains("bugmail").eval(&completions.stdout));
}
