//! Heuristic status and priority extraction from message text.
//!
//! Status comes from an ordered list of `(name, pattern, normaliser)` rules;
//! the first rule whose pattern matches wins. Priority comes from an explicit
//! `priority:` label, then keyword lists checked high, medium, low.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

use crate::model::{Priority, Status};

/// Status words, as one capture group.
const STATUS_WORD: &str = r"(open(?:ed)?|clos(?:ed|ing)|resolv(?:ed|ing)|in[\s_-]progress)";

/// One ordered status rule.
pub struct StatusRule {
    pub name: &'static str,
    pub pattern: Regex,
    normalise: fn(&str) -> Option<Status>,
}

impl StatusRule {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(&pattern.replace("{STATUS}", STATUS_WORD)).unwrap(),
            normalise: normalise_status_word,
        }
    }

    /// Apply the rule to `text`, returning the normalised status on a match.
    #[must_use]
    pub fn apply(&self, text: &str) -> Option<Status> {
        let caps = self.pattern.captures(text)?;
        (self.normalise)(caps.get(1)?.as_str())
    }
}

impl fmt::Debug for StatusRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

static STATUS_RULES: Lazy<Vec<StatusRule>> = Lazy::new(|| {
    vec![
        StatusRule::new("label", r"(?i)\b(?:status|state)\s*:\s*{STATUS}\b"),
        StatusRule::new("bracketed", r"(?i)\[\s*{STATUS}\s*\]"),
        StatusRule::new(
            "verb_phrase",
            r"(?i)\b(?:bug|issue|ticket)\s+(?:is|has\s+been|was)\s+{STATUS}\b",
        ),
        StatusRule::new("bare_word", r"(?i)\b{STATUS}\b"),
    ]
});

static PRIORITY_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bpriority\s*:\s*(high|medium|low)\b").unwrap());

/// Map a matched status word onto its canonical value.
#[must_use]
pub fn normalise_status_word(word: &str) -> Option<Status> {
    let word = word.to_lowercase();
    if word.starts_with("open") {
        Some(Status::Open)
    } else if word.starts_with("clos") {
        Some(Status::Closed)
    } else if word.starts_with("resolv") {
        Some(Status::Resolved)
    } else if word.starts_with("in") && word.ends_with("progress") {
        Some(Status::InProgress)
    } else {
        None
    }
}

/// The ordered status rules, first match wins.
#[must_use]
pub fn status_rules() -> &'static [StatusRule] {
    &STATUS_RULES
}

/// Which priority rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityRule {
    Label,
    HighKeyword,
    MediumKeyword,
    LowKeyword,
    Default,
}

impl PriorityRule {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Label => "label",
            Self::HighKeyword => "high_keyword",
            Self::MediumKeyword => "medium_keyword",
            Self::LowKeyword => "low_keyword",
            Self::Default => "default",
        }
    }
}

/// Priority keyword lists. Matching is case-insensitive substring search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifierPolicy {
    pub high: Vec<String>,
    pub medium: Vec<String>,
    pub low: Vec<String>,
}

impl Default for ClassifierPolicy {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| (*w).to_string()).collect();
        Self {
            high: owned(&[
                "urgent",
                "high",
                "critical",
                "blocker",
                "emergency",
                "p1",
                "priority 1",
            ]),
            medium: owned(&["medium", "normal", "moderate", "p2", "priority 2"]),
            low: owned(&["low", "minor", "trivial", "p3", "priority 3"]),
        }
    }
}

impl ClassifierPolicy {
    /// Replace the default list for each level that has an override.
    #[must_use]
    pub fn with_overrides(
        mut self,
        high: Option<Vec<String>>,
        medium: Option<Vec<String>>,
        low: Option<Vec<String>>,
    ) -> Self {
        if let Some(words) = high {
            self.high = words;
        }
        if let Some(words) = medium {
            self.medium = words;
        }
        if let Some(words) = low {
            self.low = words;
        }
        self
    }
}

/// Split a comma-separated keyword list, lower-cased, empties dropped.
#[must_use]
pub fn parse_keyword_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Classifier output, with the rules that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub status: Status,
    pub priority: Priority,
    /// Name of the status rule that fired, `None` when the default applied.
    pub status_rule: Option<&'static str>,
    pub priority_rule: PriorityRule,
    /// Keyword that decided the priority, for keyword rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_keyword: Option<String>,
}

/// Derives status and priority from subject and body text.
#[derive(Debug, Clone, Default)]
pub struct FieldClassifier {
    policy: ClassifierPolicy,
}

impl FieldClassifier {
    #[must_use]
    pub const fn new(policy: ClassifierPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &ClassifierPolicy {
        &self.policy
    }

    /// Classify a message from its subject and body.
    #[must_use]
    pub fn classify(&self, subject: &str, body: &str) -> Classification {
        let text = format!("{subject} {body}");
        let (status, status_rule) = classify_status(&text);
        let (priority, priority_rule, matched_keyword) = self.classify_priority(&text);
        Classification {
            status,
            priority,
            status_rule,
            priority_rule,
            matched_keyword,
        }
    }

    fn classify_priority(&self, text: &str) -> (Priority, PriorityRule, Option<String>) {
        if let Some(caps) = PRIORITY_LABEL.captures(text) {
            if let Some(Ok(priority)) = caps.get(1).map(|m| m.as_str().parse::<Priority>()) {
                return (priority, PriorityRule::Label, None);
            }
        }

        let lowered = text.to_lowercase();
        let levels = [
            (Priority::High, PriorityRule::HighKeyword, &self.policy.high),
            (Priority::Medium, PriorityRule::MediumKeyword, &self.policy.medium),
            (Priority::Low, PriorityRule::LowKeyword, &self.policy.low),
        ];
        for (priority, rule, keywords) in levels {
            if let Some(hit) = keywords
                .iter()
                .find(|k| !k.is_empty() && lowered.contains(&k.to_lowercase()))
            {
                return (priority, rule, Some(hit.clone()));
            }
        }

        (Priority::Medium, PriorityRule::Default, None)
    }
}

fn classify_status(text: &str) -> (Status, Option<&'static str>) {
    STATUS_RULES
        .iter()
        .find_map(|rule| rule.apply(text).map(|status| (status, Some(rule.name))))
        .unwrap_or((Status::Open, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(subject: &str, body: &str) -> Classification {
        FieldClassifier::default().classify(subject, body)
    }

    #[test]
    fn urgent_subject_is_high() {
        let c = classify("URGENT: server down", "");
        assert_eq!(c.priority, Priority::High);
        assert_eq!(c.priority_rule, PriorityRule::HighKeyword);
        assert_eq!(c.matched_keyword.as_deref(), Some("urgent"));
    }

    #[test]
    fn status_label_in_body() {
        let c = classify("status", "Status: resolved");
        assert_eq!(c.status, Status::Resolved);
        assert_eq!(c.status_rule, Some("label"));
    }

    #[test]
    fn no_keywords_defaults() {
        let c = classify("x", "y");
        assert_eq!(c.status, Status::Open);
        assert_eq!(c.priority, Priority::Medium);
        assert_eq!(c.status_rule, None);
        assert_eq!(c.priority_rule, PriorityRule::Default);
    }

    #[test]
    fn rule_order_label_beats_bare_word() {
        let c = classify("Closed the ticket", "state: in-progress");
        assert_eq!(c.status, Status::InProgress);
        assert_eq!(c.status_rule, Some("label"));
    }

    #[test]
    fn bracketed_beats_verb_phrase() {
        let c = classify("[Resolving] crash", "the bug was closed");
        assert_eq!(c.status, Status::Resolved);
        assert_eq!(c.status_rule, Some("bracketed"));
    }

    #[test]
    fn verb_phrase_beats_bare_word() {
        let c = classify("opened report", "The issue has been closed");
        assert_eq!(c.status, Status::Closed);
        assert_eq!(c.status_rule, Some("verb_phrase"));
    }

    #[test]
    fn bare_word_normalisation() {
        assert_eq!(classify("closing this", "").status, Status::Closed);
        assert_eq!(classify("work In_Progress", "").status, Status::InProgress);
        assert_eq!(classify("now in progress", "").status, Status::InProgress);
        assert_eq!(classify("resolved", "").status, Status::Resolved);
        assert_eq!(classify("opened", "").status, Status::Open);
    }

    #[test]
    fn bare_word_respects_word_boundaries() {
        let c = classify("reopened undisclosed", "");
        assert_eq!(c.status, Status::Open);
        assert_eq!(c.status_rule, None);
    }

    #[test]
    fn priority_label_beats_keywords() {
        let c = classify("urgent", "Priority: low");
        assert_eq!(c.priority, Priority::Low);
        assert_eq!(c.priority_rule, PriorityRule::Label);
    }

    #[test]
    fn keyword_levels_in_order() {
        assert_eq!(classify("minor glitch, p2", "").priority, Priority::Medium);
        assert_eq!(classify("trivial typo", "").priority, Priority::Low);
        assert_eq!(classify("Blocker", "").priority, Priority::High);
        assert_eq!(classify("x", "this is priority 3").priority, Priority::Low);
    }

    #[test]
    fn keywords_match_as_substrings() {
        // "slow" contains "low".
        assert_eq!(classify("slow page", "").priority, Priority::Low);
    }

    #[test]
    fn custom_policy_replaces_level() {
        let policy = ClassifierPolicy::default().with_overrides(
            Some(vec!["sev1".to_string()]),
            None,
            None,
        );
        let classifier = FieldClassifier::new(policy);
        assert_eq!(classifier.classify("SEV1 outage", "").priority, Priority::High);
        assert_eq!(classifier.classify("urgent", "").priority, Priority::Medium);
    }

    #[test]
    fn parse_keyword_list_trims() {
        assert_eq!(
            parse_keyword_list(" Sev1, ,outage "),
            vec!["sev1".to_string(), "outage".to_string()]
        );
    }

    #[test]
    fn rules_are_ordered() {
        let names: Vec<&str> = status_rules().iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["label", "bracketed", "verb_phrase", "bare_word"]);
    }
}
