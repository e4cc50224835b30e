//! Classifier defaults and precedence over generated text.

use bugmail::classify::{FieldClassifier, PriorityRule};
use bugmail::model::{Priority, Status};
use proptest::prelude::*;

/// Letters that cannot spell any status word or priority keyword.
const NEUTRAL: &str = "[bfgjkqvwxz0-9 ]{0,30}";

proptest! {
    #[test]
    fn neutral_text_gets_defaults(subject in NEUTRAL, body in NEUTRAL) {
        let c = FieldClassifier::default().classify(&subject, &body);
        prop_assert_eq!(c.status, Status::Open);
        prop_assert_eq!(c.priority, Priority::Medium);
        prop_assert_eq!(c.status_rule, None);
        prop_assert_eq!(c.priority_rule, PriorityRule::Default);
    }

    #[test]
    fn urgent_anywhere_is_high(
        prefix in NEUTRAL,
        suffix in NEUTRAL,
        keyword in prop_oneof![Just("urgent"), Just("URGENT"), Just("Urgent")],
        in_body in any::<bool>(),
    ) {
        let text = format!("{prefix}{keyword}{suffix}");
        let c = if in_body {
            FieldClassifier::default().classify("report", &text)
        } else {
            FieldClassifier::default().classify(&text, "")
        };
        prop_assert_eq!(c.priority, Priority::High);
    }

    #[test]
    fn status_label_wins(
        prefix in NEUTRAL,
        suffix in NEUTRAL,
        (word, expected) in prop_oneof![
            Just(("resolved", Status::Resolved)),
            Just(("Closed", Status::Closed)),
            Just(("in progress", Status::InProgress)),
            Just(("in-progress", Status::InProgress)),
            Just(("OPEN", Status::Open)),
        ],
    ) {
        let body = format!("{prefix} Status: {word} {suffix}");
        let c = FieldClassifier::default().classify("update", &body);
        prop_assert_eq!(c.status, expected);
        prop_assert_eq!(c.status_rule, Some("label"));
    }

    #[test]
    fn classification_is_deterministic(subject in ".{0,40}", body in ".{0,80}") {
        let classifier = FieldClassifier::default();
        prop_assert_eq!(
            classifier.classify(&subject, &body),
            classifier.classify(&subject, &body)
        );
    }
}

#[test]
fn documented_examples() {
    let classifier = FieldClassifier::default();
    assert_eq!(
        classifier.classify("URGENT: server down", "").priority,
        Priority::High
    );
    assert_eq!(
        classifier.classify("status", "Status: resolved").status,
        Status::Resolved
    );
    let c = classifier.classify("x", "y");
    assert_eq!((c.status, c.priority), (Status::Open, Priority::Medium));
}
