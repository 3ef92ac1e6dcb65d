//! Summary Aggregator
//!
//! Corpus-wide failure statistics computed by frequency counting over the
//! full event stream. Independent of the vector index; the index's entry
//! count is attached for observability only.

use itertools::Itertools;
use serde::Serialize;

use crate::event::{EventStatus, TestEvent};
use crate::vector_store::CollectionInfo;

#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    /// Count of completed test executions (passed or failed).
    pub total_tests: usize,
    pub total_failures: usize,
    /// Failures as a percentage of all events; 0.0 for an empty corpus.
    pub failure_rate: f64,
    /// Full descending ranking, not top-N.
    pub failures_by_test: Vec<(String, usize)>,
    pub failures_by_class: Vec<(String, usize)>,
    pub index: CollectionInfo,
}

pub fn summarize(events: &[TestEvent], index: CollectionInfo) -> SummaryReport {
    let failures: Vec<&TestEvent> = events.iter().filter(|e| e.is_failure()).collect();

    let total_tests = events
        .iter()
        .filter(|e| matches!(e.status, EventStatus::Passed | EventStatus::Failed))
        .count();

    let failure_rate = if events.is_empty() {
        0.0
    } else {
        failures.len() as f64 / events.len() as f64 * 100.0
    };

    SummaryReport {
        total_tests,
        total_failures: failures.len(),
        failure_rate,
        failures_by_test: ranked(failures.iter().map(|f| f.test_name.as_str())),
        failures_by_class: ranked(failures.iter().map(|f| f.class_name.as_str())),
        index,
    }
}

/// Full frequency ranking, most common first, name order on ties.
fn ranked<'a>(names: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    names
        .counts()
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        .map(|(name, count)| (name.to_string(), count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Severity;
    use std::collections::HashMap;

    fn event(name: &str, class: &str, status: EventStatus, level: Severity) -> TestEvent {
        TestEvent {
            event_id: String::new(),
            timestamp: String::new(),
            test_id: String::new(),
            test_name: name.to_string(),
            suite: "smoke".to_string(),
            class_name: class.to_string(),
            environment: "local".to_string(),
            level,
            status,
            message: String::new(),
            stacktrace: None,
            duration_ms: 0,
            service: String::new(),
            attributes: HashMap::new(),
        }
    }

    fn info() -> CollectionInfo {
        CollectionInfo {
            name: "test_failures".to_string(),
            points_count: 0,
        }
    }

    #[test]
    fn computes_rate_over_all_events() {
        let mut events = Vec::new();
        for i in 0..7 {
            events.push(event(
                &format!("pass{i}"),
                "PassingTests",
                EventStatus::Passed,
                Severity::Info,
            ));
        }
        for i in 0..3 {
            events.push(event(
                &format!("fail{i}"),
                "FailingTests",
                EventStatus::Failed,
                Severity::Error,
            ));
        }

        let report = summarize(&events, info());
        assert_eq!(report.total_tests, 10);
        assert_eq!(report.total_failures, 3);
        assert!((report.failure_rate - 30.0).abs() < 1e-9);
    }

    #[test]
    fn empty_corpus_has_zero_rate() {
        let report = summarize(&[], info());
        assert_eq!(report.total_tests, 0);
        assert_eq!(report.total_failures, 0);
        assert_eq!(report.failure_rate, 0.0);
        assert!(report.failures_by_test.is_empty());
    }

    #[test]
    fn started_events_do_not_count_as_tests() {
        let events = vec![
            event("a", "A", EventStatus::Started, Severity::Info),
            event("a", "A", EventStatus::Passed, Severity::Info),
        ];
        let report = summarize(&events, info());
        assert_eq!(report.total_tests, 1);
    }

    #[test]
    fn failed_without_error_level_is_not_a_failure() {
        let events = vec![event("a", "A", EventStatus::Failed, Severity::Warn)];
        let report = summarize(&events, info());
        assert_eq!(report.total_failures, 0);
        // But it still completed, so it counts as a test
        assert_eq!(report.total_tests, 1);
    }

    #[test]
    fn rankings_are_full_and_descending() {
        let events = vec![
            event("flaky", "FlakyTests", EventStatus::Failed, Severity::Error),
            event("flaky", "FlakyTests", EventStatus::Failed, Severity::Error),
            event("once", "OtherTests", EventStatus::Failed, Severity::Error),
        ];
        let report = summarize(&events, info());
        assert_eq!(
            report.failures_by_test,
            vec![("flaky".to_string(), 2), ("once".to_string(), 1)]
        );
        assert_eq!(report.failures_by_class.len(), 2);
    }

    #[test]
    fn summary_is_idempotent() {
        let events = vec![
            event("a", "A", EventStatus::Failed, Severity::Error),
            event("b", "B", EventStatus::Passed, Severity::Info),
        ];
        let first = summarize(&events, info());
        let second = summarize(&events, info());
        assert_eq!(first.total_tests, second.total_tests);
        assert_eq!(first.failures_by_test, second.failures_by_test);
        assert_eq!(first.failure_rate, second.failure_rate);
    }
}
