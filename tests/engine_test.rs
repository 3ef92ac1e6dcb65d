//! End-to-end tests over the full pipeline: events -> embeddings -> index
//! -> retrieval -> pattern analysis, using the deterministic hash embedder
//! and the in-memory index.

use std::collections::HashMap;
use std::sync::Arc;

use failsight::{
    AnalysisConfig, AnalysisEngine, AnalysisError, Embedder, EventStatus, HashEmbedder, Severity,
    StaticEvents, TestEvent,
};

fn base_event(test_name: &str, status: EventStatus, level: Severity, message: &str) -> TestEvent {
    TestEvent {
        event_id: format!("evt-{test_name}"),
        timestamp: "2026-01-15T10:00:00Z".to_string(),
        test_id: test_name.to_string(),
        test_name: test_name.to_string(),
        suite: String::new(),
        class_name: String::new(),
        environment: "local".to_string(),
        level,
        status,
        message: message.to_string(),
        stacktrace: None,
        duration_ms: 250,
        service: "selenium-ui-tests".to_string(),
        attributes: HashMap::new(),
    }
}

fn failure(test_name: &str, message: &str) -> TestEvent {
    base_event(test_name, EventStatus::Failed, Severity::Error, message)
}

fn passed(test_name: &str) -> TestEvent {
    base_event(test_name, EventStatus::Passed, Severity::Info, "ok")
}

fn engine(events: Vec<TestEvent>) -> AnalysisEngine {
    AnalysisEngine::new(
        AnalysisConfig::default(),
        Arc::new(HashEmbedder::default()),
        Arc::new(StaticEvents::new(events)),
    )
}

#[tokio::test]
async fn near_duplicate_failures_rank_verbatim_match_first() {
    let eng = engine(vec![
        failure("Login", "AssertionError: expected true"),
        failure("Login", "AssertionError: expected false"),
    ]);
    eng.load_and_index().await.unwrap();

    let results = eng
        .find_similar("AssertionError: expected true", None)
        .await
        .unwrap();

    assert_eq!(results.len(), 2, "both near-duplicates must clear the default threshold");
    assert!(results[0].message.contains("expected true"));
    assert!(results[1].message.contains("expected false"));
    assert!(results[0].score > results[1].score);
    for result in &results {
        assert!(result.score >= 0.3, "score {} below default threshold", result.score);
    }
}

#[tokio::test]
async fn results_respect_threshold_and_ordering() {
    let eng = engine(vec![
        failure("Login", "AssertionError: expected true"),
        failure("Checkout", "Timeout waiting for payment frame"),
        failure("Search", "NoSuchElementException: #results missing"),
    ]);
    eng.load_and_index().await.unwrap();

    let results = eng.find_similar("AssertionError in Login", None).await.unwrap();
    for window in results.windows(2) {
        assert!(window[0].score >= window[1].score, "results must be sorted descending");
    }
    for result in &results {
        assert!(result.score >= 0.3);
    }
}

#[tokio::test]
async fn top_k_caps_result_count() {
    let events: Vec<TestEvent> = (0..6)
        .map(|i| failure(&format!("Login{i}"), "AssertionError: expected true"))
        .collect();
    let eng = engine(events);
    eng.load_and_index().await.unwrap();

    let results = eng
        .find_similar("AssertionError: expected true", Some(2))
        .await
        .unwrap();
    assert_eq!(results.len(), 2);

    // Default top_k is 5 even when more entries match
    let results = eng
        .find_similar("AssertionError: expected true", None)
        .await
        .unwrap();
    assert_eq!(results.len(), 5);
}

#[tokio::test]
async fn querying_empty_engine_returns_empty_list() {
    let eng = engine(Vec::new());
    let results = eng
        .find_similar("AssertionError: expected true", None)
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn identical_embedding_text_embeds_identically() {
    let embedder = HashEmbedder::default();
    let a = failure("Login", "AssertionError: expected true");
    let mut b = failure("Login", "AssertionError: expected true");
    b.event_id = "different-id".to_string();
    b.timestamp = "2026-02-01T00:00:00Z".to_string();

    assert_eq!(a.embedding_text(), b.embedding_text());
    let va = embedder.embed(&a.embedding_text()).await.unwrap();
    let vb = embedder.embed(&b.embedding_text()).await.unwrap();
    assert_eq!(va, vb);
}

#[tokio::test]
async fn summary_over_ten_events_reports_thirty_percent() {
    let mut events: Vec<TestEvent> = (0..7).map(|i| passed(&format!("pass{i}"))).collect();
    for i in 0..3 {
        events.push(failure(&format!("fail{i}"), "boom"));
    }
    let eng = engine(events);

    let summary = eng.summary().await.unwrap();
    assert_eq!(summary.total_tests, 10);
    assert_eq!(summary.total_failures, 3);
    assert!((summary.failure_rate - 30.0).abs() < 1e-9);
}

#[tokio::test]
async fn summary_is_idempotent_without_reindexing() {
    let eng = engine(vec![passed("a"), failure("b", "boom")]);
    eng.load_and_index().await.unwrap();

    let first = eng.summary().await.unwrap();
    let second = eng.summary().await.unwrap();
    assert_eq!(first.total_tests, second.total_tests);
    assert_eq!(first.total_failures, second.total_failures);
    assert_eq!(first.failure_rate, second.failure_rate);
    assert_eq!(first.failures_by_test, second.failures_by_test);
    assert_eq!(first.index.points_count, second.index.points_count);
}

#[tokio::test]
async fn timeout_guidance_wins_over_assertion_guidance() {
    let eng = engine(vec![failure(
        "Login",
        "Assertion failed: timeout while waiting for banner",
    )]);
    eng.load_and_index().await.unwrap();

    let target = failure("Login", "Assertion failed: timeout while waiting for banner");
    let report = eng.analyze(&target).await.unwrap();
    assert!(report.recommendation.contains("Timeout error detected"));
    assert!(!report.recommendation.contains("Assertion failure."));
}

#[tokio::test]
async fn analyze_flags_recurring_failures() {
    let eng = engine(vec![
        failure("Login", "AssertionError: expected true"),
        failure("Login", "AssertionError: expected true"),
    ]);
    eng.load_and_index().await.unwrap();

    let target = failure("Login", "AssertionError: expected true");
    let report = eng.analyze(&target).await.unwrap();

    // Verbatim matches score 1.0, above the 0.85 recurring threshold
    assert!(report.patterns.recurring);
    assert!(report.recommendation.contains("RECURRING failure"));
    assert!(report.recommendation.contains("Assertion failure."));
    assert_eq!(report.error_message, "AssertionError: expected true");
}

#[tokio::test]
async fn analyze_rejects_non_failure_events() {
    let eng = engine(vec![passed("a")]);
    let err = eng.analyze(&passed("a")).await.unwrap_err();
    assert!(matches!(err, AnalysisError::NotAFailure(_)));
}
