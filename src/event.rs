//! Event Model
//!
//! Typed test-execution records and the derived text views used for
//! embedding and display. The derived views are pure functions of the
//! event's fields so embeddings stay reproducible across runs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of stack trace lines included in the embedding text.
pub const STACKTRACE_EMBED_LINES: usize = 10;

/// Lifecycle status of a test execution event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventStatus {
    Started,
    Passed,
    Failed,
    Skipped,
    Other(String),
}

impl From<String> for EventStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "STARTED" => Self::Started,
            "PASSED" => Self::Passed,
            "FAILED" => Self::Failed,
            "SKIPPED" => Self::Skipped,
            _ => Self::Other(s),
        }
    }
}

impl From<EventStatus> for String {
    fn from(status: EventStatus) -> Self {
        match status {
            EventStatus::Started => "STARTED".to_string(),
            EventStatus::Passed => "PASSED".to_string(),
            EventStatus::Failed => "FAILED".to_string(),
            EventStatus::Skipped => "SKIPPED".to_string(),
            EventStatus::Other(s) => s,
        }
    }
}

/// Log severity attached to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Error,
    Warn,
    Info,
    Debug,
    Other(String),
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ERROR" => Self::Error,
            "WARN" => Self::Warn,
            "INFO" => Self::Info,
            "DEBUG" => Self::Debug,
            _ => Self::Other(s),
        }
    }
}

impl From<Severity> for String {
    fn from(level: Severity) -> Self {
        match level {
            Severity::Error => "ERROR".to_string(),
            Severity::Warn => "WARN".to_string(),
            Severity::Info => "INFO".to_string(),
            Severity::Debug => "DEBUG".to_string(),
            Severity::Other(s) => s,
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::Info
    }
}

/// A single test execution or log record as emitted by the test listener.
///
/// Field names follow the upstream JSONL wire format (`eventId`, `testName`,
/// `durationMs`, ...) so listener output parses directly. Known fields are
/// explicit; anything else the listener attaches rides along in `attributes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestEvent {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub test_id: String,
    #[serde(default)]
    pub test_name: String,
    #[serde(default)]
    pub suite: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub level: Severity,
    #[serde(default = "default_status")]
    pub status: EventStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub stacktrace: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default = "default_service")]
    pub service: String,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

fn default_environment() -> String {
    "local".to_string()
}

fn default_service() -> String {
    "selenium-ui-tests".to_string()
}

fn default_status() -> EventStatus {
    EventStatus::Other(String::new())
}

impl TestEvent {
    /// Whether this event represents a test failure worth indexing.
    pub fn is_failure(&self) -> bool {
        self.status == EventStatus::Failed && self.level == Severity::Error
    }

    /// Deterministic text used as the unit of semantic comparison.
    ///
    /// Concatenates test name, class, suite, error message and the first
    /// [`STACKTRACE_EMBED_LINES`] lines of the stack trace. Labels for empty
    /// fields are omitted entirely, a deliberate choice: sparse events embed
    /// only their populated fields instead of dangling `Class:`/`Suite:`
    /// markers, so their vectors differ from always-emit renderings of the
    /// same record. Same event, same string.
    pub fn embedding_text(&self) -> String {
        let mut parts = vec![format!("Test failure in {}", self.test_name)];

        if !self.class_name.is_empty() {
            parts.push(format!("Class: {}", self.class_name));
        }
        if !self.suite.is_empty() {
            parts.push(format!("Suite: {}", self.suite));
        }
        parts.push(format!("Error message: {}", self.message));

        if let Some(trace) = &self.stacktrace {
            if !trace.is_empty() {
                let head: Vec<&str> = trace.lines().take(STACKTRACE_EMBED_LINES).collect();
                parts.push(format!("Stacktrace: {}", head.join(" ")));
            }
        }

        parts.join(" ")
    }

    /// Compact multi-field summary of a failure, for display and logging.
    ///
    /// Empty for non-failure events.
    pub fn failure_signature(&self) -> String {
        if !self.is_failure() {
            return String::new();
        }

        let mut parts = vec![
            format!("Test: {}", self.test_name),
            format!("Class: {}", self.class_name),
            format!("Error: {}", self.message),
        ];

        if let Some(trace) = &self.stacktrace {
            // First non-indented line is the exception header
            if let Some(line) = trace
                .lines()
                .take(5)
                .find(|l| !l.trim().is_empty() && !l.starts_with('\t') && !l.starts_with(' '))
            {
                parts.push(format!("Exception: {}", line.trim()));
            }
        }

        parts.join(" | ")
    }
}
