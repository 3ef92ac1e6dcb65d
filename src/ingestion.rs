//! Event ingestion.
//!
//! The engine consumes an ordered sequence of typed [`TestEvent`] records
//! through the [`EventSource`] seam. The bundled sources are an in-memory
//! vector (API callers, tests) and the JSONL analytics log produced by
//! the upstream test listener. A malformed line is reported as
//! `MalformedRecord` by the line parser and skipped by the batch reader;
//! it never aborts the rest of the stream.

use std::path::PathBuf;

use crate::error::{AnalysisError, Result};
use crate::event::TestEvent;

/// Supplier of the event corpus the engine indexes and summarizes.
pub trait EventSource: Send + Sync {
    fn events(&self) -> Result<Vec<TestEvent>>;
}

/// In-memory event source.
pub struct StaticEvents {
    events: Vec<TestEvent>,
}

impl StaticEvents {
    pub fn new(events: Vec<TestEvent>) -> Self {
        Self { events }
    }
}

impl EventSource for StaticEvents {
    fn events(&self) -> Result<Vec<TestEvent>> {
        Ok(self.events.clone())
    }
}

/// JSONL analytics log source, one event per line.
pub struct JsonlLogSource {
    path: PathBuf,
}

impl JsonlLogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse a single JSONL line into an event.
    pub fn parse_line(line: &str) -> Result<TestEvent> {
        serde_json::from_str(line.trim())
            .map_err(|e| AnalysisError::MalformedRecord(e.to_string()))
    }
}

impl EventSource for JsonlLogSource {
    fn events(&self) -> Result<Vec<TestEvent>> {
        if !self.path.exists() {
            tracing::warn!(path = %self.path.display(), "log file not found, no events loaded");
            return Ok(Vec::new());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let mut events = Vec::new();
        let mut skipped = 0_usize;

        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match Self::parse_line(line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(error = %e, "skipping malformed log line");
                }
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, loaded = events.len(), "log contained malformed lines");
        }
        Ok(events)
    }
}
