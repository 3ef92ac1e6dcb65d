//! Recurrence pattern extraction over similarity query results.

use itertools::Itertools;
use serde::Serialize;

use crate::vector_store::SimilarityResult;

/// A retrieved match above this score marks the failure as recurring.
/// Distinct from the retrieval floor; calibrated against cosine [0, 1].
pub const RECURRING_SCORE_THRESHOLD: f32 = 0.85;

/// How many tests/classes the frequency rankings keep.
const TOP_AFFECTED: usize = 5;

/// Recurrence statistics derived from one failure's retrieved matches.
#[derive(Debug, Clone, Serialize)]
pub struct PatternSummary {
    /// True iff at least one match scored above [`RECURRING_SCORE_THRESHOLD`].
    pub recurring: bool,
    /// Number of retrieved matches.
    pub frequency: usize,
    /// Test name -> occurrence count among matches, top 5 by frequency.
    pub affected_tests: Vec<(String, usize)>,
    /// Class name -> occurrence count among matches, top 5 by frequency.
    pub affected_classes: Vec<(String, usize)>,
    /// Mean similarity score across matches; 0.0 when there are none.
    pub avg_similarity: f32,
}

impl PatternSummary {
    pub fn from_matches(matches: &[SimilarityResult]) -> Self {
        if matches.is_empty() {
            return Self {
                recurring: false,
                frequency: 0,
                affected_tests: Vec::new(),
                affected_classes: Vec::new(),
                avg_similarity: 0.0,
            };
        }

        let recurring = matches
            .iter()
            .any(|m| m.score > RECURRING_SCORE_THRESHOLD);
        let avg_similarity =
            matches.iter().map(|m| m.score).sum::<f32>() / matches.len() as f32;

        Self {
            recurring,
            frequency: matches.len(),
            affected_tests: top_counts(matches.iter().map(|m| m.test_name.as_str())),
            affected_classes: top_counts(matches.iter().map(|m| m.class_name.as_str())),
            avg_similarity,
        }
    }
}

/// Frequency-rank the names, most common first, name order breaking ties
/// so the ranking is deterministic.
fn top_counts<'a>(names: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    names
        .counts()
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        .take(TOP_AFFECTED)
        .map(|(name, count)| (name.to_string(), count))
        .collect()
}
