//! Recommendation rule chain.
//!
//! A fixed, ordered table of (predicate, message) rules evaluated in
//! sequence over the analysis of one failure. Deterministic and
//! stateless: its value is explainability, not accuracy. Additive rules
//! all fire; within the exclusive group only the first matching rule
//! fires. A generic fallback covers the case where nothing matched.

use crate::patterns::PatternSummary;

/// Average match similarity above which failures are assumed to share a
/// root cause.
pub const HIGH_AVG_SIMILARITY: f32 = 0.9;

/// Inputs a rule may inspect. `message` is pre-lowercased so substring
/// rules are case-insensitive.
pub struct RuleInput<'a> {
    pub message: &'a str,
    pub patterns: &'a PatternSummary,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    /// Fires whenever its predicate matches.
    Additive,
    /// Only the first matching exclusive rule fires.
    Exclusive,
}

struct Rule {
    name: &'static str,
    kind: RuleKind,
    matches: fn(&RuleInput) -> bool,
    render: fn(&RuleInput) -> String,
}

const RULES: &[Rule] = &[
    Rule {
        name: "recurring",
        kind: RuleKind::Additive,
        matches: |input| input.patterns.recurring,
        render: |input| {
            format!(
                "This appears to be a RECURRING failure. Found {} similar failures.",
                input.patterns.frequency
            )
        },
    },
    Rule {
        name: "high_similarity",
        kind: RuleKind::Additive,
        matches: |input| input.patterns.avg_similarity > HIGH_AVG_SIMILARITY,
        render: |_| {
            "Very high similarity with past failures - likely the same root cause.".to_string()
        },
    },
    Rule {
        name: "timeout",
        kind: RuleKind::Exclusive,
        matches: |input| input.message.contains("timeout"),
        render: |_| {
            "Timeout error detected. Consider increasing wait times or checking element locators."
                .to_string()
        },
    },
    Rule {
        name: "element_not_found",
        kind: RuleKind::Exclusive,
        matches: |input| {
            input.message.contains("element not found") || input.message.contains("nosuchelement")
        },
        render: |_| "Element not found. Verify locator strategy and page load state.".to_string(),
    },
    Rule {
        name: "assertion",
        kind: RuleKind::Exclusive,
        matches: |input| input.message.contains("assertion"),
        render: |_| "Assertion failure. Check expected vs actual values in test data.".to_string(),
    },
];

const FALLBACK: &str = "Review the stacktrace for more details on this failure.";

/// Render the recommendation for one failure: all matching rule messages,
/// in table order, joined by single spaces.
pub fn recommend(error_message: &str, patterns: &PatternSummary) -> String {
    let lowered = error_message.to_lowercase();
    let input = RuleInput {
        message: &lowered,
        patterns,
    };

    let mut messages = Vec::new();
    let mut exclusive_fired = false;

    for rule in RULES {
        if rule.kind == RuleKind::Exclusive && exclusive_fired {
            continue;
        }
        if (rule.matches)(&input) {
            tracing::debug!(rule = rule.name, "recommendation rule matched");
            messages.push((rule.render)(&input));
            if rule.kind == RuleKind::Exclusive {
                exclusive_fired = true;
            }
        }
    }

    if messages.is_empty() {
        return FALLBACK.to_string();
    }
    messages.join(" ")
}
