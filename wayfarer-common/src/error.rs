//! Error types and utilities for the wayfarer routing engine
//!
//! Per-request "no answer" outcomes (an unresolvable point, an unreachable
//! destination) are not errors and never appear here; they are ordinary
//! return values of the engine. This module only covers build failures,
//! misuse and aborted queries.

use strsim::{jaro_winkler, normalized_levenshtein};
use thiserror::Error;

/// Reasons the network build can fail. Any of these keeps the engine from
/// ever becoming ready.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The record source could not be read or decoded
    #[error("unreadable map data: {0}")]
    UnreadableInput(String),

    /// Every way was filtered out or dropped
    #[error("map data produced no usable edges ({ways_seen} ways seen, {ways_dropped} dropped for dangling references)")]
    NoUsableEdges { ways_seen: u64, ways_dropped: u64 },

    /// The configuration enables no vehicle profile
    #[error("no vehicle profiles enabled")]
    NoProfiles,

    /// A count outgrew the 32-bit ids the graph stores
    #[error("network too large: {count} {what} exceed the 32-bit id range")]
    TooLarge { what: &'static str, count: usize },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("network build failed: {0}")]
    Build(#[from] BuildError),

    #[error("profile '{requested}' is not enabled (enabled: {enabled})")]
    UnsupportedProfile { requested: String, enabled: String },

    #[error("unknown profile '{name}'{}", suggestion_suffix(.suggestion))]
    UnknownProfile {
        name: String,
        suggestion: Option<String>,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("routing engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("query cancelled")]
    Cancelled,

    #[error("query deadline exceeded")]
    DeadlineExceeded,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the caller can reasonably retry with different input
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedProfile { .. }
                | Error::UnknownProfile { .. }
                | Error::Cancelled
                | Error::DeadlineExceeded
        )
    }
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(", did you mean '{s}'?"),
        None => String::new(),
    }
}

/// Convenience result type for wayfarer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Find the best fuzzy match using Jaro-Winkler (70%) and normalized
/// Levenshtein (30%) with a prefix bonus.
///
/// Minimum threshold: 0.65 similarity
fn find_best_fuzzy_match(input: &str, candidates: &[&str]) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }

    let input_lower = input.to_lowercase();
    let mut best_match = None;
    let mut best_score = 0.0f64;

    let min_threshold = 0.65;

    for candidate in candidates {
        let candidate_lower = candidate.to_lowercase();

        let jw_score = jaro_winkler(&input_lower, &candidate_lower);
        let lev_score = normalized_levenshtein(&input_lower, &candidate_lower);
        let mut score = (jw_score * 0.7) + (lev_score * 0.3);

        // Prefix bonus (+20% max) for inputs sharing a strong prefix
        let prefix_len = input_lower.chars().count().min(7);
        if prefix_len >= 4 {
            let input_prefix: String = input_lower.chars().take(prefix_len).collect();
            let candidate_prefix: String = candidate_lower.chars().take(prefix_len).collect();

            let prefix_similarity = normalized_levenshtein(&input_prefix, &candidate_prefix);
            if prefix_similarity > 0.7 {
                score += 0.2 * prefix_similarity;
            }
        }

        if score >= min_threshold && score > best_score {
            best_score = score;
            best_match = Some((*candidate).to_string());
        }
    }

    best_match
}

/// Suggest a correction for a potentially misspelled name.
///
/// Returns `None` when the input already matches a candidate
/// (case-insensitively) or nothing is close enough.
pub fn suggest_correction(input: &str, candidates: &[&str]) -> Option<String> {
    if candidates.iter().any(|c| c.eq_ignore_ascii_case(input)) {
        return None;
    }

    find_best_fuzzy_match(input, candidates)
}
