//! Answer-quality policy: evidence scoring, caveats, stub filtering,
//! and citation extraction from tool observations.
//!
//! The score is a tunable heuristic over how much context was gathered
//! and how many citations back it; only the two threshold boundaries
//! are contractual.

use serde_json::Value;
use tracing::debug;

use crate::domain::models::{AgentState, EngineConfig, SourceRef};

/// Context volume (chars) at which the volume half of the score saturates.
const CONTEXT_SATURATION_CHARS: f64 = 2_000.0;
/// Source count at which the citation half of the score saturates.
const SOURCE_SATURATION: f64 = 3.0;

/// Canned replies that carry no information for the user.
const STUB_ANSWERS: &[&str] = &[
    "no further action needed",
    "no action needed",
    "no action required",
    "nothing to do",
];

/// Confidence band for a tentative answer, derived from the evidence
/// score. Band boundaries are inclusive on their lower edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Low,
    Moderate,
    High,
}

impl Confidence {
    pub fn from_score(score: f64, config: &EngineConfig) -> Self {
        if score < config.evidence_low {
            Self::Low
        } else if score < config.evidence_high {
            Self::Moderate
        } else {
            Self::High
        }
    }
}

/// Score the gathered evidence in `[0, 1]`.
///
/// Half the weight comes from context volume, half from citation count,
/// each saturating independently.
pub fn evidence_score(context_chars: usize, source_count: usize) -> f64 {
    let volume = (context_chars as f64 / CONTEXT_SATURATION_CHARS).min(1.0);
    let citations = (source_count as f64 / SOURCE_SATURATION).min(1.0);
    0.5 * volume + 0.5 * citations
}

/// Convenience wrapper over [`evidence_score`] for a reasoning session.
pub fn score_state(state: &AgentState) -> f64 {
    evidence_score(state.context_chars(), state.sources.len())
}

/// Prepend the band's caveat; high-confidence answers pass through
/// unmodified.
pub fn apply_caveat(answer: String, confidence: Confidence) -> String {
    match confidence {
        Confidence::Low => format!(
            "Note: I found limited supporting information for this answer, \
             so please verify it independently.\n\n{answer}"
        ),
        Confidence::Moderate => {
            format!("Note: this answer is based on partial information.\n\n{answer}")
        }
        Confidence::High => answer,
    }
}

/// Whether the answer is a known non-answer that should be replaced
/// with a clarification request.
pub fn is_stub_answer(answer: &str) -> bool {
    let normalized = answer.trim().trim_end_matches('.').to_lowercase();
    STUB_ANSWERS.contains(&normalized.as_str())
}

/// Replacement for a filtered stub answer.
pub fn clarification_request() -> String {
    "I need more detail to answer this properly. Could you clarify what \
     you would like me to look into?"
        .to_string()
}

/// Pull citation records out of a JSON-shaped observation.
///
/// A payload with a recognizable `sources` array contributes one
/// [`SourceRef`] per well-formed entry; anything else yields nothing
/// (the observation is still context, just uncited).
pub fn extract_sources(observation: &str) -> Vec<SourceRef> {
    let Ok(value) = serde_json::from_str::<Value>(observation) else {
        return Vec::new();
    };
    let Some(items) = value.get("sources").and_then(Value::as_array) else {
        return Vec::new();
    };

    let sources: Vec<SourceRef> = items
        .iter()
        .filter_map(|item| {
            let title = item
                .get("title")
                .or_else(|| item.get("name"))
                .and_then(Value::as_str)?;
            Some(SourceRef {
                title: title.to_string(),
                url: item
                    .get("url")
                    .and_then(Value::as_str)
                    .map(String::from),
                snippet: item
                    .get("snippet")
                    .and_then(Value::as_str)
                    .map(String::from),
            })
        })
        .collect();
    debug!(count = sources.len(), "extracted citations from observation");
    sources
}
