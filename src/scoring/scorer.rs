use serde_json::Value;

/// Score for an exact typed match
pub const EXACT_MATCH: f64 = 1.0;
/// Score for a match on canonical string forms only
pub const LOOSE_MATCH: f64 = 0.8;
/// Per-position decay applied to match tokens
pub const POSITION_DECAY: f64 = 0.9;

/// Relevance scorer compiled from a query.
///
/// Scorers are immutable once compiled and are shared across the threads
/// that score an index.
pub trait Scorer: Send + Sync {
    fn score(&self, document: &Value) -> f64;

    fn name(&self) -> &str;
}

/// Weight of a token pair found at query position `i` and field position `j`
pub fn proximity(query_position: usize, field_position: usize) -> f64 {
    POSITION_DECAY.powi(query_position as i32) * POSITION_DECAY.powi(field_position as i32)
}

/// Scores every document zero, named after why the query degraded
pub struct ZeroScorer {
    reason: String,
}

impl ZeroScorer {
    pub fn new(reason: impl Into<String>) -> Self {
        ZeroScorer { reason: reason.into() }
    }
}

impl Scorer for ZeroScorer {
    fn score(&self, _document: &Value) -> f64 {
        0.0
    }

    fn name(&self) -> &str {
        &self.reason
    }
}

/// Scores every document one
pub struct ConstantScorer;

impl Scorer for ConstantScorer {
    fn score(&self, _document: &Value) -> f64 {
        EXACT_MATCH
    }

    fn name(&self) -> &str {
        "match_all"
    }
}
