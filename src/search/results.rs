use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::aggregation::AggregationResult;

/// Highlight snippets keyed by field name
pub type Highlights = BTreeMap<String, Vec<String>>;

/// Search results container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub total_hits: usize,
    pub max_score: Option<f64>,
    pub hits: Vec<ScoredHit>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub aggregations: Option<BTreeMap<String, AggregationResult>>,
    #[serde(rename = "_scroll_id", skip_serializing_if = "Option::is_none", default)]
    pub scroll_id: Option<String>,
    pub took_ms: u64,
}

/// Document with relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredHit {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score")]
    pub score: f64,
    /// `None` once a `_source: false` filter has been applied
    #[serde(rename = "_source", skip_serializing_if = "Option::is_none", default)]
    pub source: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub highlight: Option<Highlights>,
}

impl ScoredHit {
    pub fn new(index: &str, id: &str, score: f64, source: Value) -> Self {
        ScoredHit {
            index: index.to_string(),
            id: id.to_string(),
            score,
            source: Some(source),
            highlight: None,
        }
    }
}

/// One continuation page of a scroll cursor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollPage {
    #[serde(rename = "_scroll_id")]
    pub scroll_id: String,
    pub total_hits: usize,
    pub hits: Vec<ScoredHit>,
}

impl SearchResults {
    pub fn empty() -> Self {
        SearchResults {
            total_hits: 0,
            max_score: None,
            hits: Vec::new(),
            aggregations: None,
            scroll_id: None,
            took_ms: 0,
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        self.hits.iter().map(|hit| hit.id.as_str()).collect()
    }
}
