pub mod composite;
pub mod terms;

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::aggregation::composite::{CompositeAggregation, CompositeResult};
use crate::aggregation::terms::{TermsAggregation, TermsResult};
use crate::core::error::{Error, Result};
use crate::search::results::ScoredHit;

/// Pseudo-field grouping hits by the index they come from
pub const INDEX_FIELD: &str = "_index";

/// Bucketing over the full, unpaged hit list
pub trait Aggregator: Send + Sync {
    fn aggregate(&self, hits: &[ScoredHit]) -> AggregationResult;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregationResult {
    Composite(CompositeResult),
    Terms(TermsResult),
    Empty(Map<String, Value>),
}

/// Parsed aggregation definition
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationRequest {
    Terms(TermsAggregation),
    Composite(CompositeAggregation),
    Unsupported(String),
}

impl AggregationRequest {
    /// Parse `{kind: {...}}`
    pub fn parse(body: &Value, default_size: usize) -> Result<Self> {
        let (kind, parameters) = body
            .as_object()
            .and_then(|object| object.iter().next())
            .ok_or_else(|| Error::validation("aggregation must be an object holding its kind"))?;

        match kind.as_str() {
            "terms" => Ok(AggregationRequest::Terms(TermsAggregation::parse(parameters, default_size)?)),
            "composite" => Ok(AggregationRequest::Composite(CompositeAggregation::parse(parameters, default_size)?)),
            other => Ok(AggregationRequest::Unsupported(other.to_string())),
        }
    }
}

/// Parse the `aggs` / `aggregations` tree of a search body into named requests
pub fn parse_aggregations(tree: &Value, default_size: usize) -> Result<Vec<(String, AggregationRequest)>> {
    let tree = tree
        .as_object()
        .ok_or_else(|| Error::validation("aggregations must be an object"))?;
    tree.iter()
        .map(|(name, body)| Ok((name.clone(), AggregationRequest::parse(body, default_size)?)))
        .collect()
}

struct EmptyAggregator {
    kind: String,
}

impl Aggregator for EmptyAggregator {
    fn aggregate(&self, _hits: &[ScoredHit]) -> AggregationResult {
        AggregationResult::Empty(Map::new())
    }

    fn name(&self) -> &str {
        &self.kind
    }
}

pub fn compile(request: &AggregationRequest) -> Box<dyn Aggregator> {
    match request {
        AggregationRequest::Terms(terms) => Box::new(terms.clone()),
        AggregationRequest::Composite(composite) => Box::new(composite.clone()),
        AggregationRequest::Unsupported(kind) => {
            tracing::warn!("Given aggregation is unsupported: {}", kind);
            Box::new(EmptyAggregator { kind: kind.clone() })
        }
    }
}

/// Run every named aggregation over `hits`
pub fn aggregate_all(requests: &[(String, AggregationRequest)], hits: &[ScoredHit]) -> BTreeMap<String, AggregationResult> {
    requests
        .iter()
        .map(|(name, request)| {
            let aggregator = compile(request);
            tracing::debug!("Running {} aggregation [{}] over {} hits", aggregator.name(), name, hits.len());
            (name.clone(), aggregator.aggregate(hits))
        })
        .collect()
}

/// Distinct string values of `field` on one hit, `_index` included
pub(crate) fn hit_terms(hit: &ScoredHit, field: &str) -> std::collections::BTreeSet<String> {
    if field == INDEX_FIELD {
        return std::iter::once(hit.index.clone()).collect();
    }
    hit.source
        .as_ref()
        .map(|source| {
            crate::document::path::values_at(source, field)
                .into_iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
