use std::cmp::Ordering;
use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::aggregation::{hit_terms, AggregationResult, Aggregator};
use crate::core::error::{Error, Result};
use crate::document::value::canonical_string;
use crate::search::results::ScoredHit;

/// One `terms` source of a composite aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSource {
    pub name: String,
    pub field: String,
    pub descending: bool,
}

/// Buckets over every combination of the source values, paginated with `after`
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeAggregation {
    pub sources: Vec<CompositeSource>,
    pub size: usize,
    pub after: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    pub buckets: Vec<CompositeBucket>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub after_key: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeBucket {
    pub key: Map<String, Value>,
    pub doc_count: u64,
}

impl CompositeSource {
    pub fn new(name: &str, field: &str) -> Self {
        CompositeSource { name: name.to_string(), field: field.to_string(), descending: false }
    }

    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    /// `None` for source kinds other than `terms`
    fn parse(entry: &Value) -> Result<Option<Self>> {
        let (name, definition) = entry
            .as_object()
            .and_then(|object| object.iter().next())
            .ok_or_else(|| Error::validation("[composite] source must be an object holding its name"))?;
        let (kind, parameters) = definition
            .as_object()
            .and_then(|object| object.iter().next())
            .ok_or_else(|| Error::validation(format!("[composite] source [{}] must declare its kind", name)))?;

        if kind != "terms" {
            tracing::warn!("Given composite aggregation source is not supported: {}", kind);
            return Ok(None);
        }

        let field = parameters
            .get("field")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::validation(format!("[composite] source [{}] requires 'field' field", name)))?;
        let descending = parameters.get("order").and_then(Value::as_str) == Some("desc");
        Ok(Some(CompositeSource { name: name.clone(), field: field.to_string(), descending }))
    }
}

type CompositeKey = Vec<String>;

impl CompositeAggregation {
    pub fn new(sources: Vec<CompositeSource>, size: usize) -> Self {
        CompositeAggregation { sources, size, after: None }
    }

    pub fn with_after(mut self, after: Map<String, Value>) -> Self {
        self.after = Some(after);
        self
    }

    pub fn parse(parameters: &Value, default_size: usize) -> Result<Self> {
        let sources = parameters
            .get("sources")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::validation("[composite] aggregation requires a 'sources' array"))?;
        let mut parsed = Vec::with_capacity(sources.len());
        for source in sources {
            if let Some(source) = CompositeSource::parse(source)? {
                parsed.push(source);
            }
        }

        let size = parameters
            .get("size")
            .and_then(Value::as_u64)
            .map(|size| size as usize)
            .unwrap_or(default_size);
        let after = match parameters.get("after") {
            None | Some(Value::Null) => None,
            Some(Value::Object(after)) => Some(after.clone()),
            Some(_) => return Err(Error::validation("[composite] 'after' must be an object")),
        };
        Ok(CompositeAggregation { sources: parsed, size, after })
    }

    /// Every combination of the per-source value sets of one hit
    fn keys_of(&self, hit: &ScoredHit) -> Vec<CompositeKey> {
        let mut keys: Vec<CompositeKey> = vec![Vec::new()];
        for source in &self.sources {
            let terms = hit_terms(hit, &source.field);
            keys = keys
                .iter()
                .flat_map(|prefix| {
                    terms.iter().map(move |term| {
                        let mut key = prefix.clone();
                        key.push(term.clone());
                        key
                    })
                })
                .collect();
        }
        keys
    }

    fn compare(&self, a: &CompositeKey, b: &CompositeKey) -> Ordering {
        for (index, source) in self.sources.iter().enumerate() {
            let order = a[index].cmp(&b[index]);
            let order = if source.descending { order.reverse() } else { order };
            if order != Ordering::Equal {
                return order;
            }
        }
        Ordering::Equal
    }

    fn to_object(&self, key: &CompositeKey) -> Map<String, Value> {
        self.sources
            .iter()
            .zip(key)
            .map(|(source, term)| (source.name.clone(), Value::String(term.clone())))
            .collect()
    }

    /// The `after` object as a key tuple; `None` when a source is missing from it
    fn after_tuple(&self, after: &Map<String, Value>) -> Option<CompositeKey> {
        self.sources
            .iter()
            .map(|source| after.get(&source.name).map(canonical_string))
            .collect()
    }
}

impl Aggregator for CompositeAggregation {
    fn aggregate(&self, hits: &[ScoredHit]) -> AggregationResult {
        if self.sources.is_empty() {
            return AggregationResult::Composite(CompositeResult { buckets: Vec::new(), after_key: None });
        }

        let mut counts: HashMap<CompositeKey, u64> = HashMap::new();
        for hit in hits {
            for key in self.keys_of(hit) {
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        let mut sorted: Vec<(CompositeKey, u64)> = counts.into_iter().collect();
        sorted.sort_by(|a, b| self.compare(&a.0, &b.0));

        let start = match &self.after {
            None => 0,
            Some(after) => {
                let position = self
                    .after_tuple(after)
                    .and_then(|after| sorted.iter().position(|(key, _)| *key == after));
                match position {
                    Some(position) => position + 1,
                    // Unknown resume point
                    None => sorted.len(),
                }
            }
        };

        let end = start.saturating_add(self.size).min(sorted.len());
        let buckets: Vec<CompositeBucket> = sorted[start..end]
            .iter()
            .map(|(key, doc_count)| CompositeBucket { key: self.to_object(key), doc_count: *doc_count })
            .collect();
        let after_key = if end < sorted.len() {
            buckets.last().map(|bucket| bucket.key.clone())
        } else {
            None
        };

        AggregationResult::Composite(CompositeResult { buckets, after_key })
    }

    fn name(&self) -> &str {
        "composite"
    }
}
