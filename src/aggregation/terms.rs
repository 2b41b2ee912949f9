use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::aggregation::{hit_terms, AggregationResult, Aggregator};
use crate::core::error::{Error, Result};
use crate::search::results::ScoredHit;

/// Most frequent string values of one field
#[derive(Debug, Clone, PartialEq)]
pub struct TermsAggregation {
    pub field: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsResult {
    pub doc_count_error_upper_bound: u64,
    pub sum_other_doc_count: u64,
    pub buckets: Vec<TermsBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsBucket {
    pub key: String,
    pub doc_count: u64,
}

impl TermsAggregation {
    pub fn new(field: &str, size: usize) -> Self {
        TermsAggregation { field: field.to_string(), size }
    }

    pub fn parse(parameters: &Value, default_size: usize) -> Result<Self> {
        let field = parameters
            .get("field")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::validation("[terms] aggregation requires 'field' field"))?;
        let size = parameters
            .get("size")
            .and_then(Value::as_u64)
            .map(|size| size as usize)
            .unwrap_or(default_size);
        Ok(TermsAggregation::new(field, size))
    }
}

impl Aggregator for TermsAggregation {
    fn aggregate(&self, hits: &[ScoredHit]) -> AggregationResult {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for hit in hits {
            // Each distinct value counts once per hit
            for term in hit_terms(hit, &self.field) {
                *counts.entry(term).or_insert(0) += 1;
            }
        }

        let mut buckets: Vec<TermsBucket> = counts
            .into_iter()
            .map(|(key, doc_count)| TermsBucket { key, doc_count })
            .collect();
        buckets.sort_by(|a, b| b.doc_count.cmp(&a.doc_count).then_with(|| a.key.cmp(&b.key)));
        buckets.truncate(self.size);

        AggregationResult::Terms(TermsResult {
            doc_count_error_upper_bound: 0,
            sum_other_doc_count: 0,
            buckets,
        })
    }

    fn name(&self) -> &str {
        "terms"
    }
}
