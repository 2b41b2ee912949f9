use std::cmp::Ordering;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::core::error::{Error, Result};
use crate::document::path::values_at;
use crate::document::value::Scalar;
use crate::search::results::ScoredHit;

/// Pseudo-field sorting on relevance
pub const SCORE_FIELD: &str = "_score";

/// Sort order for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,   // Ascending: 0 → 9, A → Z
    Desc,  // Descending: 9 → 0, Z → A
}

impl SortOrder {
    fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(Error::validation(format!("unknown sort order [{}]", other))),
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
}

impl SortKey {
    pub fn asc(field: &str) -> Self {
        SortKey { field: field.to_string(), order: SortOrder::Asc }
    }

    pub fn desc(field: &str) -> Self {
        SortKey { field: field.to_string(), order: SortOrder::Desc }
    }

    fn default_for(field: &str) -> Self {
        if field == SCORE_FIELD { SortKey::desc(field) } else { SortKey::asc(field) }
    }

    fn parse(entry: &Value) -> Result<Self> {
        match entry {
            Value::String(field) => Ok(SortKey::default_for(field)),
            Value::Object(object) => {
                let (field, order) = object
                    .iter()
                    .next()
                    .ok_or_else(|| Error::validation("sort entry must name a field"))?;
                let order = match order {
                    Value::String(order) => Some(order.as_str()),
                    Value::Object(options) => options.get("order").and_then(Value::as_str),
                    _ => None,
                };
                match order {
                    Some(order) => Ok(SortKey { field: field.clone(), order: SortOrder::parse(order)? }),
                    None => Ok(SortKey::default_for(field)),
                }
            }
            other => Err(Error::validation(format!("sort entry must be a string or an object, got {}", other))),
        }
    }

    /// Single scalar at the key's path; several or none count as absent
    fn value_of<'a>(&self, hit: &'a ScoredHit) -> Option<Scalar<'a>> {
        let source = hit.source.as_ref()?;
        match values_at(source, &self.field).as_slice() {
            [value] => Scalar::from_value(*value),
            _ => None,
        }
    }

    fn compare(&self, a: &ScoredHit, b: &ScoredHit) -> Ordering {
        if self.field == SCORE_FIELD {
            return self.order.apply(a.score.total_cmp(&b.score));
        }
        match (self.value_of(a), self.value_of(b)) {
            (Some(left), Some(right)) => self.order.apply(left.natural_cmp(&right)),
            // Absent ranks above every value, so it leads a descending sort
            (Some(_), None) => self.order.apply(Ordering::Less),
            (None, Some(_)) => self.order.apply(Ordering::Greater),
            (None, None) => Ordering::Equal,
        }
    }
}

/// Parse a sort clause: one entry or a list of entries
pub fn parse_sort(value: &Value) -> Result<Vec<SortKey>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(entries) => entries.iter().map(SortKey::parse).collect(),
        entry => Ok(vec![SortKey::parse(entry)?]),
    }
}

/// Multi-key comparator, ties fall through to the next key
pub fn compare_hits(keys: &[SortKey], a: &ScoredHit, b: &ScoredHit) -> Ordering {
    keys.iter()
        .map(|key| key.compare(a, b))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Relevance rounded down to hundredths
fn score_bucket(score: f64) -> i64 {
    (score * 100.0).trunc() as i64
}

/// Sort in place. Without keys hits order by descending coarse score and
/// keep store order inside a bucket.
pub fn sort_hits(hits: &mut [ScoredHit], keys: &[SortKey]) {
    if keys.is_empty() {
        hits.sort_by(|a, b| score_bucket(b.score).cmp(&score_bucket(a.score)));
    } else {
        hits.sort_by(|a, b| compare_hits(keys, a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(id: &str, score: f64, source: Value) -> ScoredHit {
        ScoredHit::new("people", id, score, source)
    }

    fn ids(hits: &[ScoredHit]) -> Vec<&str> {
        hits.iter().map(|hit| hit.id.as_str()).collect()
    }

    #[test]
    fn test_parse_forms() {
        let keys = parse_sort(&json!(["name", {"age": "desc"}, {"rank": {"order": "ASC"}}, "_score"])).unwrap();
        assert_eq!(
            keys,
            vec![SortKey::asc("name"), SortKey::desc("age"), SortKey::asc("rank"), SortKey::desc("_score")]
        );
        assert!(parse_sort(&json!([{"age": "sideways"}])).unwrap_err().is_validation());
    }

    #[test]
    fn test_absent_values_follow_direction() {
        let mut hits = vec![
            hit("1", 1.0, json!({"age": 30})),
            hit("2", 1.0, json!({})),
            hit("3", 1.0, json!({"age": 20})),
            hit("4", 1.0, json!({"age": [1, 2]})),
        ];

        sort_hits(&mut hits, &[SortKey::asc("age")]);
        assert_eq!(ids(&hits), vec!["3", "1", "2", "4"]);

        sort_hits(&mut hits, &[SortKey::desc("age")]);
        assert_eq!(ids(&hits), vec!["2", "4", "1", "3"]);
    }

    #[test]
    fn test_ties_fall_through_to_next_key() {
        let mut hits = vec![
            hit("1", 1.0, json!({"team": "red", "name": "zoe"})),
            hit("2", 1.0, json!({"team": "blue", "name": "yan"})),
            hit("3", 1.0, json!({"team": "red", "name": "abe"})),
        ];
        sort_hits(&mut hits, &[SortKey::asc("team.keyword"), SortKey::asc("name")]);
        assert_eq!(ids(&hits), vec!["2", "3", "1"]);
    }

    #[test]
    fn test_default_order_is_coarse_and_stable() {
        let mut hits = vec![
            hit("1", 0.811, json!({})),
            hit("2", 1.0, json!({})),
            hit("3", 0.819, json!({})),
            hit("4", 0.5, json!({})),
        ];
        sort_hits(&mut hits, &[]);
        assert_eq!(ids(&hits), vec!["2", "1", "3", "4"]);
    }

    #[test]
    fn test_coarse_buckets_split_close_scores() {
        // 0.809 and 0.811 straddle the 0.81 boundary
        let mut hits = vec![hit("1", 0.809, json!({})), hit("2", 0.811, json!({})), hit("3", 0.818, json!({}))];
        sort_hits(&mut hits, &[]);
        assert_eq!(ids(&hits), vec!["2", "3", "1"]);
    }

    #[test]
    fn test_score_key() {
        let mut hits = vec![hit("1", 0.5, json!({})), hit("2", 2.0, json!({}))];
        sort_hits(&mut hits, &[SortKey::desc(SCORE_FIELD)]);
        assert_eq!(ids(&hits), vec!["2", "1"]);
    }
}
