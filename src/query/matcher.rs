use std::sync::Arc;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use crate::core::error::{Error, Result};
use crate::core::utils::{canonical_number, glob_to_regex};
use crate::document::path::{leaf_name, parents_of_leaf};
use crate::document::value::Scalar;
use crate::query::ast::{BoolQuery, ExistsQuery, MatchQuery, NestedQuery, Query, RangeQuery, WildcardQuery};
use crate::schema::schema::{FieldMapping, FieldType, Schema};
use crate::scoring::scorer::{proximity, ConstantScorer, Scorer, ZeroScorer, EXACT_MATCH, LOOSE_MATCH};

/// Compile a query against a schema snapshot.
///
/// Argument problems surface here as `Validation` errors, before any
/// document is scored. Unsupported kinds compile to a zero scorer.
pub fn compile(query: &Query, schema: Arc<Schema>) -> Result<Box<dyn Scorer>> {
    match query {
        Query::MatchAll => Ok(Box::new(ConstantScorer)),
        Query::Bool(bool_query) => compile_bool(bool_query, schema),
        Query::Match(match_query) => Ok(Box::new(MatchScorer::new(match_query, schema))),
        Query::Wildcard(wildcard_query) => Ok(Box::new(WildcardScorer::new(wildcard_query, schema)?)),
        Query::Term(term_query) => {
            let values = if term_query.value.is_null() { Vec::new() } else { vec![term_query.value.clone()] };
            Ok(Box::new(TermScorer::new(&term_query.field, values, term_query.boost, schema)))
        }
        Query::Terms(terms_query) => Ok(Box::new(TermScorer::new(
            &terms_query.field,
            terms_query.values.clone(),
            terms_query.boost,
            schema,
        ))),
        Query::Exists(exists_query) => Ok(compile_exists(exists_query, &schema)),
        Query::Nested(nested_query) => compile_nested(nested_query, schema),
        Query::Range(range_query) => Ok(compile_range(range_query, schema)),
        Query::Unsupported(kind) => {
            tracing::warn!("Given query is unsupported: {}", kind);
            Ok(Box::new(ZeroScorer::new(format!("unsupported query [{}]", kind))))
        }
    }
}

fn compile_all(queries: &[Query], schema: &Arc<Schema>) -> Result<Vec<Box<dyn Scorer>>> {
    queries.iter().map(|query| compile(query, schema.clone())).collect()
}

fn compile_bool(bool_query: &BoolQuery, schema: Arc<Schema>) -> Result<Box<dyn Scorer>> {
    Ok(Box::new(BoolScorer {
        must: compile_all(&bool_query.must, &schema)?,
        must_not: compile_all(&bool_query.must_not, &schema)?,
        should: compile_all(&bool_query.should, &schema)?,
        filter: compile_all(&bool_query.filter, &schema)?,
    }))
}

fn compile_exists(exists_query: &ExistsQuery, schema: &Schema) -> Box<dyn Scorer> {
    match schema.field(&exists_query.field) {
        Some(mapping) if mapping.field_type == FieldType::Nested => {
            return Box::new(ZeroScorer::new(format!("[{}] is a nested field", exists_query.field)));
        }
        Some(_) => {}
        None => tracing::warn!(
            "Mapping for field '{}' of index '{}' has not been found, exists query may be incoherent",
            exists_query.field,
            schema.index_name
        ),
    }
    Box::new(ExistsScorer { field: exists_query.field.clone() })
}

fn compile_nested(nested_query: &NestedQuery, schema: Arc<Schema>) -> Result<Box<dyn Scorer>> {
    let path = nested_query.path.as_str();
    match schema.field(path) {
        Some(mapping) if mapping.field_type != FieldType::Nested => {
            return Err(Error::validation(format!("[nested] failed to find nested object under path [{}]", path)));
        }
        Some(_) => {}
        None => tracing::warn!(
            "Mapping for path '{}' of index '{}' has not been found, nested query may be incoherent",
            path,
            schema.index_name
        ),
    }

    let mut scope = FieldMapping::of_type(FieldType::NestedScope);
    if let Some(mapping) = schema.field(path) {
        scope.copy_to = mapping.copy_to.clone();
    }
    let inner = Arc::new(schema.with_override(path, scope));
    compile(&nested_query.query, inner)
}

fn compile_range(range_query: &RangeQuery, schema: Arc<Schema>) -> Box<dyn Scorer> {
    let supplied = [
        (RangeBound::Gt as fn(f64) -> RangeBound, &range_query.gt),
        (RangeBound::Gte, &range_query.gte),
        (RangeBound::Lt, &range_query.lt),
        (RangeBound::Lte, &range_query.lte),
    ];

    let mut bounds = Vec::new();
    for (bound, value) in supplied {
        let Some(value) = value else { continue };
        match value.as_f64() {
            Some(limit) => bounds.push(bound(limit)),
            None => {
                tracing::warn!("Range on non-numeric bound {} of [{}] is not supported", value, range_query.field);
                return Box::new(ZeroScorer::new(format!("non-numeric range on [{}]", range_query.field)));
            }
        }
    }

    Box::new(RangeScorer { field: range_query.field.clone(), bounds, schema })
}

/// Combines sub-scorers with must / must_not / should / filter semantics
pub struct BoolScorer {
    must: Vec<Box<dyn Scorer>>,
    must_not: Vec<Box<dyn Scorer>>,
    should: Vec<Box<dyn Scorer>>,
    filter: Vec<Box<dyn Scorer>>,
}

impl Scorer for BoolScorer {
    fn score(&self, document: &Value) -> f64 {
        let mut score = if self.should.is_empty() { 1.0 } else { 0.0 };

        for scorer in &self.filter {
            if scorer.score(document) <= 0.0 {
                return 0.0;
            }
        }
        for scorer in &self.must {
            let sub_score = scorer.score(document);
            if sub_score <= 0.0 {
                return 0.0;
            }
            score += sub_score;
        }
        for scorer in &self.must_not {
            let sub_score = scorer.score(document);
            if sub_score > 0.0 {
                return 0.0;
            }
            score += sub_score;
        }
        for scorer in &self.should {
            score += scorer.score(document);
        }
        score
    }

    fn name(&self) -> &str {
        "bool"
    }
}

/// Lower-case and split on single spaces. Empty tokens are kept so that
/// repeated spaces still advance positions.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase().split(' ').map(str::to_string).collect()
}

/// Token equality weighted by how early the token appears on both sides
pub struct MatchScorer {
    field: String,
    tokens: Vec<String>,
    schema: Arc<Schema>,
}

impl MatchScorer {
    pub fn new(match_query: &MatchQuery, schema: Arc<Schema>) -> Self {
        MatchScorer {
            field: match_query.field.clone(),
            tokens: match_query.query.as_deref().map(tokenize).unwrap_or_default(),
            schema,
        }
    }
}

impl Scorer for MatchScorer {
    fn score(&self, document: &Value) -> f64 {
        if self.tokens.is_empty() {
            return 0.0;
        }

        let mut score = 0.0;
        for value in self.schema.resolve(document, &self.field) {
            let text = match value {
                Value::String(text) => text.clone(),
                Value::Number(number) => match number.as_f64() {
                    Some(number) => canonical_number(number),
                    None => continue,
                },
                _ => continue,
            };
            let field_tokens = tokenize(&text);
            for (i, query_token) in self.tokens.iter().enumerate() {
                if query_token.is_empty() {
                    continue;
                }
                for (j, field_token) in field_tokens.iter().enumerate() {
                    if field_token == query_token {
                        score += proximity(i, j);
                    }
                }
            }
        }
        score
    }

    fn name(&self) -> &str {
        "match"
    }
}

/// Counts string values fully matching a glob, ignoring case
pub struct WildcardScorer {
    field: String,
    pattern: Regex,
    schema: Arc<Schema>,
}

impl WildcardScorer {
    pub fn new(wildcard_query: &WildcardQuery, schema: Arc<Schema>) -> Result<Self> {
        let pattern = RegexBuilder::new(&format!("^(?:{})$", glob_to_regex(&wildcard_query.pattern)))
            .case_insensitive(true)
            .build()?;
        Ok(WildcardScorer { field: wildcard_query.field.clone(), pattern, schema })
    }
}

impl Scorer for WildcardScorer {
    fn score(&self, document: &Value) -> f64 {
        self.schema
            .resolve(document, &self.field)
            .into_iter()
            .filter_map(Value::as_str)
            .filter(|text| self.pattern.is_match(text))
            .count() as f64
    }

    fn name(&self) -> &str {
        "wildcard"
    }
}

/// Exact (1.0) or canonical-string (0.8) equality against one or more values
pub struct TermScorer {
    field: String,
    values: Vec<Value>,
    canonical: Vec<String>,
    boost: f64,
    schema: Arc<Schema>,
}

impl TermScorer {
    pub fn new(field: &str, values: Vec<Value>, boost: f64, schema: Arc<Schema>) -> Self {
        let canonical = values.iter().map(crate::document::value::canonical_string).collect();
        TermScorer { field: field.to_string(), values, canonical, boost, schema }
    }
}

impl Scorer for TermScorer {
    fn score(&self, document: &Value) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }

        let mut score = 0.0;
        for value in self.schema.resolve(document, &self.field) {
            let Some(field_value) = Scalar::from_value(value) else { continue };
            let field_string = field_value.canonical_string();
            for (query_value, query_string) in self.values.iter().zip(&self.canonical) {
                if Scalar::from_value(query_value) == Some(field_value) {
                    score += EXACT_MATCH;
                } else if &field_string == query_string {
                    score += LOOSE_MATCH;
                }
            }
        }
        score * self.boost
    }

    fn name(&self) -> &str {
        "term"
    }
}

/// Counts enclosing objects that carry the leaf key, null values included
pub struct ExistsScorer {
    field: String,
}

impl Scorer for ExistsScorer {
    fn score(&self, document: &Value) -> f64 {
        let leaf = leaf_name(&self.field);
        parents_of_leaf(document, &self.field)
            .into_iter()
            .filter(|parent| parent.contains_key(leaf))
            .count() as f64
    }

    fn name(&self) -> &str {
        "exists"
    }
}

#[derive(Debug, Clone, Copy)]
enum RangeBound {
    Gt(f64),
    Gte(f64),
    Lt(f64),
    Lte(f64),
}

impl RangeBound {
    fn accepts(&self, value: f64) -> bool {
        match *self {
            RangeBound::Gt(limit) => value > limit,
            RangeBound::Gte(limit) => value >= limit,
            RangeBound::Lt(limit) => value < limit,
            RangeBound::Lte(limit) => value <= limit,
        }
    }
}

/// One point per numeric value inside every bound
pub struct RangeScorer {
    field: String,
    bounds: Vec<RangeBound>,
    schema: Arc<Schema>,
}

impl Scorer for RangeScorer {
    fn score(&self, document: &Value) -> f64 {
        let mut score = 0.0;
        for value in self.schema.resolve(document, &self.field) {
            match value {
                Value::Number(number) => {
                    let Some(number) = number.as_f64() else { continue };
                    if self.bounds.iter().all(|bound| bound.accepts(number)) {
                        score += 1.0;
                    }
                }
                Value::String(_) => tracing::warn!("Range over string values of [{}] is not supported", self.field),
                _ => {}
            }
        }
        score
    }

    fn name(&self) -> &str {
        "range"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::query::parser::parse_query;

    fn score(query: Value, document: Value) -> f64 {
        score_with(query, document, Schema::new("test"))
    }

    fn score_with(query: Value, document: Value, schema: Schema) -> f64 {
        let scorer = compile(&parse_query(&query).unwrap(), Arc::new(schema)).unwrap();
        scorer.score(&document)
    }

    fn nested_schema() -> Schema {
        Schema::from_mapping_tree("test", &json!({
            "properties": {
                "comments": {"type": "nested", "properties": {"author": {"type": "keyword"}}},
                "title": {"type": "text", "copy_to": "all"},
                "body": {"type": "text", "copy_to": "all"}
            }
        })).unwrap()
    }

    #[test]
    fn test_match_decays_with_position() {
        let doc = json!({"name": "Alice Smith"});
        assert_eq!(score(json!({"match": {"name": "alice"}}), doc.clone()), 1.0);
        assert!((score(json!({"match": {"name": "smith"}}), doc.clone()) - 0.9).abs() < 1e-12);
        assert!((score(json!({"match": {"name": "x smith"}}), doc.clone()) - 0.81).abs() < 1e-12);
        assert!((score(json!({"match": {"name": "x  smith"}}), doc.clone()) - 0.729).abs() < 1e-12);
        assert!((score(json!({"match": {"name": "smith"}}), json!({"name": "alice  smith"})) - 0.81).abs() < 1e-12);
        assert_eq!(score(json!({"match": {"name": "bob"}}), doc.clone()), 0.0);
        assert_eq!(score(json!({"match": {"name": ""}}), doc), 0.0);
    }

    #[test]
    fn test_match_numbers_use_canonical_form() {
        assert_eq!(score(json!({"match": {"age": "30"}}), json!({"age": 30.0})), 1.0);
        assert_eq!(score(json!({"match": {"flag": "true"}}), json!({"flag": true})), 0.0);
    }

    #[test]
    fn test_bool_semantics() {
        let doc = json!({"name": "alice", "team": "red"});
        assert_eq!(score(json!({"bool": {}}), doc.clone()), 1.0);
        assert_eq!(score(json!({"bool": {"must": [{"match": {"name": "alice"}}]}}), doc.clone()), 2.0);
        assert_eq!(score(json!({"bool": {"must": [{"match": {"name": "bob"}}]}}), doc.clone()), 0.0);
        assert_eq!(score(json!({"bool": {"must_not": [{"term": {"team": "red"}}]}}), doc.clone()), 0.0);
        assert_eq!(score(json!({"bool": {"should": [{"term": {"team": "blue"}}]}}), doc.clone()), 0.0);
        assert_eq!(score(json!({"bool": {"should": [{"term": {"team": "red"}}]}}), doc.clone()), 1.0);
        assert_eq!(score(json!({"bool": {"filter": [{"term": {"team": "red"}}]}}), doc.clone()), 1.0);
        assert_eq!(score(json!({"bool": {"filter": [{"term": {"team": "blue"}}]}}), doc), 0.0);
    }

    #[test]
    fn test_term_exact_and_loose() {
        assert_eq!(score(json!({"term": {"age": 30}}), json!({"age": 30})), 1.0);
        assert_eq!(score(json!({"term": {"age": "30"}}), json!({"age": 30})), 0.8);
        assert_eq!(score(json!({"term": {"age": {"value": 30, "boost": 2}}}), json!({"age": 30})), 2.0);
        assert_eq!(score(json!({"term": {"tags": "a"}}), json!({"tags": ["a", "b", "a"]})), 2.0);
        assert_eq!(score(json!({"term": {"age": {"boost": 2}}}), json!({"age": 30})), 0.0);
    }

    #[test]
    fn test_terms_sums_per_value() {
        let doc = json!({"tag": "b"});
        assert_eq!(score(json!({"terms": {"tag": ["a", "b"]}}), doc.clone()), 1.0);
        assert_eq!(score(json!({"terms": {"tag": ["b", "b"], "boost": 0.5}}), doc.clone()), 1.0);
        assert_eq!(score(json!({"terms": {"tag": []}}), doc), 0.0);
    }

    #[test]
    fn test_wildcard_is_anchored_and_case_insensitive() {
        let doc = json!({"name": "Alice.Smith"});
        assert_eq!(score(json!({"wildcard": {"name": "ali*"}}), doc.clone()), 1.0);
        assert_eq!(score(json!({"wildcard": {"name": {"value": "alice?smith"}}}), doc.clone()), 1.0);
        assert_eq!(score(json!({"wildcard": {"name": "lice*"}}), doc.clone()), 0.0);
        assert_eq!(score(json!({"wildcard": {"name": "alice.smit(h"}}), doc), 0.0);
    }

    #[test]
    fn test_exists_counts_parents_holding_the_key() {
        let doc = json!({"a": null, "items": [{"b": 1}, {"b": null}, {"c": 2}]});
        assert_eq!(score(json!({"exists": {"field": "a"}}), doc.clone()), 1.0);
        assert_eq!(score(json!({"exists": {"field": "items.b"}}), doc.clone()), 2.0);
        assert_eq!(score(json!({"exists": {"field": "missing"}}), doc), 0.0);
    }

    #[test]
    fn test_exists_on_nested_field_scores_zero() {
        let doc = json!({"comments": [{"author": "x"}]});
        assert_eq!(score_with(json!({"exists": {"field": "comments"}}), doc.clone(), nested_schema()), 0.0);
        assert_eq!(
            score_with(
                json!({"nested": {"path": "comments", "query": {"exists": {"field": "comments"}}}}),
                doc,
                nested_schema()
            ),
            1.0
        );
    }

    #[test]
    fn test_nested_rejects_non_nested_path() {
        let query = parse_query(&json!({"nested": {"path": "title", "query": {"match_all": {}}}})).unwrap();
        let err = compile(&query, Arc::new(nested_schema())).err().unwrap();
        assert!(err.is_validation());
    }

    #[test]
    fn test_nested_on_unmapped_path_still_evaluates() {
        let query = json!({"nested": {"path": "comments", "query": {"match": {"comments.author": "x"}}}});
        let doc = json!({"comments": [{"author": "x"}, {"author": "y"}]});
        assert!(score(query, doc) > 0.0);
    }

    #[test]
    fn test_copy_to_targets_resolve_to_sources() {
        let doc = json!({"title": "dune", "body": "desert planet"});
        assert!(score_with(json!({"match": {"all": "planet"}}), doc, nested_schema()) > 0.0);
    }

    #[test]
    fn test_range_bounds() {
        let doc = json!({"age": [10, 20, 30]});
        assert_eq!(score(json!({"range": {"age": {"gte": 20}}}), doc.clone()), 2.0);
        assert_eq!(score(json!({"range": {"age": {"gt": 10, "lt": 30}}}), doc.clone()), 1.0);
        assert_eq!(score(json!({"range": {"age": {"gte": 20, "lte": 20}}}), doc.clone()), 1.0);
        assert_eq!(score(json!({"range": {"age": {"gte": "now-1d"}}}), doc), 0.0);
    }

    #[test]
    fn test_unsupported_kind_scores_zero() {
        assert_eq!(score(json!({"geo_shape": {"area": {}}}), json!({"area": 1})), 0.0);
    }
}
