use serde_json::{Map, Value};
use crate::core::error::{Error, Result};
use crate::core::utils::canonical_number;
use crate::query::ast::{
    BoolQuery, ExistsQuery, MatchQuery, NestedQuery, Query, RangeQuery, TermQuery, TermsQuery, WildcardQuery,
};

/// Parse a query DSL object into a Query AST.
///
/// `null` and `{}` mean match_all. Kinds this store does not evaluate parse
/// to `Query::Unsupported` so they can degrade at compile time.
pub fn parse_query(value: &Value) -> Result<Query> {
    let object = match value {
        Value::Null => return Ok(Query::MatchAll),
        Value::Object(object) => object,
        other => return Err(Error::validation(format!("query must be an object, got {}", other))),
    };

    let mut entries = object.iter();
    let (kind, body) = match (entries.next(), entries.next()) {
        (None, _) => return Ok(Query::MatchAll),
        (Some(entry), None) => entry,
        (Some(_), Some(_)) => {
            return Err(Error::validation("query object must hold exactly one query kind"));
        }
    };

    match kind.as_str() {
        "bool" => parse_bool(body),
        "match" => parse_match(body),
        "wildcard" => parse_wildcard(body),
        "term" => parse_term(body),
        "terms" => parse_terms(body),
        "exists" => parse_exists(body),
        "nested" => parse_nested(body),
        "range" => parse_range(body),
        "match_all" => Ok(Query::MatchAll),
        other => Ok(Query::Unsupported(other.to_string())),
    }
}

fn body_object<'a>(kind: &str, body: &'a Value) -> Result<&'a Map<String, Value>> {
    body.as_object()
        .ok_or_else(|| Error::validation(format!("[{}] query must be an object", kind)))
}

/// The `{field: parameters}` entry of a single-field query
fn field_entry<'a>(kind: &str, body: &'a Map<String, Value>) -> Result<(&'a String, &'a Value)> {
    body.iter()
        .find(|(key, _)| key.as_str() != "boost")
        .ok_or_else(|| Error::validation(format!("[{}] query requires a field", kind)))
}

fn clauses(kind: &str, body: &Map<String, Value>, clause: &str) -> Result<Vec<Query>> {
    match body.get(clause) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(queries)) => queries.iter().map(parse_query).collect(),
        Some(query @ Value::Object(_)) => Ok(vec![parse_query(query)?]),
        Some(_) => Err(Error::validation(format!("[{}] clause [{}] must be an object or an array", kind, clause))),
    }
}

fn parse_bool(body: &Value) -> Result<Query> {
    let body = body_object("bool", body)?;
    Ok(Query::Bool(BoolQuery {
        must: clauses("bool", body, "must")?,
        must_not: clauses("bool", body, "must_not")?,
        should: clauses("bool", body, "should")?,
        filter: clauses("bool", body, "filter")?,
    }))
}

/// Query text given as a string or a number
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => number.as_f64().map(canonical_number),
        _ => None,
    }
}

fn parse_match(body: &Value) -> Result<Query> {
    let body = body_object("match", body)?;
    let (field, parameters) = field_entry("match", body)?;
    let query = match parameters {
        Value::Object(parameters) => parameters.get("query").and_then(text_of),
        other => text_of(other),
    };
    Ok(Query::Match(MatchQuery { field: field.clone(), query }))
}

fn parse_wildcard(body: &Value) -> Result<Query> {
    let body = body_object("wildcard", body)?;
    let (field, parameters) = field_entry("wildcard", body)?;
    let pattern = match parameters {
        Value::String(pattern) => Some(pattern.as_str()),
        Value::Object(parameters) => parameters
            .get("value")
            .or_else(|| parameters.get("wildcard"))
            .and_then(Value::as_str),
        _ => None,
    };
    let pattern = pattern.ok_or_else(|| {
        Error::validation(format!("[wildcard] query on [{}] requires a string value", field))
    })?;
    Ok(Query::Wildcard(WildcardQuery { field: field.clone(), pattern: pattern.to_string() }))
}

fn parse_term(body: &Value) -> Result<Query> {
    let body = body_object("term", body)?;
    let (field, parameters) = field_entry("term", body)?;
    let (value, boost) = match parameters {
        Value::Object(parameters) => (
            parameters.get("value").cloned().unwrap_or(Value::Null),
            parameters.get("boost").and_then(Value::as_f64).unwrap_or(1.0),
        ),
        scalar => (scalar.clone(), 1.0),
    };
    Ok(Query::Term(TermQuery { field: field.clone(), value, boost }))
}

fn parse_terms(body: &Value) -> Result<Query> {
    let body = body_object("terms", body)?;
    let boost = body.get("boost").and_then(Value::as_f64).unwrap_or(1.0);
    let (field, values) = field_entry("terms", body)?;
    let values = values.as_array().ok_or_else(|| {
        Error::validation(format!("[terms] query on [{}] requires an array of values", field))
    })?;
    Ok(Query::Terms(TermsQuery { field: field.clone(), values: values.clone(), boost }))
}

fn parse_exists(body: &Value) -> Result<Query> {
    let body = body_object("exists", body)?;
    let field = body
        .get("field")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::validation("[exists] requires 'field' field"))?;
    Ok(Query::Exists(ExistsQuery { field: field.to_string() }))
}

fn parse_nested(body: &Value) -> Result<Query> {
    let body = body_object("nested", body)?;
    let path = body
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::validation("[nested] requires 'path' field"))?;
    let query = match body.get("query") {
        None | Some(Value::Null) => return Err(Error::validation("[nested] requires 'query' field")),
        Some(query) => parse_query(query)?,
    };
    Ok(Query::Nested(NestedQuery { path: path.to_string(), query: Box::new(query) }))
}

fn parse_range(body: &Value) -> Result<Query> {
    let body = body_object("range", body)?;
    let (field, bounds) = field_entry("range", body)?;
    let bounds = bounds.as_object().ok_or_else(|| {
        Error::validation(format!("[range] query on [{}] requires an object of bounds", field))
    })?;
    let bound = |name: &str| bounds.get(name).filter(|value| !value.is_null()).cloned();
    Ok(Query::Range(RangeQuery {
        field: field.clone(),
        gt: bound("gt"),
        gte: bound("gte"),
        lt: bound("lt"),
        lte: bound("lte"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_query_is_match_all() {
        assert_eq!(parse_query(&Value::Null).unwrap(), Query::MatchAll);
        assert_eq!(parse_query(&json!({})).unwrap(), Query::MatchAll);
    }

    #[test]
    fn test_bool_accepts_single_clause_objects() {
        let query = parse_query(&json!({
            "bool": {
                "must": {"match": {"name": "alice"}},
                "should": [{"term": {"age": 30}}, {"term": {"age": 31}}]
            }
        })).unwrap();

        match query {
            Query::Bool(bool_query) => {
                assert_eq!(bool_query.must, vec![Query::matching("name", "alice")]);
                assert_eq!(bool_query.should.len(), 2);
                assert!(bool_query.must_not.is_empty());
            }
            other => panic!("unexpected query {:?}", other),
        }
    }

    #[test]
    fn test_match_forms() {
        assert_eq!(parse_query(&json!({"match": {"name": {"query": "bob"}}})).unwrap(), Query::matching("name", "bob"));
        assert_eq!(parse_query(&json!({"match": {"age": 30}})).unwrap(), Query::matching("age", "30"));
        assert_eq!(
            parse_query(&json!({"match": {"name": {"operator": "and"}}})).unwrap(),
            Query::Match(MatchQuery { field: "name".into(), query: None })
        );
    }

    #[test]
    fn test_term_boost_and_terms_boost() {
        let term = parse_query(&json!({"term": {"tag": {"value": "x", "boost": 2.0}}})).unwrap();
        assert_eq!(term, Query::Term(TermQuery { field: "tag".into(), value: json!("x"), boost: 2.0 }));

        let terms = parse_query(&json!({"terms": {"boost": 3, "tag": ["x", 1]}})).unwrap();
        assert_eq!(terms, Query::Terms(TermsQuery { field: "tag".into(), values: vec![json!("x"), json!(1)], boost: 3.0 }));
    }

    #[test]
    fn test_validation_errors() {
        for body in [
            json!({"exists": {}}),
            json!({"nested": {"query": {"match_all": {}}}}),
            json!({"nested": {"path": "comments"}}),
            json!({"terms": {"tag": "x"}}),
            json!({"match": {"a": "x"}, "term": {"b": "y"}}),
            json!("match"),
        ] {
            assert!(parse_query(&body).unwrap_err().is_validation(), "{}", body);
        }
    }

    #[test]
    fn test_unknown_kind_is_kept() {
        let query = parse_query(&json!({"geo_distance": {"distance": "2km"}})).unwrap();
        assert_eq!(query, Query::Unsupported("geo_distance".into()));
    }
}
