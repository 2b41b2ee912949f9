use std::collections::BTreeSet;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use crate::core::error::{Error, Result};
use crate::core::utils::{glob_to_regex, is_glob};
use crate::document::path::values_at;
use crate::document::value::canonical_string;
use crate::query::ast::Query;
use crate::query::matcher::tokenize;
use crate::schema::schema::Schema;
use crate::search::results::Highlights;

pub const DEFAULT_PRE_TAG: &str = "<em>";
pub const DEFAULT_POST_TAG: &str = "</em>";

/// Produces snippets for the fields of one document
pub trait Highlighter: Send + Sync {
    fn highlight(&self, document: &Value) -> Highlights;
}

/// `highlight` section of a search body
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightRequest {
    pub fields: Vec<String>, // Names or globs
    pub pre_tag: String,
    pub post_tag: String,
}

impl HighlightRequest {
    pub fn new(fields: Vec<String>) -> Self {
        HighlightRequest {
            fields,
            pre_tag: DEFAULT_PRE_TAG.to_string(),
            post_tag: DEFAULT_POST_TAG.to_string(),
        }
    }

    pub fn with_tags(mut self, pre_tag: &str, post_tag: &str) -> Self {
        self.pre_tag = pre_tag.to_string();
        self.post_tag = post_tag.to_string();
        self
    }

    pub fn parse(body: &Value) -> Result<Self> {
        let body = body
            .as_object()
            .ok_or_else(|| Error::validation("highlight must be an object"))?;
        let fields = match body.get("fields") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(fields)) => fields.keys().cloned().collect(),
            // Array form: [{"title": {}}, ...]
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(Value::as_object)
                .flat_map(|entry| entry.keys().cloned())
                .collect(),
            Some(_) => return Err(Error::validation("highlight fields must be an object")),
        };

        let tag = |name: &str, default: &str| match body.get(name) {
            Some(Value::String(tag)) => tag.clone(),
            Some(Value::Array(tags)) => tags.first().and_then(Value::as_str).unwrap_or(default).to_string(),
            _ => default.to_string(),
        };
        Ok(HighlightRequest {
            fields,
            pre_tag: tag("pre_tags", DEFAULT_PRE_TAG),
            post_tag: tag("post_tags", DEFAULT_POST_TAG),
        })
    }

    /// Requested fields with globs expanded against mapped fields and copy_to targets
    pub fn eligible_fields(&self, schema: &Schema) -> Result<BTreeSet<String>> {
        let mut eligible = BTreeSet::new();
        for field in &self.fields {
            if !is_glob(field) {
                eligible.insert(field.clone());
                continue;
            }
            let pattern = Regex::new(&format!("^(?:{})$", glob_to_regex(field)))?;
            eligible.extend(schema.field_names().filter(|name| pattern.is_match(name)).map(str::to_string));
        }
        Ok(eligible)
    }
}

pub struct NoHighlighter;

impl Highlighter for NoHighlighter {
    fn highlight(&self, _document: &Value) -> Highlights {
        Highlights::new()
    }
}

/// Wraps every match of a pattern in the string values of one field
pub struct PatternHighlighter {
    field: String,
    pattern: Regex,
    pre_tag: String,
    post_tag: String,
}

impl PatternHighlighter {
    pub fn new(field: &str, pattern: Regex, request: &HighlightRequest) -> Self {
        PatternHighlighter {
            field: field.to_string(),
            pattern,
            pre_tag: request.pre_tag.clone(),
            post_tag: request.post_tag.clone(),
        }
    }

    /// `None` when the pattern has no non-empty match in `text`
    fn snippet(&self, text: &str) -> Option<String> {
        let mut snippet = String::with_capacity(text.len() + 16);
        let mut last = 0;
        let mut matched = false;
        for found in self.pattern.find_iter(text).filter(|found| !found.is_empty()) {
            matched = true;
            snippet.push_str(&text[last..found.start()]);
            snippet.push_str(&self.pre_tag);
            snippet.push_str(found.as_str());
            snippet.push_str(&self.post_tag);
            last = found.end();
        }
        snippet.push_str(&text[last..]);
        matched.then_some(snippet)
    }
}

impl Highlighter for PatternHighlighter {
    fn highlight(&self, document: &Value) -> Highlights {
        let snippets: Vec<String> = values_at(document, &self.field)
            .into_iter()
            .filter_map(Value::as_str)
            .filter_map(|text| self.snippet(text))
            .collect();

        let mut highlights = Highlights::new();
        if !snippets.is_empty() {
            highlights.insert(self.field.clone(), snippets);
        }
        highlights
    }
}

/// Concatenates the snippets of several highlighters per field
pub struct CompositeHighlighter {
    highlighters: Vec<Box<dyn Highlighter>>,
}

impl CompositeHighlighter {
    pub fn new(highlighters: Vec<Box<dyn Highlighter>>) -> Self {
        CompositeHighlighter { highlighters }
    }
}

impl Highlighter for CompositeHighlighter {
    fn highlight(&self, document: &Value) -> Highlights {
        let mut merged = Highlights::new();
        for highlighter in &self.highlighters {
            for (field, snippets) in highlighter.highlight(document) {
                merged.entry(field).or_default().extend(snippets);
            }
        }
        merged
    }
}

/// Build the highlighter for `query`. Only match, wildcard and term queries
/// on an eligible field highlight anything.
pub fn compile(query: &Query, request: &HighlightRequest, schema: &Schema) -> Result<Box<dyn Highlighter>> {
    let eligible = request.eligible_fields(schema)?;

    let (field, pattern) = match query {
        Query::Match(match_query) => {
            let mut tokens = match_query.query.as_deref().map(tokenize).unwrap_or_default();
            tokens.retain(|token| !token.is_empty());
            if tokens.is_empty() {
                return Ok(Box::new(NoHighlighter));
            }
            let alternation: Vec<String> = tokens.iter().map(|token| regex::escape(token)).collect();
            let pattern = RegexBuilder::new(&alternation.join("|")).case_insensitive(true).build()?;
            (&match_query.field, pattern)
        }
        Query::Wildcard(wildcard_query) => {
            let pattern = RegexBuilder::new(&glob_to_regex(&wildcard_query.pattern))
                .case_insensitive(true)
                .build()?;
            (&wildcard_query.field, pattern)
        }
        Query::Term(term_query) if !term_query.value.is_null() => {
            let pattern = Regex::new(&regex::escape(&canonical_string(&term_query.value)))?;
            (&term_query.field, pattern)
        }
        _ => return Ok(Box::new(NoHighlighter)),
    };

    if !eligible.contains(field.as_str()) {
        return Ok(Box::new(NoHighlighter));
    }

    match schema.copy_to_sources(field) {
        Some(sources) => Ok(Box::new(CompositeHighlighter::new(
            sources
                .iter()
                .map(|source| Box::new(PatternHighlighter::new(source, pattern.clone(), request)) as Box<dyn Highlighter>)
                .collect(),
        ))),
        None => Ok(Box::new(PatternHighlighter::new(field, pattern, request))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::query::parser::parse_query;

    fn schema() -> Schema {
        Schema::from_mapping_tree("books", &json!({
            "title": {"type": "text", "copy_to": "all"},
            "summary": {"type": "text", "copy_to": "all"},
            "isbn": {"type": "keyword"}
        })).unwrap()
    }

    fn highlight(query: Value, fields: &[&str], document: Value) -> Highlights {
        let request = HighlightRequest::new(fields.iter().map(|f| f.to_string()).collect());
        let query = parse_query(&query).unwrap();
        compile(&query, &request, &schema()).unwrap().highlight(&document)
    }

    #[test]
    fn test_match_wraps_every_token() {
        let highlights = highlight(
            json!({"match": {"title": "dune SPICE"}}),
            &["title"],
            json!({"title": "Dune: the spice must flow, spice"}),
        );
        assert_eq!(highlights["title"], vec!["<em>Dune</em>: the <em>spice</em> must flow, <em>spice</em>"]);
    }

    #[test]
    fn test_field_must_be_eligible() {
        let highlights = highlight(json!({"match": {"title": "dune"}}), &["summary"], json!({"title": "Dune"}));
        assert!(highlights.is_empty());
    }

    #[test]
    fn test_globs_expand_against_mappings() {
        let highlights = highlight(json!({"term": {"isbn": "42"}}), &["is*"], json!({"isbn": "0042"}));
        assert_eq!(highlights["isbn"], vec!["00<em>42</em>"]);
    }

    #[test]
    fn test_copy_to_target_highlights_sources() {
        let highlights = highlight(
            json!({"match": {"all": "desert"}}),
            &["all"],
            json!({"title": "Desert", "summary": "A desert planet"}),
        );
        assert_eq!(highlights["title"], vec!["<em>Desert</em>"]);
        assert_eq!(highlights["summary"], vec!["A <em>desert</em> planet"]);
        assert!(!highlights.contains_key("all"));
    }

    #[test]
    fn test_wildcard_and_custom_tags() {
        let request = HighlightRequest::parse(&json!({
            "fields": {"title": {}},
            "pre_tags": ["<b>"],
            "post_tags": ["</b>"]
        })).unwrap();
        let query = parse_query(&json!({"wildcard": {"title": "sp?ce"}})).unwrap();
        let highlights = compile(&query, &request, &schema()).unwrap().highlight(&json!({"title": "Space and SPICE"}));
        assert_eq!(highlights["title"], vec!["<b>Space</b> and <b>SPICE</b>"]);
    }

    #[test]
    fn test_term_is_case_sensitive_and_bool_is_ignored() {
        assert!(highlight(json!({"term": {"isbn": "AB"}}), &["isbn"], json!({"isbn": "ab"})).is_empty());
        assert!(highlight(
            json!({"bool": {"must": [{"match": {"title": "dune"}}]}}),
            &["title"],
            json!({"title": "Dune"})
        ).is_empty());
    }
}
