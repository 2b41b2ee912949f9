use serde_json::Value;
use crate::aggregation::{parse_aggregations, AggregationRequest};
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::query::ast::Query;
use crate::query::parser::parse_query;
use crate::search::highlight::HighlightRequest;
use crate::search::sort::{parse_sort, SortKey};
use crate::search::source::SourceFilter;

/// Parsed search body
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: Query,
    pub aggregations: Vec<(String, AggregationRequest)>,
    pub sort: Vec<SortKey>,
    pub highlight: Option<HighlightRequest>,
    pub from: usize,
    pub size: usize,
    pub source: SourceFilter,
    /// Keep-alive of the scroll cursor to open, e.g. `1m`
    pub scroll: Option<String>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        SearchRequest::new(Query::MatchAll)
    }
}

fn offset(body: &Value, name: &str, default: usize) -> Result<usize> {
    match body.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value
            .as_u64()
            .map(|value| value as usize)
            .ok_or_else(|| Error::validation(format!("[{}] must be a non-negative integer, got {}", name, value))),
    }
}

impl SearchRequest {
    pub fn new(query: Query) -> Self {
        SearchRequest {
            query,
            aggregations: Vec::new(),
            sort: Vec::new(),
            highlight: None,
            from: 0,
            size: Config::default().default_page_size,
            source: SourceFilter::All,
            scroll: None,
        }
    }

    /// Parse with the default configuration
    pub fn from_json(body: &Value) -> Result<Self> {
        Self::parse(body, &Config::default())
    }

    /// Parse `query`, `aggs`/`aggregations`, `sort`, `highlight`, `from`,
    /// `size` and `_source`. The scroll keep-alive travels outside the body,
    /// see `with_scroll`.
    pub fn parse(body: &Value, config: &Config) -> Result<Self> {
        if !(body.is_object() || body.is_null()) {
            return Err(Error::validation("search body must be an object"));
        }

        let query = match body.get("query") {
            Some(query) => parse_query(query)?,
            None => Query::MatchAll,
        };
        let aggregations = match body.get("aggregations").or_else(|| body.get("aggs")) {
            None | Some(Value::Null) => Vec::new(),
            Some(tree) => parse_aggregations(tree, config.default_bucket_size)?,
        };
        let sort = match body.get("sort") {
            Some(sort) => parse_sort(sort)?,
            None => Vec::new(),
        };
        let highlight = match body.get("highlight") {
            None | Some(Value::Null) => None,
            Some(highlight) => Some(HighlightRequest::parse(highlight)?),
        };
        let source = match body.get("_source") {
            Some(source) => SourceFilter::parse(source)?,
            None => SourceFilter::All,
        };

        Ok(SearchRequest {
            query,
            aggregations,
            sort,
            highlight,
            from: offset(body, "from", 0)?,
            size: offset(body, "size", config.default_page_size)?,
            source,
            scroll: None,
        })
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn with_from(mut self, from: usize) -> Self {
        self.from = from;
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_sort(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn with_aggregation(mut self, name: &str, aggregation: AggregationRequest) -> Self {
        self.aggregations.push((name.to_string(), aggregation));
        self
    }

    pub fn with_highlight(mut self, highlight: HighlightRequest) -> Self {
        self.highlight = Some(highlight);
        self
    }

    pub fn with_source(mut self, source: SourceFilter) -> Self {
        self.source = source;
        self
    }

    pub fn with_scroll(mut self, keep_alive: &str) -> Self {
        self.scroll = Some(keep_alive.to_string());
        self
    }
}
