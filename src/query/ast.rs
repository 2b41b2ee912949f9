use serde::{Serialize, Deserialize};
use serde_json::Value;

/// Query DSL tree parsed from a search body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    Bool(BoolQuery),         // must / must_not / should / filter
    Match(MatchQuery),       // Token match with positional decay
    Wildcard(WildcardQuery), // Glob over string values
    Term(TermQuery),         // Exact value
    Terms(TermsQuery),       // Any of several exact values
    Exists(ExistsQuery),
    Nested(NestedQuery),
    Range(RangeQuery),
    MatchAll,
    /// Kind this store does not evaluate; scores zero
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolQuery {
    pub must: Vec<Query>,      // Every clause must score
    pub must_not: Vec<Query>,  // No clause may score
    pub should: Vec<Query>,    // Scores add up
    pub filter: Vec<Query>,    // Must score, adds nothing
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchQuery {
    pub field: String,
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WildcardQuery {
    pub field: String,
    pub pattern: String, // * and ? globs
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    pub field: String,
    pub value: Value,
    pub boost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsQuery {
    pub field: String,
    pub values: Vec<Value>,
    pub boost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistsQuery {
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedQuery {
    pub path: String,
    pub query: Box<Query>,
}

/// Bounds are kept as raw values; only numeric bounds are evaluated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeQuery {
    pub field: String,
    pub gt: Option<Value>,   // Greater than
    pub gte: Option<Value>,  // Greater than or equal
    pub lt: Option<Value>,   // Less than
    pub lte: Option<Value>,  // Less than or equal
}

impl Query {
    pub fn kind(&self) -> &str {
        match self {
            Query::Bool(_) => "bool",
            Query::Match(_) => "match",
            Query::Wildcard(_) => "wildcard",
            Query::Term(_) => "term",
            Query::Terms(_) => "terms",
            Query::Exists(_) => "exists",
            Query::Nested(_) => "nested",
            Query::Range(_) => "range",
            Query::MatchAll => "match_all",
            Query::Unsupported(kind) => kind,
        }
    }

    pub fn matching(field: &str, text: &str) -> Self {
        Query::Match(MatchQuery {
            field: field.to_string(),
            query: Some(text.to_string()),
        })
    }

    pub fn term(field: &str, value: Value) -> Self {
        Query::Term(TermQuery {
            field: field.to_string(),
            value,
            boost: 1.0,
        })
    }

    pub fn wildcard(field: &str, pattern: &str) -> Self {
        Query::Wildcard(WildcardQuery {
            field: field.to_string(),
            pattern: pattern.to_string(),
        })
    }
}

impl BoolQuery {
    pub fn new() -> Self {
        BoolQuery {
            must: Vec::new(),
            must_not: Vec::new(),
            should: Vec::new(),
            filter: Vec::new(),
        }
    }

    pub fn with_must(mut self, query: Query) -> Self {
        self.must.push(query);
        self
    }

    pub fn with_should(mut self, query: Query) -> Self {
        self.should.push(query);
        self
    }

    pub fn with_must_not(mut self, query: Query) -> Self {
        self.must_not.push(query);
        self
    }

    pub fn with_filter(mut self, query: Query) -> Self {
        self.filter.push(query);
        self
    }
}

impl Default for BoolQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeQuery {
    pub fn new(field: &str) -> Self {
        RangeQuery {
            field: field.to_string(),
            gt: None,
            gte: None,
            lt: None,
            lte: None,
        }
    }

    pub fn with_gte(mut self, bound: Value) -> Self {
        self.gte = Some(bound);
        self
    }

    pub fn with_lte(mut self, bound: Value) -> Self {
        self.lte = Some(bound);
        self
    }

    pub fn with_gt(mut self, bound: Value) -> Self {
        self.gt = Some(bound);
        self
    }

    pub fn with_lt(mut self, bound: Value) -> Self {
        self.lt = Some(bound);
        self
    }
}
