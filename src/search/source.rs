use regex::Regex;
use serde_json::{Map, Value};
use crate::core::error::{Error, Result};
use crate::core::utils::glob_to_regex;

/// `_source` filtering applied to the returned page
#[derive(Debug, Clone, Default)]
pub enum SourceFilter {
    #[default]
    All,
    Disabled,
    /// Top-level fields matching any include (all when empty) and no exclude
    Fields { includes: Vec<Regex>, excludes: Vec<Regex> },
}

fn field_pattern(name: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("^(?:{})$", glob_to_regex(name)))?)
}

fn patterns(value: Option<&Value>) -> Result<Vec<Regex>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(name)) => Ok(vec![field_pattern(name)?]),
        Some(Value::Array(names)) => names
            .iter()
            .map(|name| {
                name.as_str()
                    .ok_or_else(|| Error::validation("_source field names must be strings"))
                    .and_then(field_pattern)
            })
            .collect(),
        Some(_) => Err(Error::validation("_source fields must be a string or an array")),
    }
}

impl SourceFilter {
    pub fn parse(value: &Value) -> Result<Self> {
        match value {
            Value::Null | Value::Bool(true) => Ok(SourceFilter::All),
            Value::Bool(false) => Ok(SourceFilter::Disabled),
            Value::String(_) | Value::Array(_) => Ok(SourceFilter::Fields {
                includes: patterns(Some(value))?,
                excludes: Vec::new(),
            }),
            Value::Object(object) => Ok(SourceFilter::Fields {
                includes: patterns(object.get("includes").or_else(|| object.get("include")))?,
                excludes: patterns(object.get("excludes").or_else(|| object.get("exclude")))?,
            }),
            other => Err(Error::validation(format!("_source must be a boolean, a string, an array or an object, got {}", other))),
        }
    }

    pub fn apply(&self, source: Value) -> Option<Value> {
        match self {
            SourceFilter::All => Some(source),
            SourceFilter::Disabled => None,
            SourceFilter::Fields { includes, excludes } => {
                let Value::Object(fields) = source else { return Some(source) };
                let filtered: Map<String, Value> = fields
                    .into_iter()
                    .filter(|(name, _)| includes.is_empty() || includes.iter().any(|p| p.is_match(name)))
                    .filter(|(name, _)| !excludes.iter().any(|p| p.is_match(name)))
                    .collect();
                Some(Value::Object(filtered))
            }
        }
    }
}
