use std::collections::{BTreeMap, HashMap};
use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};
use crate::core::error::{Error, Result};
use crate::document::path::{self, strip_keyword};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Keyword,
    Long,
    Integer,
    Short,
    Byte,
    Double,
    Float,
    Boolean,
    Date,
    Nested,
    Object,
    /// Path scoped by an enclosing nested query
    NestedScope,
    Other(String),
}

impl FieldType {
    pub fn parse(name: &str) -> Self {
        match name {
            "text" => FieldType::Text,
            "keyword" => FieldType::Keyword,
            "long" => FieldType::Long,
            "integer" => FieldType::Integer,
            "short" => FieldType::Short,
            "byte" => FieldType::Byte,
            "double" => FieldType::Double,
            "float" => FieldType::Float,
            "boolean" => FieldType::Boolean,
            "date" => FieldType::Date,
            "nested" => FieldType::Nested,
            "object" => FieldType::Object,
            other => FieldType::Other(other.to_string()),
        }
    }
}

/// Field definition taken from a mapping tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub field_type: FieldType,
    pub copy_to: Vec<String>,
}

impl FieldMapping {
    pub fn of_type(field_type: FieldType) -> Self {
        FieldMapping { field_type, copy_to: Vec::new() }
    }

    fn from_definition(field: &str, definition: &Value) -> Result<Self> {
        let definition = definition.as_object().ok_or_else(|| {
            Error::validation(format!("mapping definition of [{}] must be an object", field))
        })?;

        // Fields declaring sub-properties without a type are objects
        let field_type = match definition.get("type").and_then(Value::as_str) {
            Some(name) => FieldType::parse(name),
            None if definition.contains_key("properties") => FieldType::Object,
            None => FieldType::Other(String::new()),
        };

        let copy_to = match definition.get("copy_to") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(target)) => vec![target.clone()],
            Some(Value::Array(targets)) => targets
                .iter()
                .map(|target| {
                    target.as_str().map(str::to_string).ok_or_else(|| {
                        Error::validation(format!("copy_to of [{}] must list field names", field))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(Error::validation(format!("copy_to of [{}] must be a string or an array", field))),
        };

        Ok(FieldMapping { field_type, copy_to })
    }
}

/// Field mappings of an index plus the derived copy-to table.
///
/// Nested `properties` are flattened to dotted paths. The raw tree is kept
/// verbatim so it can be handed back to clients unchanged.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub index_name: String,
    pub mappings: BTreeMap<String, FieldMapping>,
    pub copy_to_fields: HashMap<String, Vec<String>>,
    pub properties: Map<String, Value>,
}

impl Schema {
    pub fn new(index_name: &str) -> Self {
        Schema {
            index_name: index_name.to_string(),
            ..Schema::default()
        }
    }

    /// Build from `{"properties": {...}}` or a bare properties object
    pub fn from_mapping_tree(index_name: &str, tree: &Value) -> Result<Self> {
        let properties = match tree.get("properties") {
            Some(properties) => properties,
            None => tree,
        };
        let properties = properties
            .as_object()
            .ok_or_else(|| Error::validation("mapping properties must be an object"))?;

        let mut mappings = BTreeMap::new();
        collect_fields("", properties, &mut mappings)?;

        let mut schema = Schema {
            index_name: index_name.to_string(),
            mappings,
            copy_to_fields: HashMap::new(),
            properties: properties.clone(),
        };
        schema.rebuild_copy_to();
        Ok(schema)
    }

    fn rebuild_copy_to(&mut self) {
        let mut copy_to_fields: HashMap<String, Vec<String>> = HashMap::new();
        for (field, mapping) in &self.mappings {
            for target in &mapping.copy_to {
                copy_to_fields.entry(target.clone()).or_default().push(field.clone());
            }
        }
        self.copy_to_fields = copy_to_fields;
    }

    pub fn field(&self, path: &str) -> Option<&FieldMapping> {
        self.mappings.get(path)
    }

    pub fn is_nested(&self, path: &str) -> bool {
        self.field(path).is_some_and(|mapping| mapping.field_type == FieldType::Nested)
    }

    /// Source fields mirrored into `target` through copy_to
    pub fn copy_to_sources(&self, target: &str) -> Option<&[String]> {
        self.copy_to_fields.get(target).map(Vec::as_slice)
    }

    /// Mapped field names followed by copy-to targets
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.mappings.keys().map(String::as_str).chain(self.copy_to_fields.keys().map(String::as_str))
    }

    /// Values at `path`, redirected to the copy-to sources when `path` is a
    /// copy-to target.
    pub fn resolve<'a>(&self, document: &'a Value, path: &str) -> Vec<&'a Value> {
        let path = strip_keyword(path);
        match self.copy_to_fields.get(path) {
            Some(sources) => sources
                .iter()
                .flat_map(|source| path::values_at(document, source))
                .collect(),
            None => path::values_at(document, path),
        }
    }

    /// Copy of this schema with one mapping replaced
    pub fn with_override(&self, path: &str, mapping: FieldMapping) -> Self {
        let mut schema = self.clone();
        schema.mappings.insert(path.to_string(), mapping);
        schema.rebuild_copy_to();
        schema
    }

    /// Mapping tree in wire form
    pub fn to_mapping_tree(&self) -> Value {
        serde_json::json!({ "properties": Value::Object(self.properties.clone()) })
    }
}

fn collect_fields(prefix: &str, properties: &Map<String, Value>, out: &mut BTreeMap<String, FieldMapping>) -> Result<()> {
    for (name, definition) in properties {
        let path = if prefix.is_empty() { name.clone() } else { format!("{}.{}", prefix, name) };
        let mapping = FieldMapping::from_definition(&path, definition)?;
        if let Some(children) = definition.get("properties").and_then(Value::as_object) {
            collect_fields(&path, children, out)?;
        }
        out.insert(path, mapping);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::from_mapping_tree("books", &json!({
            "properties": {
                "title": {"type": "text", "copy_to": "all_text"},
                "summary": {"type": "text", "copy_to": ["all_text"]},
                "isbn": {"type": "keyword"},
                "comments": {
                    "type": "nested",
                    "properties": {"author": {"type": "keyword"}}
                }
            }
        })).unwrap()
    }

    #[test]
    fn test_copy_to_table_is_derived() {
        let schema = schema();
        assert_eq!(schema.copy_to_sources("all_text").unwrap(), &["summary".to_string(), "title".to_string()]);
        assert!(schema.copy_to_sources("title").is_none());
    }

    #[test]
    fn test_nested_properties_flatten() {
        let schema = schema();
        assert!(schema.is_nested("comments"));
        assert_eq!(schema.field("comments.author").unwrap().field_type, FieldType::Keyword);
    }

    #[test]
    fn test_resolve_follows_copy_to() {
        let schema = schema();
        let doc = json!({"title": "Dune", "summary": "Spice", "isbn": "42"});

        let values: Vec<&str> = schema.resolve(&doc, "all_text").iter().filter_map(|v| v.as_str()).collect();
        assert_eq!(values, vec!["Spice", "Dune"]);

        let isbn: Vec<&str> = schema.resolve(&doc, "isbn.keyword").iter().filter_map(|v| v.as_str()).collect();
        assert_eq!(isbn, vec!["42"]);
    }

    #[test]
    fn test_override_keeps_other_fields() {
        let schema = schema();
        let scoped = schema.with_override("comments", FieldMapping::of_type(FieldType::NestedScope));

        assert!(!scoped.is_nested("comments"));
        assert!(scoped.copy_to_sources("all_text").is_some());
        assert!(schema.is_nested("comments"));
    }

    #[test]
    fn test_rejects_non_object_properties() {
        let err = Schema::from_mapping_tree("books", &json!({"properties": 3})).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_mapping_tree_round_trip() {
        let schema = schema();
        assert_eq!(schema.to_mapping_tree()["properties"]["isbn"], json!({"type": "keyword"}));
    }
}
