use std::sync::Arc;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde_json::{Map, Value};
use uuid::Uuid;
use crate::core::error::{Error, Result};
use crate::core::types::{Document, IndexInfo};
use crate::index::documents::DocumentTable;
use crate::schema::schema::Schema;
use crate::scoring::scorer::Scorer;
use crate::search::results::ScoredHit;

/// A named collection of documents with its mappings and settings
#[derive(Debug, Clone)]
pub struct Index {
    pub name: String,
    pub uuid: Uuid,
    pub created_at: DateTime<Utc>,
    documents: DocumentTable,
    schema: Arc<Schema>,
    settings: Value,
}

impl Index {
    pub fn new(name: &str) -> Self {
        Index {
            name: name.to_string(),
            uuid: Uuid::new_v4(),
            created_at: Utc::now(),
            documents: DocumentTable::new(),
            schema: Arc::new(Schema::new(name)),
            settings: Value::Object(Map::new()),
        }
    }

    /// Insert or replace a document. Returns true when the id was new.
    pub fn put(&mut self, id: String, document: Document) -> Result<bool> {
        if !document.is_object() {
            return Err(Error::validation(format!(
                "document [{}] of index [{}] must be a JSON object", id, self.name
            )));
        }
        Ok(self.documents.put(id, document))
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Document> {
        self.documents.remove(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> impl Iterator<Item = (&str, &Document)> {
        self.documents.iter()
    }

    /// Shared snapshot of the current mappings. Compiled queries hold on to it.
    pub fn schema(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    pub fn set_mappings(&mut self, tree: &Value) -> Result<()> {
        self.schema = Arc::new(Schema::from_mapping_tree(&self.name, tree)?);
        Ok(())
    }

    pub fn settings(&self) -> &Value {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Value) {
        self.settings = settings;
    }

    /// `index.blocks.write` set to true, in flat or nested form
    pub fn is_write_blocked(&self) -> bool {
        let candidates = [
            self.settings.get("index.blocks.write"),
            self.settings.pointer("/index/blocks/write"),
            self.settings.pointer("/blocks/write"),
        ];
        candidates.into_iter().flatten().any(|value| match value {
            Value::Bool(flag) => *flag,
            Value::String(flag) => flag == "true",
            _ => false,
        })
    }

    /// Copy of this index under another name, with a fresh identity
    pub fn clone_as(&self, name: &str) -> Index {
        let mut schema = (*self.schema).clone();
        schema.index_name = name.to_string();
        Index {
            name: name.to_string(),
            uuid: Uuid::new_v4(),
            created_at: Utc::now(),
            documents: self.documents.clone(),
            schema: Arc::new(schema),
            settings: self.settings.clone(),
        }
    }

    /// Score every document and keep the ones scoring above zero, in store order.
    pub fn score(&self, scorer: &dyn Scorer, parallel_threshold: usize) -> Vec<ScoredHit> {
        let to_hit = |(id, document): (&str, &Document)| {
            let score = scorer.score(document);
            (score > 0.0).then(|| ScoredHit::new(&self.name, id, score, document.clone()))
        };

        if self.documents.len() >= parallel_threshold {
            let entries: Vec<(&str, &Document)> = self.documents.iter().collect();
            entries.into_par_iter().filter_map(to_hit).collect()
        } else {
            self.documents.iter().filter_map(to_hit).collect()
        }
    }

    pub fn info(&self) -> IndexInfo {
        IndexInfo {
            name: self.name.clone(),
            uuid: self.uuid,
            created_at: self.created_at,
            doc_count: self.documents.len(),
        }
    }
}
