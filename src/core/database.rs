use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::RwLock;
use serde_json::Value;
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Document, IndexInfo};
use crate::core::utils::generate_identifier;
use crate::index::collection::Index;
use crate::search::executor::QueryExecutor;
use crate::search::request::SearchRequest;
use crate::search::results::{ScrollPage, SearchResults};
use crate::search::scroll::ScrollManager;

/// Attempts at drawing an unused document id before giving up
const MAX_ID_ATTEMPTS: usize = 8;

/// In-memory store of named indexes plus the open scroll cursors.
///
/// The index table and every index carry their own lock. Searches hold an
/// index's read lock only while scoring it.
pub struct Database {
    config: Config,

    indexes: RwLock<HashMap<String, Arc<RwLock<Index>>>>,

    scrolls: ScrollManager,
}

impl Default for Database {
    fn default() -> Self {
        Database::new(Config::default())
    }
}

impl Database {
    pub fn new(config: Config) -> Self {
        let scrolls = ScrollManager::new(config.scroll_capacity, config.id_length);
        Database {
            config,
            indexes: RwLock::new(HashMap::new()),
            scrolls,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn index(&self, name: &str) -> Result<Arc<RwLock<Index>>> {
        self.indexes
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::index_not_found(name))
    }

    fn index_or_create(&self, name: &str) -> Result<Arc<RwLock<Index>>> {
        if let Some(index) = self.indexes.read().get(name) {
            return Ok(index.clone());
        }
        if name.is_empty() {
            return Err(Error::validation("index name must not be empty"));
        }
        let mut indexes = self.indexes.write();
        let index = indexes.entry(name.to_string()).or_insert_with(|| {
            tracing::info!("Created index [{}]", name);
            Arc::new(RwLock::new(Index::new(name)))
        });
        Ok(index.clone())
    }

    /// Create an empty index. Returns false when it already existed.
    pub fn create_index(&self, name: &str, settings: Option<Value>) -> Result<bool> {
        let existed = self.index_exists(name);
        let index = self.index_or_create(name)?;
        if let Some(settings) = settings {
            index.write().set_settings(settings);
        }
        Ok(!existed)
    }

    pub fn delete_index(&self, name: &str) -> Result<()> {
        match self.indexes.write().remove(name) {
            Some(_) => {
                tracing::info!("Deleted index [{}]", name);
                Ok(())
            }
            None => Err(Error::index_not_found(name)),
        }
    }

    pub fn index_exists(&self, name: &str) -> bool {
        self.indexes.read().contains_key(name)
    }

    /// Names of every index, sorted
    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn index_info(&self, name: &str) -> Result<IndexInfo> {
        Ok(self.index(name)?.read().info())
    }

    /// Drop every index and every scroll cursor
    pub fn clear(&self) {
        self.indexes.write().clear();
        let closed = self.scrolls.close_all();
        tracing::info!("Cleared all indexes and {} scroll cursor(s)", closed);
    }

    /// Insert or replace a document, creating the index if needed.
    /// Returns true when the document is new.
    pub fn put(&self, index: &str, id: &str, document: Document) -> Result<bool> {
        self.index_or_create(index)?.write().put(id.to_string(), document)
    }

    /// Insert a document under a generated id
    pub fn add(&self, index: &str, document: Document) -> Result<String> {
        let index = self.index_or_create(index)?;
        let mut index = index.write();
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = generate_identifier(self.config.id_length);
            if index.get(&id).is_none() {
                index.put(id.clone(), document)?;
                return Ok(id);
            }
        }
        Err(Error::new(
            ErrorKind::Internal,
            format!("could not draw an unused document id in index [{}]", index.name),
        ))
    }

    pub fn get(&self, index: &str, id: &str) -> Result<Document> {
        self.index(index)?
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("document [{}] not found in index [{}]", id, index)))
    }

    /// Returns false when the document did not exist
    pub fn remove(&self, index: &str, id: &str) -> Result<bool> {
        Ok(self.index(index)?.write().remove(id).is_some())
    }

    /// Replace the mappings, creating the index if needed
    pub fn set_mappings(&self, index: &str, tree: &Value) -> Result<()> {
        self.index_or_create(index)?.write().set_mappings(tree)
    }

    pub fn mappings(&self, index: &str) -> Result<Value> {
        Ok(self.index(index)?.read().schema().to_mapping_tree())
    }

    /// Replace the settings, creating the index if needed
    pub fn set_settings(&self, index: &str, settings: Value) -> Result<()> {
        self.index_or_create(index)?.write().set_settings(settings);
        Ok(())
    }

    pub fn settings(&self, index: &str) -> Result<Value> {
        Ok(self.index(index)?.read().settings().clone())
    }

    pub fn count(&self, index: &str) -> Result<usize> {
        Ok(self.index(index)?.read().len())
    }

    /// Every (id, document) pair in insertion order
    pub fn documents(&self, index: &str) -> Result<Vec<(String, Document)>> {
        let index = self.index(index)?;
        let index = index.read();
        Ok(index
            .documents()
            .map(|(id, document)| (id.to_string(), document.clone()))
            .collect())
    }

    /// Copy a write-blocked index, documents, mappings and settings included
    pub fn clone_index(&self, source: &str, target: &str) -> Result<()> {
        let copy = {
            let index = self.index(source)?;
            let index = index.read();
            if !index.is_write_blocked() {
                return Err(Error::new(
                    ErrorKind::InvalidState,
                    format!("index {} must be read-only to resize index. use \"index.blocks.write=true\"", source),
                ));
            }
            index.clone_as(target)
        };

        let mut indexes = self.indexes.write();
        if indexes.contains_key(target) {
            return Err(Error::validation(format!("index [{}] already exists", target)));
        }
        indexes.insert(target.to_string(), Arc::new(RwLock::new(copy)));
        tracing::info!("Cloned index [{}] into [{}]", source, target);
        Ok(())
    }

    /// Copy every document of `source` into `dest`, creating it if needed.
    /// Returns the number of documents copied.
    pub fn reindex(&self, source: &str, dest: &str) -> Result<usize> {
        let documents = self.documents(source)?;
        let copied = documents.len();

        let index = self.index_or_create(dest)?;
        let mut index = index.write();
        for (id, document) in documents {
            index.put(id, document)?;
        }
        tracing::info!("Reindexed {} document(s) from [{}] into [{}]", copied, source, dest);
        Ok(copied)
    }

    pub fn search(&self, indices: &[&str], request: &SearchRequest) -> Result<SearchResults> {
        let indexes = indices
            .iter()
            .map(|name| self.index(name))
            .collect::<Result<Vec<_>>>()?;
        QueryExecutor::new(&self.config, &self.scrolls).execute(&indexes, request)
    }

    /// Parse a JSON search body with this database's defaults, then search
    pub fn search_json(&self, indices: &[&str], body: &Value) -> Result<SearchResults> {
        let request = SearchRequest::parse(body, &self.config)?;
        self.search(indices, &request)
    }

    /// Independent searches; one failing does not affect the others
    pub fn multi_search(&self, requests: Vec<(String, SearchRequest)>) -> Vec<Result<SearchResults>> {
        requests
            .iter()
            .map(|(index, request)| self.search(&[index.as_str()], request))
            .collect()
    }

    pub fn continue_scroll(&self, scroll_id: &str) -> Result<ScrollPage> {
        self.scrolls.continue_scroll(scroll_id)
    }

    /// Returns how many of the given cursors were open
    pub fn clear_scroll(&self, scroll_ids: &[&str]) -> Result<usize> {
        self.scrolls.close(scroll_ids)
    }

    pub fn active_scroll_ids(&self) -> Vec<String> {
        self.scrolls.active_ids()
    }
}
