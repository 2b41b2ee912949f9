use std::collections::{BTreeMap, HashMap};
use crate::core::types::Document;

/// Id → document table that iterates in insertion order.
///
/// Replacing an existing id keeps its original position.
#[derive(Debug, Clone, Default)]
pub struct DocumentTable {
    by_sequence: BTreeMap<u64, (String, Document)>,
    sequences: HashMap<String, u64>,
    next_sequence: u64,
}

impl DocumentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Returns true when the id was new.
    pub fn put(&mut self, id: String, document: Document) -> bool {
        if let Some(sequence) = self.sequences.get(&id) {
            if let Some(entry) = self.by_sequence.get_mut(sequence) {
                entry.1 = document;
            }
            return false;
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.sequences.insert(id.clone(), sequence);
        self.by_sequence.insert(sequence, (id, document));
        true
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.sequences
            .get(id)
            .and_then(|sequence| self.by_sequence.get(sequence))
            .map(|(_, document)| document)
    }

    pub fn remove(&mut self, id: &str) -> Option<Document> {
        let sequence = self.sequences.remove(id)?;
        self.by_sequence.remove(&sequence).map(|(_, document)| document)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sequences.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Document)> {
        self.by_sequence.values().map(|(id, document)| (id.as_str(), document))
    }
}
