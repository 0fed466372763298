use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{validate_document_id, Document, DocumentStore, StoreError};

/// In-process document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, HashMap<String, Document>>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a whole document.
    pub async fn insert(&self, collection: &str, id: &str, document: Document) {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
    }

    /// Snapshot of every document in a collection.
    pub async fn documents(&self, collection: &str) -> Vec<(String, Document)> {
        let collections = self.collections.read().await;
        let mut documents: Vec<_> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default();
        documents.sort_by(|a, b| a.0.cmp(&b.0));
        documents
    }

    pub async fn len(&self, collection: &str) -> usize {
        let collections = self.collections.read().await;
        collections.get(collection).map(HashMap::len).unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        validate_document_id(id)?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn merge(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        validate_document_id(id)?;
        let mut collections = self.collections.write().await;
        let document = collections
            .entry(collection.to_string())
            .or_default()
            .entry(id.to_string())
            .or_default();
        document.extend(fields);
        Ok(())
    }

    async fn add(&self, collection: &str, fields: Document) -> Result<String, StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        // Zero-padded so `documents()` lists appended notes in order. Seeded
        // documents may already hold an id from the sequence.
        let id = loop {
            let candidate = format!("doc-{:06}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
            if !docs.contains_key(&candidate) {
                break candidate;
            }
        };
        docs.insert(id.clone(), fields);
        Ok(id)
    }
}
