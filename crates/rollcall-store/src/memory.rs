//! In-memory store backend, used by tests and single-process deployments.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::document::{doc_id, Document};
use crate::error::{Result, StoreError};
use crate::query::{apply_query, Filter, QueryOptions};
use crate::{ChangeKind, DocumentStore, StoreEvent};

const EVENT_CAPACITY: usize = 64;

pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { collections: RwLock::new(HashMap::new()), events }
    }

    fn notify(&self, collection: &str, kind: ChangeKind) {
        // No receivers is fine; nobody is watching yet.
        let _ = self.events.send(StoreEvent { collection: collection.to_string(), kind });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn put(&self, collection: &str, doc: Document) -> Result<String> {
        let id = doc_id(&doc).ok_or(StoreError::MissingId)?.to_string();

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        let merged = docs.entry(id.clone()).or_default();
        for (key, value) in doc {
            merged.insert(key, value);
        }
        drop(collections);

        self.notify(collection, ChangeKind::Put);
        Ok(id)
    }

    async fn add(&self, collection: &str, mut doc: Document) -> Result<String> {
        let id = match doc_id(&doc) {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                doc.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(&id) {
            return Err(StoreError::Duplicate(format!("{collection}/{id} already exists")));
        }
        docs.insert(id.clone(), doc);
        drop(collections);

        self.notify(collection, ChangeKind::Put);
        Ok(id)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        let removed =
            collections.get_mut(collection).and_then(|docs| docs.remove(id)).is_some();
        drop(collections);

        if !removed {
            return Err(StoreError::NotFound(format!("{collection}/{id}")));
        }
        self.notify(collection, ChangeKind::Delete);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        options: QueryOptions,
    ) -> Result<Vec<Document>> {
        let docs = self.get_all(collection).await?;
        Ok(apply_query(docs, filters, &options))
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}
