pub mod document;
pub mod error;
pub mod memory;
pub mod query;
pub mod sqlite;

use async_trait::async_trait;
use tokio::sync::broadcast;

pub use document::{decode, doc_id, encode, Document};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use query::{Filter, FilterOp, QueryOptions};
pub use sqlite::{SqliteStore, SqliteStoreConfig};

/// Kind of write that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Put,
    Delete,
}

/// Broadcast after every write so callers can invalidate derived state
/// without polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub collection: String,
    pub kind: ChangeKind,
}

/// Generic document store contract; any backing engine qualifies.
///
/// Per-document read-modify-write is not atomic against concurrent writers;
/// last writer wins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Upsert with shallow-merge: top-level fields of `doc` overwrite the
    /// stored document's fields, other stored fields survive. The document
    /// must carry an `id`.
    async fn put(&self, collection: &str, doc: Document) -> Result<String>;

    /// Insert, generating an id when the document has none.
    async fn add(&self, collection: &str, doc: Document) -> Result<String>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        options: QueryOptions,
    ) -> Result<Vec<Document>>;

    /// Subscribes to write notifications across all collections.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}
