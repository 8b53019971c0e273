//! SQLite store backend: one schemaless `documents` table with JSON bodies.
//!
//! Filtering and ordering run on the decoded documents so the three query
//! operators behave identically to the in-memory backend.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::document::{doc_id, Document};
use crate::error::{Result, StoreError};
use crate::query::{apply_query, Filter, QueryOptions};
use crate::{ChangeKind, DocumentStore, StoreEvent};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct SqliteStoreConfig {
    pub path: String,
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self { path: "rollcall.db".to_string() }
    }
}

pub struct SqliteStore {
    pool: Pool<Sqlite>,
    events: broadcast::Sender<StoreEvent>,
}

impl SqliteStore {
    pub async fn new(config: SqliteStoreConfig) -> Result<Self> {
        let path = Path::new(&config.path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                info!("Created store directory: {}", parent.display());
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", config.path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await?;
        info!("Store connection pool created: {}", config.path);

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let store = Self { pool, events };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
        info!("Store connection pool closed");
    }

    fn notify(&self, collection: &str, kind: ChangeKind) {
        let _ = self.events.send(StoreEvent { collection: collection.to_string(), kind });
    }

    fn parse_body(body: &str) -> Result<Document> {
        match serde_json::from_str(body)? {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::InvalidDocument(format!(
                "stored body is not a JSON object: {other}"
            ))),
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>> {
        let rows = sqlx::query("SELECT body FROM documents WHERE collection = ? ORDER BY id")
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(|row| Self::parse_body(row.get::<&str, _>(0))).collect()
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Self::parse_body(row.get::<&str, _>(0))).transpose()
    }

    async fn put(&self, collection: &str, doc: Document) -> Result<String> {
        let id = doc_id(&doc).ok_or(StoreError::MissingId)?.to_string();

        let mut merged = self.get(collection, &id).await?.unwrap_or_default();
        for (key, value) in doc {
            merged.insert(key, value);
        }
        let body = serde_json::to_string(&Value::Object(merged))?;

        sqlx::query(
            "INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)
             ON CONFLICT (collection, id) DO UPDATE SET body = excluded.body",
        )
        .bind(collection)
        .bind(&id)
        .bind(&body)
        .execute(&self.pool)
        .await?;

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
        let body = serde_json::to_string(&Value::Object(doc))?;

        let result = sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)")
            .bind(collection)
            .bind(&id)
            .bind(&body)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => {
                self.notify(collection, ChangeKind::Put);
                Ok(id)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Duplicate(format!("{collection}/{id} already exists")))
            }
            Err(e) => Err(StoreError::Sqlx(e)),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
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
