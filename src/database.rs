use crate::chunking::TextChunk;
use crate::document::Metadata;
use crate::error::{RagError, Result};
use log::{debug, info};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

/// One chunk ready to persist: its id, text, metadata and vector
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub chunk: TextChunk,
    pub embedding: Vec<f32>,
}

/// A retrieved chunk and its cosine distance to the query (lower is closer)
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredResult {
    pub id: String,
    pub chunk: TextChunk,
    pub score: f64,
}

/// Named collections of embedded chunks with nearest-neighbour search.
#[allow(async_fn_in_trait)]
pub trait VectorStore {
    /// Create the collection if it does not exist yet.
    async fn create_collection(&self, collection: &str) -> Result<()>;

    async fn collection_exists(&self, collection: &str) -> Result<bool>;

    /// Remove the collection and everything stored in it. No-op if absent.
    async fn delete_collection(&self, collection: &str) -> Result<()>;

    /// Insert records in one batch, replacing any stored under the same id.
    async fn upsert(&self, collection: &str, records: &[VectorRecord]) -> Result<()>;

    /// The `k` nearest records to `embedding`, closest first.
    async fn similarity_search_with_score(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredResult>>;
}

/// Vector store backed by PostgreSQL with the pgvector extension
pub struct PgVectorStore {
    pool: PgPool,
}

impl PgVectorStore {
    /// Prepare a single-connection pool. The connection is opened on first use.
    pub fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy(&normalize_url(url))
            .map_err(map_err)?;

        debug!("Prepared pgvector connection pool");
        Ok(PgVectorStore { pool })
    }

    async fn schema_exists(&self) -> Result<bool> {
        let table: Option<String> =
            sqlx::query_scalar("SELECT to_regclass('rag_collection')::text")
                .fetch_one(&self.pool)
                .await
                .map_err(map_err)?;
        Ok(table.is_some())
    }

    async fn create_schema(&self) -> Result<()> {
        let statements = [
            "CREATE EXTENSION IF NOT EXISTS vector",
            "CREATE TABLE IF NOT EXISTS rag_collection (\
                name TEXT PRIMARY KEY, \
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()\
            )",
            "CREATE TABLE IF NOT EXISTS rag_embedding (\
                collection TEXT NOT NULL REFERENCES rag_collection(name) ON DELETE CASCADE, \
                id TEXT NOT NULL, \
                document TEXT NOT NULL, \
                metadata JSONB NOT NULL DEFAULT '{}'::jsonb, \
                embedding vector NOT NULL, \
                PRIMARY KEY (collection, id)\
            )",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(map_err)?;
        }

        Ok(())
    }
}

impl VectorStore for PgVectorStore {
    async fn create_collection(&self, collection: &str) -> Result<()> {
        self.create_schema().await?;

        let created = sqlx::query(
            "INSERT INTO rag_collection (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
        )
        .bind(collection)
        .execute(&self.pool)
        .await
        .map_err(map_err)?
        .rows_affected();

        if created > 0 {
            info!("Created collection {}", collection);
        }
        Ok(())
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        if !self.schema_exists().await? {
            return Ok(false);
        }

        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM rag_collection WHERE name = $1)")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        if !self.schema_exists().await? {
            return Ok(());
        }

        sqlx::query("DELETE FROM rag_collection WHERE name = $1")
            .bind(collection)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;

        info!("Deleted collection {}", collection);
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[VectorRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(map_err)?;

        for record in records {
            sqlx::query(
                "INSERT INTO rag_embedding (collection, id, document, metadata, embedding) \
                 VALUES ($1, $2, $3, $4, $5::vector) \
                 ON CONFLICT (collection, id) DO UPDATE SET \
                    document = EXCLUDED.document, \
                    metadata = EXCLUDED.metadata, \
                    embedding = EXCLUDED.embedding",
            )
            .bind(collection)
            .bind(&record.id)
            .bind(&record.chunk.text)
            .bind(Value::Object(record.chunk.metadata.clone()))
            .bind(vector_literal(&record.embedding))
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
        }

        tx.commit().await.map_err(map_err)?;

        debug!("Upserted {} records into {}", records.len(), collection);
        Ok(())
    }

    async fn similarity_search_with_score(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredResult>> {
        let rows = sqlx::query(
            "SELECT id, document, metadata, embedding <=> $2::vector AS distance \
             FROM rag_embedding \
             WHERE collection = $1 \
             ORDER BY distance \
             LIMIT $3",
        )
        .bind(collection)
        .bind(vector_literal(embedding))
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        rows.into_iter()
            .map(|row| {
                let metadata: Value = row.try_get("metadata").map_err(map_err)?;
                let metadata = match metadata {
                    Value::Object(map) => map,
                    _ => Metadata::new(),
                };

                Ok(ScoredResult {
                    id: row.try_get("id").map_err(map_err)?,
                    chunk: TextChunk {
                        text: row.try_get("document").map_err(map_err)?,
                        metadata,
                    },
                    score: row.try_get("distance").map_err(map_err)?,
                })
            })
            .collect()
    }
}

fn map_err(e: sqlx::Error) -> RagError {
    RagError::upstream("pgvector", e)
}

/// pgvector's text input format: `[1,2,3]`
fn vector_literal(values: &[f32]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

/// Strip a SQLAlchemy-style driver suffix (`postgresql+psycopg://`) from the URL.
fn normalize_url(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) if scheme.starts_with("postgresql+") || scheme.starts_with("postgres+") => {
            format!("postgresql://{}", rest)
        }
        _ => url.to_string(),
    }
}
