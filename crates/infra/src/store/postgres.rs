//! Postgres-backed document store.
//!
//! All collections share one `documents` table: the record body is stored as
//! JSONB next to its collection name, id, optional unique key and revision.
//!
//! ## Error Mapping
//!
//! | SQLx error | PostgreSQL code | StoreError |
//! |------------|-----------------|------------|
//! | Database (unique violation) | `23505` | `DuplicateKey` |
//! | Database (other) | any other | `Backend` |
//! | PoolClosed / other | N/A | `Backend` |
//!
//! ## Thread Safety
//!
//! `PostgresDocumentStore` is `Send + Sync`; the SQLx pool handles connection
//! checkout per operation, so one pool built at start-up serves every request.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use stockroom_core::ExpectedRevision;

use super::{Document, DocumentStore, StoreError, StoreResult};

const SCHEMA: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection  TEXT        NOT NULL,
        id          UUID        NOT NULL,
        unique_key  TEXT        NULL,
        revision    BIGINT      NOT NULL,
        body        JSONB       NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (collection, id)
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS documents_collection_unique_key
        ON documents (collection, unique_key)
        WHERE unique_key IS NOT NULL
    "#,
];

/// Create the `documents` table and its unique-key index if missing.
pub async fn migrate(pool: &PgPool) -> StoreResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", "documents", e))?;
    }
    Ok(())
}

/// Postgres-backed collection of `T` records.
pub struct PostgresDocumentStore<T> {
    pool: Arc<PgPool>,
    _doc: PhantomData<fn() -> T>,
}

impl<T> PostgresDocumentStore<T> {
    /// Create a store sharing the given connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            _doc: PhantomData,
        }
    }
}

impl<T: Document> PostgresDocumentStore<T> {
    /// Record ids are stored in the `id` UUID column.
    fn row_id(id: T::Id) -> Uuid {
        id.into()
    }

    fn encode(doc: &T) -> StoreResult<serde_json::Value> {
        serde_json::to_value(doc).map_err(|e| StoreError::Encoding(format!("{}: {e}", T::COLLECTION)))
    }

    fn decode(row: &sqlx::postgres::PgRow) -> StoreResult<T> {
        let body: serde_json::Value = row
            .try_get("body")
            .map_err(|e| map_sqlx_error("decode", T::COLLECTION, e))?;
        serde_json::from_value(body).map_err(|e| StoreError::Encoding(format!("{}: {e}", T::COLLECTION)))
    }
}

#[async_trait]
impl<T: Document> DocumentStore<T> for PostgresDocumentStore<T> {
    #[instrument(skip_all, fields(collection = T::COLLECTION, id = %id), err)]
    async fn get(&self, id: T::Id) -> StoreResult<Option<T>> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = $1 AND id = $2")
            .bind(T::COLLECTION)
            .bind(Self::row_id(id))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", T::COLLECTION, e))?;

        row.as_ref().map(Self::decode).transpose()
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION), err)]
    async fn list(&self) -> StoreResult<Vec<T>> {
        let rows = sqlx::query("SELECT body FROM documents WHERE collection = $1")
            .bind(T::COLLECTION)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list", T::COLLECTION, e))?;

        rows.iter().map(Self::decode).collect()
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION, key = %key), err)]
    async fn find_by_key(&self, key: &str) -> StoreResult<Option<T>> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = $1 AND unique_key = $2")
            .bind(T::COLLECTION)
            .bind(key)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_key", T::COLLECTION, e))?;

        row.as_ref().map(Self::decode).transpose()
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION, id = %doc.id()), err)]
    async fn insert(&self, mut doc: T) -> StoreResult<T> {
        doc.set_revision(1);
        let body = Self::encode(&doc)?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, unique_key, revision, body)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(T::COLLECTION)
        .bind(Self::row_id(doc.id()))
        .bind(doc.unique_key())
        .bind(1_i64)
        .bind(body)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert", T::COLLECTION, e))?;

        Ok(doc)
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION, id = %doc.id(), expected = ?expected), err)]
    async fn replace(&self, mut doc: T, expected: ExpectedRevision) -> StoreResult<Option<T>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("replace", T::COLLECTION, e))?;

        let id = Self::row_id(doc.id());
        let current: Option<i64> = sqlx::query_scalar(
            "SELECT revision FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
        )
        .bind(T::COLLECTION)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("replace", T::COLLECTION, e))?;

        let Some(current) = current else {
            return Ok(None);
        };
        let current = current as u64;

        if !expected.matches(current) {
            return Err(StoreError::Stale {
                collection: T::COLLECTION,
                expected: match expected {
                    ExpectedRevision::Exact(r) => r,
                    ExpectedRevision::Any => current,
                },
                actual: current,
            });
        }

        doc.set_revision(current + 1);
        let body = Self::encode(&doc)?;

        sqlx::query(
            r#"
            UPDATE documents
            SET unique_key = $3, revision = $4, body = $5, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(T::COLLECTION)
        .bind(id)
        .bind(doc.unique_key())
        .bind((current + 1) as i64)
        .bind(body)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("replace", T::COLLECTION, e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("replace", T::COLLECTION, e))?;

        Ok(Some(doc))
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION, id = %id), err)]
    async fn delete(&self, id: T::Id) -> StoreResult<Option<T>> {
        let row = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2 RETURNING body")
            .bind(T::COLLECTION)
            .bind(Self::row_id(id))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", T::COLLECTION, e))?;

        row.as_ref().map(Self::decode).transpose()
    }
}

fn map_sqlx_error(operation: &str, collection: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                StoreError::DuplicateKey {
                    collection,
                    key: db_err.constraint().unwrap_or("unique_key").to_string(),
                }
            } else {
                StoreError::Backend(format!("database error in {operation}: {}", db_err.message()))
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}
