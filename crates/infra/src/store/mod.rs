//! Document storage: the persistence gateway behind every record type.
//!
//! A `DocumentStore<T>` is a small async CRUD surface keyed by record id, with
//! a per-collection unique key and revision-checked writes. Filtering, sorting
//! and pagination are evaluated by [`Query`] over the collection contents.

pub mod gateway;
pub mod in_memory;
pub mod postgres;
pub mod query;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use stockroom_core::{ExpectedRevision, Record};

pub use gateway::{GatewayError, GatewayResult};
pub use in_memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use query::{Page, Query};

/// Records that can be persisted by a [`DocumentStore`].
pub trait Document:
    Record<Id: Send + Sync> + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> Document for T where
    T: Record<Id: Send + Sync> + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Storage-level failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Another record in the collection already holds the unique key (or id).
    #[error("duplicate key in {collection}: {key}")]
    DuplicateKey { collection: &'static str, key: String },

    /// The stored revision differs from the one the write was based on.
    #[error("stale revision in {collection}: expected {expected}, found {actual}")]
    Stale {
        collection: &'static str,
        expected: u64,
        actual: u64,
    },

    #[error("document encoding failed: {0}")]
    Encoding(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Async CRUD over one collection.
///
/// Implementations must:
/// - assign revision 1 on insert and bump the revision by one on each replace
/// - reject an insert or replace whose unique key belongs to another record
/// - apply a replace only when `expected` matches the stored revision
#[async_trait]
pub trait DocumentStore<T: Document>: Send + Sync {
    async fn get(&self, id: T::Id) -> StoreResult<Option<T>>;

    /// All records of the collection, in no particular order.
    async fn list(&self) -> StoreResult<Vec<T>>;

    async fn find_by_key(&self, key: &str) -> StoreResult<Option<T>>;

    /// Insert a new record, returning the stored form.
    async fn insert(&self, doc: T) -> StoreResult<T>;

    /// Replace an existing record. `Ok(None)` when no record has that id.
    async fn replace(&self, doc: T, expected: ExpectedRevision) -> StoreResult<Option<T>>;

    /// Remove a record, returning what was stored.
    async fn delete(&self, id: T::Id) -> StoreResult<Option<T>>;
}

#[async_trait]
impl<T, S> DocumentStore<T> for Arc<S>
where
    T: Document,
    S: DocumentStore<T> + ?Sized,
{
    async fn get(&self, id: T::Id) -> StoreResult<Option<T>> {
        (**self).get(id).await
    }

    async fn list(&self) -> StoreResult<Vec<T>> {
        (**self).list().await
    }

    async fn find_by_key(&self, key: &str) -> StoreResult<Option<T>> {
        (**self).find_by_key(key).await
    }

    async fn insert(&self, doc: T) -> StoreResult<T> {
        (**self).insert(doc).await
    }

    async fn replace(&self, doc: T, expected: ExpectedRevision) -> StoreResult<Option<T>> {
        (**self).replace(doc, expected).await
    }

    async fn delete(&self, id: T::Id) -> StoreResult<Option<T>> {
        (**self).delete(id).await
    }
}
