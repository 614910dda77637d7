//! Persistence gateway operations built on a [`DocumentStore`].
//!
//! These turn storage results into the gateway contract: missing records are
//! `NotFound`, read-modify-write updates are revision-checked, and a write
//! that loses a race without an explicit expectation is retried on fresh state.

use thiserror::Error;
use tracing::{debug, instrument};

use stockroom_core::{DomainError, ExpectedRevision};

use super::{Document, DocumentStore, Query, StoreError};

/// Attempts made by [`update_by_id`] before a lost race is reported.
pub const MAX_WRITE_ATTEMPTS: usize = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GatewayError {
    /// Report a duplicate-key failure as a domain conflict with `message`.
    pub fn on_duplicate(self, message: impl Into<String>) -> Self {
        match self {
            GatewayError::Store(StoreError::DuplicateKey { .. }) => {
                GatewayError::Domain(DomainError::conflict(message))
            }
            other => other,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

pub async fn find_by_id<T, S>(store: &S, id: T::Id) -> GatewayResult<T>
where
    T: Document,
    S: DocumentStore<T> + ?Sized,
{
    store
        .get(id)
        .await?
        .ok_or_else(|| DomainError::not_found(T::COLLECTION).into())
}

pub async fn find_many<T, S>(store: &S, query: &Query<T>) -> GatewayResult<Vec<T>>
where
    T: Document,
    S: DocumentStore<T> + ?Sized,
{
    Ok(query.run(store.list().await?))
}

#[instrument(skip_all, fields(collection = T::COLLECTION, id = %doc.id()))]
pub async fn create<T, S>(store: &S, doc: T) -> GatewayResult<T>
where
    T: Document,
    S: DocumentStore<T> + ?Sized,
{
    let saved = store.insert(doc).await?;
    debug!("record created");
    Ok(saved)
}

/// Read-modify-write a record.
///
/// `change` receives the current stored form and returns the replacement. With
/// `ExpectedRevision::Exact` the stored revision must match or the update
/// fails with `StoreError::Stale`. With `Any`, a concurrent writer causes the
/// change to be re-applied to the fresh record, up to [`MAX_WRITE_ATTEMPTS`].
#[instrument(skip_all, fields(collection = T::COLLECTION, id = %id))]
pub async fn update_by_id<T, S, F>(
    store: &S,
    id: T::Id,
    expected: ExpectedRevision,
    mut change: F,
) -> GatewayResult<T>
where
    T: Document,
    S: DocumentStore<T> + ?Sized,
    F: FnMut(&T) -> Result<T, DomainError> + Send,
{
    let mut attempt = 1;
    loop {
        let current = find_by_id(store, id).await?;
        if !expected.matches(current.revision()) {
            return Err(StoreError::Stale {
                collection: T::COLLECTION,
                expected: match expected {
                    ExpectedRevision::Exact(r) => r,
                    ExpectedRevision::Any => current.revision(),
                },
                actual: current.revision(),
            }
            .into());
        }

        let next = change(&current)?;
        match store.replace(next, ExpectedRevision::Exact(current.revision())).await {
            Ok(Some(saved)) => return Ok(saved),
            Ok(None) => return Err(DomainError::not_found(T::COLLECTION).into()),
            Err(StoreError::Stale { .. })
                if expected == ExpectedRevision::Any && attempt < MAX_WRITE_ATTEMPTS =>
            {
                debug!(attempt, "concurrent write detected; retrying on fresh state");
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[instrument(skip_all, fields(collection = T::COLLECTION, id = %id))]
pub async fn delete_by_id<T, S>(store: &S, id: T::Id) -> GatewayResult<T>
where
    T: Document,
    S: DocumentStore<T> + ?Sized,
{
    store
        .delete(id)
        .await?
        .ok_or_else(|| DomainError::not_found(T::COLLECTION).into())
}
