use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use stockroom_core::ExpectedRevision;

use super::{Document, DocumentStore, StoreError, StoreResult};

/// In-memory document collection.
///
/// Intended for tests/dev. Every operation takes the lock once, so the
/// unique-key and revision checks are atomic with the write.
#[derive(Debug)]
pub struct InMemoryDocumentStore<T: Document> {
    docs: RwLock<HashMap<T::Id, T>>,
}

impl<T: Document> InMemoryDocumentStore<T> {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
        }
    }

    fn poisoned() -> StoreError {
        StoreError::Backend(format!("{} collection lock poisoned", T::COLLECTION))
    }

    fn key_taken(docs: &HashMap<T::Id, T>, key: &str, except: T::Id) -> bool {
        docs.values()
            .any(|d| d.id() != except && d.unique_key().as_deref() == Some(key))
    }
}

impl<T: Document> Default for InMemoryDocumentStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Document> DocumentStore<T> for InMemoryDocumentStore<T> {
    async fn get(&self, id: T::Id) -> StoreResult<Option<T>> {
        let docs = self.docs.read().map_err(|_| Self::poisoned())?;
        Ok(docs.get(&id).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<T>> {
        let docs = self.docs.read().map_err(|_| Self::poisoned())?;
        Ok(docs.values().cloned().collect())
    }

    async fn find_by_key(&self, key: &str) -> StoreResult<Option<T>> {
        let docs = self.docs.read().map_err(|_| Self::poisoned())?;
        Ok(docs
            .values()
            .find(|d| d.unique_key().as_deref() == Some(key))
            .cloned())
    }

    async fn insert(&self, mut doc: T) -> StoreResult<T> {
        let mut docs = self.docs.write().map_err(|_| Self::poisoned())?;

        let id = doc.id();
        if docs.contains_key(&id) {
            return Err(StoreError::DuplicateKey {
                collection: T::COLLECTION,
                key: id.to_string(),
            });
        }
        if let Some(key) = doc.unique_key() {
            if Self::key_taken(&docs, &key, id) {
                return Err(StoreError::DuplicateKey {
                    collection: T::COLLECTION,
                    key,
                });
            }
        }

        doc.set_revision(1);
        docs.insert(id, doc.clone());
        Ok(doc)
    }

    async fn replace(&self, mut doc: T, expected: ExpectedRevision) -> StoreResult<Option<T>> {
        let mut docs = self.docs.write().map_err(|_| Self::poisoned())?;

        let id = doc.id();
        let current = match docs.get(&id) {
            Some(d) => d.revision(),
            None => return Ok(None),
        };

        if !expected.matches(current) {
            let expected = match expected {
                ExpectedRevision::Exact(r) => r,
                ExpectedRevision::Any => current,
            };
            return Err(StoreError::Stale {
                collection: T::COLLECTION,
                expected,
                actual: current,
            });
        }
        if let Some(key) = doc.unique_key() {
            if Self::key_taken(&docs, &key, id) {
                return Err(StoreError::DuplicateKey {
                    collection: T::COLLECTION,
                    key,
                });
            }
        }

        doc.set_revision(current + 1);
        docs.insert(id, doc.clone());
        Ok(Some(doc))
    }

    async fn delete(&self, id: T::Id) -> StoreResult<Option<T>> {
        let mut docs = self.docs.write().map_err(|_| Self::poisoned())?;
        Ok(docs.remove(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::Member;

    #[tokio::test]
    async fn insert_assigns_first_revision() {
        let store = InMemoryDocumentStore::<Member>::new();
        let saved = store.insert(Member::new(1, "Ann")).await.unwrap();
        assert_eq!(saved.revision, 1);
        assert_eq!(store.get(saved.id).await.unwrap(), Some(saved));
    }

    #[tokio::test]
    async fn insert_rejects_taken_unique_key() {
        let store = InMemoryDocumentStore::<Member>::new();
        store.insert(Member::new(7, "Ann")).await.unwrap();

        let err = store.insert(Member::new(7, "Bob")).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::DuplicateKey {
                collection: "member",
                key: "7".to_string()
            }
        );
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn replace_bumps_revision_and_checks_expected() {
        let store = InMemoryDocumentStore::<Member>::new();
        let saved = store.insert(Member::new(1, "Ann")).await.unwrap();

        let mut renamed = saved.clone();
        renamed.name = "Anna".into();
        let updated = store
            .replace(renamed.clone(), ExpectedRevision::Exact(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.revision, 2);

        // A second writer still holding revision 1 loses.
        let err = store.replace(renamed, ExpectedRevision::Exact(1)).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::Stale {
                collection: "member",
                expected: 1,
                actual: 2
            }
        );
    }

    #[tokio::test]
    async fn replace_rejects_key_owned_by_another_record() {
        let store = InMemoryDocumentStore::<Member>::new();
        store.insert(Member::new(1, "Ann")).await.unwrap();
        let bob = store.insert(Member::new(2, "Bob")).await.unwrap();

        let mut moved = bob.clone();
        moved.number = 1;
        assert!(matches!(
            store.replace(moved, ExpectedRevision::Any).await,
            Err(StoreError::DuplicateKey { .. })
        ));

        // Keeping its own key is fine.
        assert!(store.replace(bob, ExpectedRevision::Any).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn replace_and_delete_report_missing_records() {
        let store = InMemoryDocumentStore::<Member>::new();
        let ghost = Member::new(3, "Ghost");
        assert_eq!(store.replace(ghost.clone(), ExpectedRevision::Any).await.unwrap(), None);
        assert_eq!(store.delete(ghost.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn find_by_key_and_delete() {
        let store = InMemoryDocumentStore::<Member>::new();
        let saved = store.insert(Member::new(42, "Ann")).await.unwrap();

        assert_eq!(store.find_by_key("42").await.unwrap().map(|m| m.id), Some(saved.id));
        assert_eq!(store.delete(saved.id).await.unwrap().map(|m| m.id), Some(saved.id));
        assert_eq!(store.find_by_key("42").await.unwrap(), None);
    }
}
