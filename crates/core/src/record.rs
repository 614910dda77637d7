//! Persisted record identity and revision tracking.

use uuid::Uuid;

/// A document-shaped record that the persistence gateway can store.
///
/// Records carry their own identifier and a monotonically increasing revision
/// which the store bumps on every successful write.
pub trait Record {
    /// Strongly-typed identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display + Into<Uuid> + From<Uuid>;

    /// Collection name used by storage backends and in log fields.
    const COLLECTION: &'static str;

    /// Returns the record identifier.
    fn id(&self) -> Self::Id;

    /// Revision of the stored form (0 = never stored).
    fn revision(&self) -> u64;

    fn set_revision(&mut self, revision: u64);

    /// Value that must be unique within the collection, if any.
    fn unique_key(&self) -> Option<String> {
        None
    }
}

/// Optimistic concurrency expectation for a write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedRevision {
    /// Skip revision checking (last write wins).
    Any,
    /// Require the stored record to be at an exact revision.
    Exact(u64),
}

impl ExpectedRevision {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedRevision::Any => true,
            ExpectedRevision::Exact(r) => r == actual,
        }
    }
}

impl From<Option<u64>> for ExpectedRevision {
    fn from(value: Option<u64>) -> Self {
        value.map_or(ExpectedRevision::Any, ExpectedRevision::Exact)
    }
}
