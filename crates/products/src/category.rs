use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{CategoryId, DomainResult, Record, required_text};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewCategory {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CategoryChanges {
    pub name: Option<String>,
}

/// A product category. Names are unique ignoring case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    #[serde(rename = "_id")]
    id: CategoryId,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(rename = "__v", default)]
    revision: u64,
}

impl CategoryRecord {
    pub fn create(id: CategoryId, input: NewCategory, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id,
            name: required_text("name", input.name)?,
            created_at: now,
            updated_at: now,
            revision: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply_changes(&self, changes: &CategoryChanges, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut next = self.clone();
        if changes.name.is_some() {
            next.name = required_text("name", changes.name.clone())?;
        }
        next.updated_at = now;
        Ok(next)
    }
}

impl Record for CategoryRecord {
    type Id = CategoryId;

    const COLLECTION: &'static str = "category";

    fn id(&self) -> CategoryId {
        self.id
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.name.to_lowercase())
    }
}
