use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::time::parse_date;
use stockroom_core::{CustomerId, DomainError, DomainResult, Record, required_text};

/// Registration input. Every field is required; they are optional here so a
/// missing field surfaces as a validation error instead of a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: Option<String>,
    pub date_of_birth: Option<String>,
    pub member_number: Option<i64>,
    pub interests: Option<String>,
}

/// Partial update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerChanges {
    pub name: Option<String>,
    pub date_of_birth: Option<String>,
    pub member_number: Option<i64>,
    pub interests: Option<String>,
}

/// A registered customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    #[serde(rename = "_id")]
    id: CustomerId,
    name: String,
    date_of_birth: NaiveDate,
    member_number: i64,
    interests: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(rename = "__v", default)]
    revision: u64,
}

impl CustomerRecord {
    /// Validate a registration and build the record.
    pub fn register(id: CustomerId, input: NewCustomer, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = required_text("name", input.name)?;
        let raw_dob = required_text("dateOfBirth", input.date_of_birth)?;
        let date_of_birth = validate_birth_date(&raw_dob, now)?;
        let member_number = validate_member_number(
            input
                .member_number
                .ok_or_else(|| DomainError::validation("memberNumber is required"))?,
        )?;
        let interests = required_text("interests", input.interests)?;

        Ok(Self {
            id,
            name,
            date_of_birth,
            member_number,
            interests,
            created_at: now,
            updated_at: now,
            revision: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn date_of_birth(&self) -> NaiveDate {
        self.date_of_birth
    }

    pub fn member_number(&self) -> i64 {
        self.member_number
    }

    pub fn interests(&self) -> &str {
        &self.interests
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Apply a partial update. Provided fields get the same validation as on
    /// registration; `updatedAt` is refreshed.
    pub fn apply_changes(&self, changes: &CustomerChanges, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut next = self.clone();

        if changes.name.is_some() {
            next.name = required_text("name", changes.name.clone())?;
        }
        if let Some(raw) = &changes.date_of_birth {
            next.date_of_birth = validate_birth_date(raw, now)?;
        }
        if let Some(n) = changes.member_number {
            next.member_number = validate_member_number(n)?;
        }
        if changes.interests.is_some() {
            next.interests = required_text("interests", changes.interests.clone())?;
        }

        next.updated_at = now;
        Ok(next)
    }
}

impl Record for CustomerRecord {
    type Id = CustomerId;

    const COLLECTION: &'static str = "customer";

    fn id(&self) -> CustomerId {
        self.id
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.member_number.to_string())
    }
}

fn validate_member_number(n: i64) -> DomainResult<i64> {
    if n <= 0 {
        return Err(DomainError::validation("memberNumber must be a positive integer"));
    }
    Ok(n)
}

fn validate_birth_date(raw: &str, now: DateTime<Utc>) -> DomainResult<NaiveDate> {
    let date = parse_date("dateOfBirth", raw)?;
    if date > now.date_naive() {
        return Err(DomainError::validation("dateOfBirth cannot be in the future"));
    }
    Ok(date)
}
