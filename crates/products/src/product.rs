use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use stockroom_core::{CategoryId, DomainError, DomainResult, ProductId, Record, required_text};

/// Creation input for a product.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewProduct {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "blank_category")]
    pub category: Option<CategoryId>,
}

/// Partial update for a product.
///
/// `category` distinguishes "absent" (unchanged) from `null` or `""` (cleared).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProductChanges {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "present_category")]
    pub category: Option<Option<CategoryId>>,
}

/// Form posts send prices as text; a blank field means "not given".
fn lenient_price<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(de)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("expected a number, got '{s}'"))),
    }
}

/// An empty category selection means "no category".
fn blank_category<'de, D>(de: D) -> Result<Option<CategoryId>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(de)? {
        Some(s) if !s.trim().is_empty() => s.parse().map(Some).map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

fn present_category<'de, D>(de: D) -> Result<Option<Option<CategoryId>>, D::Error>
where
    D: Deserializer<'de>,
{
    blank_category(de).map(Some)
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    #[serde(rename = "_id")]
    id: ProductId,
    code: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<CategoryId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(rename = "__v", default)]
    revision: u64,
}

impl ProductRecord {
    pub fn create(id: ProductId, input: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id,
            code: required_text("code", input.code)?,
            name: required_text("name", input.name)?,
            description: input.description.filter(|d| !d.trim().is_empty()),
            price: validate_price(input.price.unwrap_or(0.0))?,
            category: input.category,
            created_at: now,
            updated_at: now,
            revision: 0,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn category(&self) -> Option<CategoryId> {
        self.category
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Case-insensitive substring match on the product name.
    pub fn name_contains(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(&needle.to_lowercase())
    }

    pub fn apply_changes(&self, changes: &ProductChanges, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut next = self.clone();
        if changes.code.is_some() {
            next.code = required_text("code", changes.code.clone())?;
        }
        if changes.name.is_some() {
            next.name = required_text("name", changes.name.clone())?;
        }
        if let Some(description) = &changes.description {
            next.description = Some(description.clone()).filter(|d| !d.trim().is_empty());
        }
        if let Some(price) = changes.price {
            next.price = validate_price(price)?;
        }
        if let Some(category) = changes.category {
            next.category = category;
        }
        next.updated_at = now;
        Ok(next)
    }
}

impl Record for ProductRecord {
    type Id = ProductId;

    const COLLECTION: &'static str = "product";

    fn id(&self) -> ProductId {
        self.id
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    /// Product codes are unique.
    fn unique_key(&self) -> Option<String> {
        Some(self.code.clone())
    }
}

fn validate_price(price: f64) -> DomainResult<f64> {
    if !price.is_finite() || price < 0.0 {
        return Err(DomainError::validation("price must be a non-negative number"));
    }
    Ok(price)
}
