use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroom_core::time::iso_timestamp;
use stockroom_core::{DomainError, ProductId, Record, StockId};

/// Location assigned when a stock record is created without one.
pub const DEFAULT_LOCATION: &str = "Main Warehouse";

const DEFAULT_MIN_QUANTITY: i64 = 0;
const DEFAULT_MAX_QUANTITY: i64 = 100;

/// Stock status as exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
    Discontinued,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in-stock",
            StockStatus::LowStock => "low-stock",
            StockStatus::OutOfStock => "out-of-stock",
            StockStatus::Discontinued => "discontinued",
        }
    }
}

impl core::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockStatus {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in-stock" => Ok(StockStatus::InStock),
            "low-stock" => Ok(StockStatus::LowStock),
            "out-of-stock" => Ok(StockStatus::OutOfStock),
            "discontinued" => Ok(StockStatus::Discontinued),
            other => Err(StockError::UnknownStatus(other.to_string())),
        }
    }
}

/// Status values that may be forced regardless of quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusOverride {
    Discontinued,
}

/// Who decides a record's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "camelCase")]
pub enum StatusMode {
    /// Status follows `derive_status(quantity, min_quantity)`.
    #[default]
    Derived,
    /// Status is pinned until explicitly cleared; quantity changes do not affect it.
    ManualOverride(StatusOverride),
}

/// Derive a stock status from quantity thresholds.
///
/// Never yields `Discontinued`; that value only exists as a manual override.
pub fn derive_status(quantity: i64, min_quantity: i64) -> StockStatus {
    if quantity <= 0 {
        StockStatus::OutOfStock
    } else if quantity <= min_quantity {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}

/// Stock rule violations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    #[error("invalid adjustment type '{0}' (expected add, subtract or set)")]
    InvalidAdjustmentKind(String),

    #[error("quantity cannot be negative (current {current}, requested {requested})")]
    NegativeQuantity { current: i64, requested: i64 },

    #[error("adjustment must be a non-negative integer, got {0}")]
    NegativeAmount(i64),

    #[error("adjustment overflows the quantity range")]
    Overflow,

    #[error("{field} cannot be negative, got {value}")]
    NegativeField { field: &'static str, value: i64 },

    #[error("location cannot be empty")]
    EmptyLocation,

    #[error("unknown status '{0}'")]
    UnknownStatus(String),

    #[error("status '{requested}' cannot be set directly (quantity implies '{derived}'); only 'discontinued' can be forced")]
    StatusNotSettable {
        requested: StockStatus,
        derived: StockStatus,
    },
}

impl From<StockError> for DomainError {
    fn from(err: StockError) -> Self {
        DomainError::validation(err.to_string())
    }
}

/// Adjustment operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentKind {
    Add,
    Subtract,
    Set,
}

impl FromStr for AdjustmentKind {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(AdjustmentKind::Add),
            "subtract" => Ok(AdjustmentKind::Subtract),
            "set" => Ok(AdjustmentKind::Set),
            other => Err(StockError::InvalidAdjustmentKind(other.to_string())),
        }
    }
}

/// A bounded quantity mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjustment {
    pub kind: AdjustmentKind,
    pub amount: i64,
    pub reason: Option<String>,
}

impl Adjustment {
    pub fn new(kind: AdjustmentKind, amount: i64) -> Self {
        Self {
            kind,
            amount,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    fn resulting_quantity(&self, current: i64) -> Result<i64, StockError> {
        if self.amount < 0 {
            return Err(StockError::NegativeAmount(self.amount));
        }
        let requested = match self.kind {
            AdjustmentKind::Add => current.checked_add(self.amount),
            AdjustmentKind::Subtract => current.checked_sub(self.amount),
            AdjustmentKind::Set => Some(self.amount),
        }
        .ok_or(StockError::Overflow)?;

        if requested < 0 {
            return Err(StockError::NegativeQuantity { current, requested });
        }
        Ok(requested)
    }
}

/// Input for creating a stock record. Unset fields take the documented defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStock {
    pub product: ProductId,
    pub quantity: Option<i64>,
    pub min_quantity: Option<i64>,
    pub max_quantity: Option<i64>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub status: Option<StockStatus>,
}

impl NewStock {
    pub fn for_product(product: ProductId) -> Self {
        Self {
            product,
            quantity: None,
            min_quantity: None,
            max_quantity: None,
            location: None,
            notes: None,
            status: None,
        }
    }
}

/// Full-record update ("settings") patch. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockSettings {
    pub product: Option<ProductId>,
    pub quantity: Option<i64>,
    pub min_quantity: Option<i64>,
    pub max_quantity: Option<i64>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub status: Option<StockStatus>,
}

/// Inventory row tracking on-hand quantity for one product at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    #[serde(rename = "_id")]
    id: StockId,
    product: ProductId,
    quantity: i64,
    min_quantity: i64,
    max_quantity: i64,
    location: String,
    status_mode: StatusMode,
    last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    #[serde(rename = "__v", default)]
    revision: u64,
}

impl StockRecord {
    /// Build a new record from a creation draft.
    pub fn create(id: StockId, draft: NewStock, now: DateTime<Utc>) -> Result<Self, StockError> {
        let quantity = non_negative("quantity", draft.quantity.unwrap_or(0))?;
        let min_quantity = non_negative("minQuantity", draft.min_quantity.unwrap_or(DEFAULT_MIN_QUANTITY))?;
        let max_quantity = non_negative("maxQuantity", draft.max_quantity.unwrap_or(DEFAULT_MAX_QUANTITY))?;

        let location = match draft.location {
            Some(l) if !l.trim().is_empty() => l.trim().to_string(),
            _ => DEFAULT_LOCATION.to_string(),
        };

        let status_mode = resolve_status_mode(
            StatusMode::Derived,
            draft.status,
            derive_status(quantity, min_quantity),
        )?;

        Ok(Self {
            id,
            product: draft.product,
            quantity,
            min_quantity,
            max_quantity,
            location,
            status_mode,
            last_updated: now,
            notes: draft.notes.filter(|n| !n.trim().is_empty()),
            revision: 0,
        })
    }

    pub fn product(&self) -> ProductId {
        self.product
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn min_quantity(&self) -> i64 {
        self.min_quantity
    }

    pub fn max_quantity(&self) -> i64 {
        self.max_quantity
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn status_mode(&self) -> StatusMode {
        self.status_mode
    }

    /// Effective status: the override if one is pinned, otherwise derived.
    pub fn status(&self) -> StockStatus {
        match self.status_mode {
            StatusMode::Derived => derive_status(self.quantity, self.min_quantity),
            StatusMode::ManualOverride(StatusOverride::Discontinued) => StockStatus::Discontinued,
        }
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Apply an adjustment, returning the updated record.
    ///
    /// `self` is never modified; a rejected adjustment leaves the caller's
    /// record exactly as it was.
    pub fn apply_adjustment(&self, adjustment: &Adjustment, now: DateTime<Utc>) -> Result<Self, StockError> {
        let quantity = adjustment.resulting_quantity(self.quantity)?;

        let mut next = self.clone();
        next.quantity = quantity;
        next.last_updated = now;

        if let Some(reason) = adjustment.reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            let line = format!("{}: {}", iso_timestamp(now), reason);
            let joined = format!("{}\n{}", self.notes.as_deref().unwrap_or(""), line);
            next.notes = Some(joined.trim().to_string());
        }

        Ok(next)
    }

    /// Apply a full-record update.
    pub fn apply_settings(&self, settings: &StockSettings, now: DateTime<Utc>) -> Result<Self, StockError> {
        let mut next = self.clone();

        if let Some(product) = settings.product {
            next.product = product;
        }
        if let Some(q) = settings.quantity {
            next.quantity = non_negative("quantity", q)?;
        }
        if let Some(min) = settings.min_quantity {
            next.min_quantity = non_negative("minQuantity", min)?;
        }
        if let Some(max) = settings.max_quantity {
            next.max_quantity = non_negative("maxQuantity", max)?;
        }
        if let Some(location) = &settings.location {
            if location.trim().is_empty() {
                return Err(StockError::EmptyLocation);
            }
            next.location = location.trim().to_string();
        }
        if let Some(notes) = &settings.notes {
            next.notes = Some(notes.trim().to_string()).filter(|n| !n.is_empty());
        }

        next.status_mode = resolve_status_mode(
            self.status_mode,
            settings.status,
            derive_status(next.quantity, next.min_quantity),
        )?;
        next.last_updated = now;

        Ok(next)
    }
}

impl Record for StockRecord {
    type Id = StockId;

    const COLLECTION: &'static str = "stock";

    fn id(&self) -> StockId {
        self.id
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    /// One stock record per product.
    fn unique_key(&self) -> Option<String> {
        Some(self.product.to_string())
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<i64, StockError> {
    if value < 0 {
        return Err(StockError::NegativeField { field, value });
    }
    Ok(value)
}

/// Decide the status mode after a create/update that may carry a status value.
///
/// `discontinued` pins the override. A derived value is only accepted when it
/// agrees with the quantities, and then returns the record to derived mode.
fn resolve_status_mode(
    current: StatusMode,
    requested: Option<StockStatus>,
    derived: StockStatus,
) -> Result<StatusMode, StockError> {
    match requested {
        None => Ok(current),
        Some(StockStatus::Discontinued) => Ok(StatusMode::ManualOverride(StatusOverride::Discontinued)),
        Some(status) if status == derived => Ok(StatusMode::Derived),
        Some(status) => Err(StockError::StatusNotSettable {
            requested: status,
            derived,
        }),
    }
}
