use core::str::FromStr;

use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};

use stockroom_core::time::iso_timestamp;
use stockroom_core::{DomainError, ExpectedRevision, ProductId, Record};
use stockroom_customers::CustomerChanges;
use stockroom_inventory::{Adjustment, AdjustmentKind, NewStock, StatusMode, StockSettings, StockStatus};
use stockroom_products::{CategoryChanges, ProductChanges, ProductRecord};

use crate::app::errors::ApiResult;
use crate::app::services::{ProductView, StockView};

// -------------------------
// Request DTOs
// -------------------------

/// Integer field that also accepts numeric strings (HTML form values).
/// Blank strings and `null` count as absent.
fn lenient_int<'de, D>(de: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(de)? {
        None => Ok(None),
        Some(Raw::Int(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("expected an integer, got '{s}'"))),
    }
}

/// A product reference: either the bare id or a joined product object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    Id(String),
    Joined {
        #[serde(rename = "_id")]
        id: String,
    },
}

impl ProductRef {
    fn parse(&self) -> ApiResult<ProductId> {
        let raw = match self {
            ProductRef::Id(id) | ProductRef::Joined { id } => id,
        };
        Ok(ProductId::from_str(raw)?)
    }
}

fn parse_status(raw: Option<&str>) -> ApiResult<Option<StockStatus>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Ok(Some(StockStatus::from_str(s)?)),
        None => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStockRequest {
    pub product: Option<ProductRef>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub quantity: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub min_quantity: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub max_quantity: Option<i64>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

impl CreateStockRequest {
    pub fn into_draft(self) -> ApiResult<NewStock> {
        let product = self
            .product
            .ok_or_else(|| DomainError::validation("product is required"))?
            .parse()?;
        Ok(NewStock {
            product,
            quantity: self.quantity,
            min_quantity: self.min_quantity,
            max_quantity: self.max_quantity,
            location: self.location,
            notes: self.notes,
            status: parse_status(self.status.as_deref())?,
        })
    }
}

/// Full-record stock update. Fields the engine derives (`status` aside) and
/// echoed read-only fields such as `lastUpdated` are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStockRequest {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub product: Option<ProductRef>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub quantity: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub min_quantity: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub max_quantity: Option<i64>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "__v")]
    pub revision: Option<u64>,
}

impl UpdateStockRequest {
    pub fn settings(&self) -> ApiResult<StockSettings> {
        Ok(StockSettings {
            product: self.product.as_ref().map(ProductRef::parse).transpose()?,
            quantity: self.quantity,
            min_quantity: self.min_quantity,
            max_quantity: self.max_quantity,
            location: self.location.clone(),
            notes: self.notes.clone(),
            status: parse_status(self.status.as_deref())?,
        })
    }

    pub fn expected(&self) -> ExpectedRevision {
        self.revision.into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockRequest {
    pub stock_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub adjustment: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub reason: Option<String>,
}

impl AdjustStockRequest {
    /// Split into the target id and the adjustment. Missing fields are one
    /// validation error, checked before the adjustment type.
    pub fn into_parts(self) -> ApiResult<(String, Adjustment)> {
        let (Some(stock_id), Some(amount), Some(kind)) = (
            self.stock_id.filter(|s| !s.trim().is_empty()),
            self.adjustment,
            self.kind.filter(|k| !k.trim().is_empty()),
        ) else {
            return Err(DomainError::validation("stockId, adjustment and type are required").into());
        };

        let mut adjustment = Adjustment::new(AdjustmentKind::from_str(kind.trim())?, amount);
        if let Some(reason) = self.reason {
            adjustment = adjustment.with_reason(reason);
        }
        Ok((stock_id, adjustment))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCustomerRequest {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    #[serde(rename = "__v")]
    pub revision: Option<u64>,
    #[serde(flatten)]
    pub changes: CustomerChanges,
}

/// Body of the alternate `DELETE` form that names the record in the body.
#[derive(Debug, Deserialize)]
pub struct DeleteByBodyRequest {
    #[serde(rename = "_id")]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    #[serde(rename = "__v")]
    pub revision: Option<u64>,
    #[serde(flatten)]
    pub changes: ProductChanges,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    #[serde(rename = "__v")]
    pub revision: Option<u64>,
    #[serde(flatten)]
    pub changes: CategoryChanges,
}

#[derive(Debug, Default, Deserialize)]
pub struct StockListParams {
    pub pno: Option<String>,
    pub s: Option<String>,
    pub status: Option<String>,
}

// -------------------------
// Response mapping
// -------------------------

fn product_json(p: &ProductRecord) -> Value {
    json!({
        "_id": p.id().to_string(),
        "code": p.code(),
        "name": p.name(),
        "description": p.description(),
        "price": p.price(),
        "category": p.category().map(|c| c.to_string()),
        "createdAt": iso_timestamp(p.created_at()),
        "updatedAt": iso_timestamp(p.updated_at()),
        "__v": p.revision(),
    })
}

pub fn stock_to_json(view: StockView) -> Value {
    let s = view.stock;
    json!({
        "_id": s.id().to_string(),
        "product": view.product.as_ref().map(product_json),
        "quantity": s.quantity(),
        "minQuantity": s.min_quantity(),
        "maxQuantity": s.max_quantity(),
        "location": s.location(),
        "status": s.status().as_str(),
        "statusMode": match s.status_mode() {
            StatusMode::Derived => "derived",
            StatusMode::ManualOverride(_) => "manual",
        },
        "lastUpdated": iso_timestamp(s.last_updated()),
        "notes": s.notes(),
        "__v": s.revision(),
    })
}

pub fn product_to_json(view: ProductView) -> Value {
    let mut value = product_json(&view.product);
    value["category"] = match view.category {
        Some(c) => json!({ "_id": c.id().to_string(), "name": c.name() }),
        None => Value::Null,
    };
    value
}

pub fn deleted(what: &str) -> Value {
    json!({ "message": format!("{what} deleted successfully") })
}
