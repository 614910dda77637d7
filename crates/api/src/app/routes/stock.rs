use core::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use stockroom_core::{DomainError, StockId};
use stockroom_inventory::StockStatus;

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::routes::common::{body_id, record_id};
use crate::app::services::{AppServices, StockFilter};

const WHAT: &str = "stock";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_stock).post(create_stock).put(update_stock_from_body))
        .route("/adjust", post(adjust_stock))
        .route("/:id", get(get_stock).put(update_stock).delete(delete_stock))
}

fn filter_from_params(params: dto::StockListParams) -> ApiResult<StockFilter> {
    let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    let page = match non_blank(params.pno) {
        Some(raw) => Some(
            raw.parse::<u32>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| DomainError::validation(format!("pno must be a positive integer, got '{raw}'")))?,
        ),
        None => None,
    };
    let status = non_blank(params.status)
        .map(|s| StockStatus::from_str(&s))
        .transpose()?;

    Ok(StockFilter {
        page,
        search: non_blank(params.s),
        status,
    })
}

pub async fn list_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::StockListParams>,
) -> ApiResult<Response> {
    let filter = filter_from_params(params)?;
    let items = services
        .list_stock(&filter)
        .await?
        .into_iter()
        .map(dto::stock_to_json)
        .collect::<Vec<_>>();
    Ok(Json(items).into_response())
}

pub async fn create_stock(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::CreateStockRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = payload?;
    let view = services.create_stock(body.into_draft()?).await?;
    Ok((StatusCode::CREATED, Json(dto::stock_to_json(view))).into_response())
}

pub async fn get_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let view = services.get_stock(record_id(&id, WHAT)?).await?;
    Ok(Json(dto::stock_to_json(view)).into_response())
}

pub async fn update_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<dto::UpdateStockRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let id: StockId = record_id(&id, WHAT)?;
    let Json(body) = payload?;
    apply_update(&services, id, body).await
}

pub async fn update_stock_from_body(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::UpdateStockRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = payload?;
    let id: StockId = body_id(body.id.as_deref(), WHAT)?;
    apply_update(&services, id, body).await
}

async fn apply_update(services: &AppServices, id: StockId, body: dto::UpdateStockRequest) -> ApiResult<Response> {
    let view = services.update_stock(id, body.settings()?, body.expected()).await?;
    Ok(Json(dto::stock_to_json(view)).into_response())
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::AdjustStockRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = payload?;
    let (stock_id, adjustment) = body.into_parts()?;
    let view = services
        .adjust_stock(record_id(&stock_id, WHAT)?, adjustment)
        .await?;
    Ok(Json(dto::stock_to_json(view)).into_response())
}

pub async fn delete_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    services.delete_stock(record_id(&id, WHAT)?).await?;
    Ok(Json(dto::deleted("Stock")).into_response())
}
