use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use stockroom_core::{CategoryId, ExpectedRevision};
use stockroom_products::NewCategory;

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::routes::common::record_id;
use crate::app::services::AppServices;

const WHAT: &str = "category";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:id", get(get_category).put(update_category).delete(delete_category))
}

pub async fn list_categories(Extension(services): Extension<Arc<AppServices>>) -> ApiResult<Response> {
    Ok(Json(services.list_categories().await?).into_response())
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<NewCategory>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = payload?;
    let category = services.create_category(body).await?;
    Ok((StatusCode::CREATED, Json(category)).into_response())
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    Ok(Json(services.get_category(record_id(&id, WHAT)?).await?).into_response())
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<dto::UpdateCategoryRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let id: CategoryId = record_id(&id, WHAT)?;
    let Json(body) = payload?;
    let category = services
        .update_category(id, body.changes, ExpectedRevision::from(body.revision))
        .await?;
    Ok(Json(category).into_response())
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    services.delete_category(record_id(&id, WHAT)?).await?;
    Ok(Json(dto::deleted("Category")).into_response())
}
