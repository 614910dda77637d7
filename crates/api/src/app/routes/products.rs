use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use stockroom_core::{ExpectedRevision, ProductId};
use stockroom_products::NewProduct;

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::routes::common::record_id;
use crate::app::services::AppServices;

const WHAT: &str = "product";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
}

pub async fn list_products(Extension(services): Extension<Arc<AppServices>>) -> ApiResult<Response> {
    let items = services
        .list_products()
        .await?
        .into_iter()
        .map(dto::product_to_json)
        .collect::<Vec<_>>();
    Ok(Json(items).into_response())
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = payload?;
    let view = services.create_product(body).await?;
    Ok((StatusCode::CREATED, Json(dto::product_to_json(view))).into_response())
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let view = services.get_product(record_id(&id, WHAT)?).await?;
    Ok(Json(dto::product_to_json(view)).into_response())
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<dto::UpdateProductRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let id: ProductId = record_id(&id, WHAT)?;
    let Json(body) = payload?;
    let view = services
        .update_product(id, body.changes, ExpectedRevision::from(body.revision))
        .await?;
    Ok(Json(dto::product_to_json(view)).into_response())
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    services.delete_product(record_id(&id, WHAT)?).await?;
    Ok(Json(dto::deleted("Product")).into_response())
}
