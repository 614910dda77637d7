use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use stockroom_core::{CustomerId, ExpectedRevision, Record};
use stockroom_customers::NewCustomer;

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::routes::common::{body_id, record_id};
use crate::app::services::AppServices;

const WHAT: &str = "customer";

pub fn router() -> Router {
    Router::new()
        .route(
            "/",
            get(list_customers)
                .post(create_customer)
                .put(update_customer_from_body)
                .delete(delete_customer_from_body),
        )
        .route(
            "/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
}

pub async fn list_customers(Extension(services): Extension<Arc<AppServices>>) -> ApiResult<Response> {
    let customers = services.list_customers().await?;
    Ok(Json(customers).into_response())
}

pub async fn create_customer(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<NewCustomer>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = payload?;
    let customer = services.create_customer(body).await?;
    tracing::info!(customer_id = %customer.id(), "customer created");
    Ok((StatusCode::CREATED, Json(customer)).into_response())
}

pub async fn get_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let customer = services.get_customer(record_id(&id, WHAT)?).await?;
    Ok(Json(customer).into_response())
}

pub async fn update_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<dto::UpdateCustomerRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let id: CustomerId = record_id(&id, WHAT)?;
    let Json(body) = payload?;
    apply_update(&services, id, body).await
}

pub async fn update_customer_from_body(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::UpdateCustomerRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = payload?;
    let id: CustomerId = body_id(body.id.as_deref(), WHAT)?;
    apply_update(&services, id, body).await
}

async fn apply_update(services: &AppServices, id: CustomerId, body: dto::UpdateCustomerRequest) -> ApiResult<Response> {
    let expected = ExpectedRevision::from(body.revision);
    let customer = services.update_customer(id, body.changes, expected).await?;
    Ok(Json(customer).into_response())
}

pub async fn delete_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    services.delete_customer(record_id(&id, WHAT)?).await?;
    Ok(Json(dto::deleted("Customer")).into_response())
}

pub async fn delete_customer_from_body(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::DeleteByBodyRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = payload?;
    services.delete_customer(body_id(body.id.as_deref(), WHAT)?).await?;
    Ok(Json(dto::deleted("Customer")).into_response())
}
