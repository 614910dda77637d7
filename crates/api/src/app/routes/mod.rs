use axum::Router;

pub mod categories;
pub mod common;
pub mod customers;
pub mod products;
pub mod stock;
pub mod system;

/// Router for every endpoint mounted under the API prefix.
pub fn router() -> Router {
    Router::new()
        .nest("/customer", customers::router())
        .nest("/stock", stock::router())
        .nest("/product", products::router())
        .nest("/category", categories::router())
}
