use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::config::Config;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the HTTP router around already-constructed services.
///
/// The API is mounted at the configured prefix and again at `<prefix>/v1`;
/// `/health` always sits at the root.
pub fn build_app(services: Arc<AppServices>, config: &Config) -> Router {
    let prefix = config.api_prefix.as_str();
    let versioned = format!("{prefix}/v1");

    let api = if prefix.is_empty() {
        routes::router().nest(&versioned, routes::router())
    } else {
        Router::new()
            .nest(prefix, routes::router())
            .nest(&versioned, routes::router())
    };

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(api)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .layer(Extension(services)),
        )
}
