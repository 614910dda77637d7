use std::sync::Arc;

use anyhow::Context;

use stockroom_api::{app, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    stockroom_observability::init(config.log_format);

    let services = app::services::build_services(&config)
        .await
        .context("failed to initialize storage")?;
    let router = app::build_app(Arc::new(services), &config);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(addr = %listener.local_addr()?, prefix = %config.api_prefix, "listening");

    axum::serve(listener, router).await?;
    Ok(())
}
