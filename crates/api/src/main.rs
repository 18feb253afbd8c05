use anyhow::{Context, Result};
use cardio_api::{build_app, ServiceConfig};
use cardio_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("cardio_api");

    let config = ServiceConfig::from_env().context("invalid service configuration")?;
    let app = build_app(&config).context("refusing to start without consistent model artifacts")?;

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!(
        bind = %config.bind,
        model = %config.artifacts.model.display(),
        scaler = %config.artifacts.scaler.display(),
        "cardio prediction api started"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
