use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sitegrade_api::{build_router, AppState};
use sitegrade_core::{AppConfig, Evaluator};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sitegrade=info".parse()?))
        .init();

    let config = AppConfig::from_env()?;
    let evaluator = Evaluator::from_config(&config)?;

    info!(
        screenshot_dir = %evaluator.screenshots().dir().display(),
        html_model = %evaluator.models().html,
        ux_model = %evaluator.models().user_experience,
        "Evaluator ready"
    );

    let app = build_router(Arc::new(AppState { evaluator }));

    let addr = format!("{}:{}", config.host, config.port);
    info!("Sitegrade API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
