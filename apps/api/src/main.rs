//! Audio wipeout API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod error;
mod handlers;
mod state;

use tracing::info;
use wipeout_core::AppError;

use crate::api_config::{ApiConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;
    let app_state = api_services::build_app_state(&config).await?;
    let app = api_router::build_router(app_state);

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind API listener: {error}")))?;

    info!(%address, "wipeout-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("API server error: {error}")))
}
