use axum::body::Bytes;
use axum::extract::State;
use serde_json::Value;
use tracing::{error, info, warn};
use wipeout_core::{AppError, AppResult};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const CLIENTS_NOT_INITIALIZED: &str =
    "Cloud clients are not initialized. The function cannot proceed.";

/// Runs one wipeout job for the brand named in the JSON body.
pub async fn run_wipeout_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<String> {
    let Some(service) = state.wipeout_service.as_ref() else {
        error!("rejecting wipeout request because cloud clients are not initialized");
        return Err(AppError::Unavailable(CLIENTS_NOT_INITIALIZED.to_owned()).into());
    };

    let selector = brand_selector(&body)?;
    let brand = state
        .brand_registry
        .resolve(selector.as_str())
        .inspect_err(|error| warn!(error = %error, "rejecting wipeout request"))?;

    service.check_ready().await.inspect_err(|error| {
        error!(brand = %brand.name(), error = %error, "cloud clients are not ready");
    })?;

    let summary = service
        .run_for_brand(brand)
        .await
        .map_err(|error| ApiError::job_failed(brand.name(), error))?;
    info!(run_id = %summary.run_id, brand = %brand.name(), "wipeout request completed");

    Ok(summary.to_string())
}

fn brand_selector(body: &[u8]) -> AppResult<String> {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|payload| {
            payload
                .get("brand")
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .ok_or_else(|| {
            AppError::InvalidRequest("Missing JSON payload with 'brand' key.".to_owned())
        })
}
