use std::sync::Arc;

use tracing::error;
use wipeout_core::AppResult;
use wipeout_infrastructure::{connect_wipeout_service, load_brand_registry};

use crate::api_config::ApiConfig;
use crate::state::AppState;

/// Loads the brand registry and connects the cloud clients.
///
/// An invalid registry stops startup. Client construction failures are
/// logged and leave the service unset so requests fail with a clear message.
pub async fn build_app_state(config: &ApiConfig) -> AppResult<AppState> {
    let brand_registry = Arc::new(load_brand_registry(config.brands_file.as_deref())?);

    let wipeout_service = match connect_wipeout_service(&config.cloud, &brand_registry).await {
        Ok(service) => Some(service),
        Err(connect_error) => {
            error!(error = %connect_error, "failed to initialize cloud clients");
            None
        }
    };

    Ok(AppState {
        brand_registry,
        wipeout_service,
    })
}
