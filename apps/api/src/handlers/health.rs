use axum::extract::State;
use axum::http::StatusCode;
use tracing::warn;

use crate::state::AppState;

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, &'static str) {
    let ready = match state.wipeout_service.as_ref() {
        Some(service) => match service.check_ready().await {
            Ok(()) => true,
            Err(error) => {
                warn!(error = %error, "health check failed");
                false
            }
        },
        None => false,
    };

    if ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    }
}
