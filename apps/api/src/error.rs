use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use wipeout_core::AppError;

/// HTTP API error wrapper around core application errors.
///
/// Every error renders as a single plain-text body.
#[derive(Debug)]
pub struct ApiError {
    error: AppError,
    message: String,
}

impl ApiError {
    /// Wraps a workflow failure for one brand.
    pub fn job_failed(brand: &str, error: AppError) -> Self {
        let detail = match &error {
            AppError::Query(detail) => detail.clone(),
            other => other.to_string(),
        };

        Self {
            message: format!("Job failed for brand '{brand}' with error: {detail}"),
            error,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.error {
            AppError::Validation(_)
            | AppError::InvalidRequest(_)
            | AppError::UnknownBrand { .. } => StatusCode::BAD_REQUEST,
            AppError::MisconfiguredBrand(_)
            | AppError::Unavailable(_)
            | AppError::Query(_)
            | AppError::Storage(_)
            | AppError::AuditLog(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self {
            message: value.to_string(),
            error: value,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), self.message).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
