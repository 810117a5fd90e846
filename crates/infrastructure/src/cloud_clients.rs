use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use wipeout_application::{DEFAULT_LOOKBACK_MINUTES, WipeoutService};
use wipeout_core::{AppError, AppResult};
use wipeout_domain::BrandRegistry;

use crate::bigquery_client::{BigQueryClient, DEFAULT_BIGQUERY_BASE_URL};
use crate::gcs_object_store::{DEFAULT_STORAGE_BASE_URL, GcsObjectStore};
use crate::google_access_token::{
    AccessTokenProvider, GoogleAccessTokenProvider, StaticAccessTokenProvider,
};

/// Runtime settings for the Google Cloud adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudClientSettings {
    /// Project that owns BigQuery query jobs.
    pub project_id: String,
    /// Per-request timeout of the BigQuery HTTP client.
    pub http_timeout: Duration,
    /// BigQuery REST root.
    pub bigquery_base_url: String,
    /// Cloud Storage endpoint, without the `/storage/v1` path.
    pub storage_base_url: String,
    /// Fixed bearer token replacing Application Default Credentials.
    pub static_access_token: Option<String>,
    /// Trailing scan window.
    pub lookback_minutes: u32,
}

impl CloudClientSettings {
    /// Creates settings with production endpoints and default timings.
    #[must_use]
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            http_timeout: Duration::from_secs(60),
            bigquery_base_url: DEFAULT_BIGQUERY_BASE_URL.to_owned(),
            storage_base_url: DEFAULT_STORAGE_BASE_URL.to_owned(),
            static_access_token: None,
            lookback_minutes: DEFAULT_LOOKBACK_MINUTES,
        }
    }
}

/// Builds the token source, both Google adapters and the wipeout service.
///
/// One token provider is shared by every adapter. Storage readiness covers
/// every bucket of `registry` that has deletion enabled.
pub async fn connect_wipeout_service(
    settings: &CloudClientSettings,
    registry: &BrandRegistry,
) -> AppResult<WipeoutService> {
    let http_client = reqwest::Client::builder()
        .timeout(settings.http_timeout)
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let token_provider: Arc<dyn AccessTokenProvider> = match &settings.static_access_token {
        Some(token) => {
            info!("using static access token");
            Arc::new(StaticAccessTokenProvider::new(token.clone()))
        }
        None => Arc::new(GoogleAccessTokenProvider::from_environment().await?),
    };

    let bigquery = Arc::new(BigQueryClient::new(
        http_client,
        settings.bigquery_base_url.as_str(),
        settings.project_id.as_str(),
        token_provider.clone(),
    )?);
    let storage = Arc::new(GcsObjectStore::new(
        settings.storage_base_url.as_str(),
        token_provider,
        registry.buckets(),
    )?);

    info!(
        project_id = %settings.project_id,
        bigquery_base_url = %settings.bigquery_base_url,
        storage_base_url = %settings.storage_base_url,
        "cloud clients initialized"
    );

    Ok(
        WipeoutService::new(bigquery.clone(), storage, bigquery)
            .with_lookback_minutes(settings.lookback_minutes),
    )
}
