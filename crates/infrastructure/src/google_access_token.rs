use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use google_cloud_token::{TokenSource, TokenSourceProvider};
use wipeout_core::{AppError, AppResult};

const CLOUD_PLATFORM_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Source of OAuth2 bearer tokens for Google REST APIs.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Returns a bearer token without the `Bearer ` prefix.
    async fn access_token(&self) -> AppResult<String>;
}

/// Application Default Credentials token provider.
///
/// The underlying token source caches and refreshes tokens, so one instance
/// is shared by every adapter for the life of the process.
#[derive(Clone)]
pub struct GoogleAccessTokenProvider {
    token_source: Arc<dyn TokenSource>,
}

impl GoogleAccessTokenProvider {
    /// Resolves Application Default Credentials with the cloud-platform scope.
    pub async fn from_environment() -> AppResult<Self> {
        let config = google_cloud_auth::project::Config::default().with_scopes(CLOUD_PLATFORM_SCOPES);
        let provider = google_cloud_auth::token::DefaultTokenSourceProvider::new(config)
            .await
            .map_err(|error| {
                AppError::Unavailable(format!(
                    "failed to resolve application default credentials: {error}"
                ))
            })?;

        Ok(Self {
            token_source: provider.token_source(),
        })
    }
}

#[async_trait]
impl AccessTokenProvider for GoogleAccessTokenProvider {
    async fn access_token(&self) -> AppResult<String> {
        let token = self.token_source.token().await.map_err(|error| {
            AppError::Unavailable(format!("failed to obtain access token: {error}"))
        })?;

        Ok(strip_bearer(token))
    }
}

/// Fixed-token provider for emulators and tests.
#[derive(Debug, Clone)]
pub struct StaticAccessTokenProvider {
    token: String,
}

impl StaticAccessTokenProvider {
    /// Creates a provider that always returns `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: strip_bearer(token.into()),
        }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticAccessTokenProvider {
    async fn access_token(&self) -> AppResult<String> {
        Ok(self.token.clone())
    }
}

/// Adapts an [`AccessTokenProvider`] to the SDK token source interface.
///
/// SDK clients send the returned value verbatim as the `Authorization`
/// header, so the `Bearer ` prefix is restored here.
#[derive(Clone)]
pub(crate) struct BearerTokenSource {
    provider: Arc<dyn AccessTokenProvider>,
}

impl BearerTokenSource {
    pub(crate) fn new(provider: Arc<dyn AccessTokenProvider>) -> Self {
        Self { provider }
    }
}

impl fmt::Debug for BearerTokenSource {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("BearerTokenSource").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenSource for BearerTokenSource {
    async fn token(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let token = self.provider.access_token().await?;
        Ok(format!("Bearer {token}"))
    }
}

impl TokenSourceProvider for BearerTokenSource {
    fn token_source(&self) -> Arc<dyn TokenSource> {
        Arc::new(self.clone())
    }
}

fn strip_bearer(token: String) -> String {
    match token.strip_prefix("Bearer ") {
        Some(stripped) => stripped.to_owned(),
        None => token,
    }
}
