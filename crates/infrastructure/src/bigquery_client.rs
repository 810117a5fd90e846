use std::sync::Arc;

use serde::de::DeserializeOwned;
use url::Url;
use wipeout_core::{AppError, AppResult};

use crate::google_access_token::AccessTokenProvider;

mod insert;
mod query;

/// Production BigQuery REST v2 endpoint.
pub const DEFAULT_BIGQUERY_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Server-side wait per `jobs.query` / `getQueryResults` call.
const QUERY_WAIT_TIMEOUT_MS: u32 = 10_000;

/// BigQuery REST client serving as transcript query engine and wipeout log.
#[derive(Clone)]
pub struct BigQueryClient {
    http_client: reqwest::Client,
    base_url: Url,
    project_id: String,
    token_provider: Arc<dyn AccessTokenProvider>,
}

impl BigQueryClient {
    /// Creates a client that runs jobs in `project_id`.
    pub fn new(
        http_client: reqwest::Client,
        base_url: &str,
        project_id: impl Into<String>,
        token_provider: Arc<dyn AccessTokenProvider>,
    ) -> AppResult<Self> {
        let base_url = Url::parse(base_url).map_err(|error| {
            AppError::Validation(format!("invalid BigQuery base URL '{base_url}': {error}"))
        })?;
        let project_id = project_id.into();
        if project_id.trim().is_empty() {
            return Err(AppError::Validation(
                "BigQuery project id must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            http_client,
            base_url,
            project_id,
            token_provider,
        })
    }

    /// Returns the project that owns query jobs.
    #[must_use]
    pub fn project_id(&self) -> &str {
        self.project_id.as_str()
    }

    fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AppError::Internal(format!(
                    "BigQuery base URL '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    async fn authorized(
        &self,
        request: reqwest::RequestBuilder,
        into_error: fn(String) -> AppError,
    ) -> AppResult<reqwest::RequestBuilder> {
        let token = self
            .token_provider
            .access_token()
            .await
            .map_err(|error| into_error(error.to_string()))?;

        Ok(request.bearer_auth(token))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
        into_error: fn(String) -> AppError,
    ) -> AppResult<T> {
        let response = self
            .authorized(request, into_error)
            .await?
            .send()
            .await
            .map_err(|error| into_error(format!("failed to call BigQuery {operation}: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(into_error(format!(
                "BigQuery {operation} returned status {}: {body}",
                status.as_u16()
            )));
        }

        response.json::<T>().await.map_err(|error| {
            into_error(format!(
                "failed to parse BigQuery {operation} response body: {error}"
            ))
        })
    }
}

#[cfg(test)]
mod tests;
