use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use wipeout_application::{CandidateQuery, TranscriptQueryEngine};
use wipeout_core::{AppError, AppResult};
use wipeout_domain::CandidateSession;

use super::{BigQueryClient, QUERY_WAIT_TIMEOUT_MS};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    timeout_ms: u32,
    format_options: FormatOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FormatOptions {
    use_int64_timestamp: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    job_reference: Option<JobReference>,
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
    page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<TableFieldSchema>,
}

#[derive(Debug, Deserialize)]
struct TableFieldSchema {
    name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    v: Value,
}

#[derive(Debug, Deserialize)]
struct DatasetList {}

impl BigQueryClient {
    async fn run_query(&self, sql: &str) -> AppResult<Vec<CandidateSession>> {
        let endpoint = self.endpoint(&["projects", self.project_id(), "queries"])?;
        let request = self.http_client.post(endpoint).json(&QueryRequest {
            query: sql,
            use_legacy_sql: false,
            timeout_ms: QUERY_WAIT_TIMEOUT_MS,
            format_options: FormatOptions {
                use_int64_timestamp: true,
            },
        });
        let mut response: QueryResponse = self
            .send_json(request, "jobs.query", AppError::Query)
            .await?;

        let mut field_names: Option<Vec<String>> = None;
        let mut sessions = Vec::new();

        loop {
            if let Some(schema) = response.schema.take() {
                field_names = Some(schema.fields.into_iter().map(|field| field.name).collect());
            }

            if response.job_complete {
                let names = field_names.as_deref().ok_or_else(|| {
                    AppError::Query("BigQuery response is missing the result schema".to_owned())
                })?;
                for row in &response.rows {
                    sessions.push(decode_candidate_row(names, row)?);
                }
            }

            let needs_more = !response.job_complete || response.page_token.is_some();
            if !needs_more {
                break;
            }

            let job_reference = response.job_reference.clone().ok_or_else(|| {
                AppError::Query(
                    "BigQuery returned an incomplete result without a job reference".to_owned(),
                )
            })?;
            let page_token = if response.job_complete {
                response.page_token.take()
            } else {
                None
            };

            debug!(
                job_id = %job_reference.job_id,
                job_complete = response.job_complete,
                rows_so_far = sessions.len(),
                "fetching further query results"
            );
            response = self
                .fetch_query_results(&job_reference, page_token.as_deref())
                .await?;
        }

        Ok(sessions)
    }

    async fn fetch_query_results(
        &self,
        job_reference: &JobReference,
        page_token: Option<&str>,
    ) -> AppResult<QueryResponse> {
        let mut endpoint = self.endpoint(&[
            "projects",
            self.project_id(),
            "queries",
            job_reference.job_id.as_str(),
        ])?;
        {
            let mut query = endpoint.query_pairs_mut();
            query.append_pair("timeoutMs", QUERY_WAIT_TIMEOUT_MS.to_string().as_str());
            query.append_pair("formatOptions.useInt64Timestamp", "true");
            if let Some(location) = job_reference.location.as_deref() {
                query.append_pair("location", location);
            }
            if let Some(page_token) = page_token {
                query.append_pair("pageToken", page_token);
            }
        }

        self.send_json(
            self.http_client.get(endpoint),
            "jobs.getQueryResults",
            AppError::Query,
        )
        .await
    }
}

#[async_trait]
impl TranscriptQueryEngine for BigQueryClient {
    async fn check_ready(&self) -> AppResult<()> {
        let mut endpoint = self.endpoint(&["projects", self.project_id(), "datasets"])?;
        endpoint.query_pairs_mut().append_pair("maxResults", "1");

        let _: DatasetList = self
            .send_json(
                self.http_client.get(endpoint),
                "datasets.list",
                AppError::Unavailable,
            )
            .await?;

        Ok(())
    }

    async fn find_candidate_sessions(
        &self,
        query: &CandidateQuery,
    ) -> AppResult<Vec<CandidateSession>> {
        let sql = query.to_sql();
        info!(
            project_id = %self.project_id(),
            transcripts_table = %query.transcripts_table,
            "executing candidate query"
        );
        debug!(query = %sql, "candidate query text");

        let sessions = self.run_query(sql.as_str()).await?;
        info!(candidate_count = sessions.len(), "candidate query completed");

        Ok(sessions)
    }
}

pub(super) fn decode_candidate_row(
    field_names: &[String],
    row: &TableRow,
) -> AppResult<CandidateSession> {
    let values: HashMap<&str, &Value> = field_names
        .iter()
        .map(String::as_str)
        .zip(row.f.iter().map(|cell| &cell.v))
        .collect();

    let optional_string = |name: &str| -> Option<String> {
        values
            .get(name)
            .and_then(|value| value.as_str())
            .map(str::to_owned)
    };
    let required_string = |name: &str| -> AppResult<String> {
        optional_string(name).ok_or_else(|| {
            AppError::Query(format!("result row is missing required field '{name}'"))
        })
    };

    let request_time = required_string("request_time")?;

    Ok(CandidateSession {
        session_id: required_string("session_id")?,
        project_id: optional_string("project_id"),
        agent_id: required_string("agent_id")?,
        request_time: parse_timestamp(request_time.as_str())?,
    })
}

/// Parses a BigQuery TIMESTAMP cell.
///
/// Integer microseconds are expected; float epoch seconds are accepted for
/// endpoints that ignore `useInt64Timestamp`.
pub(super) fn parse_timestamp(value: &str) -> AppResult<DateTime<Utc>> {
    let micros = match value.parse::<i64>() {
        Ok(micros) => Some(micros),
        Err(_) => value
            .parse::<f64>()
            .ok()
            .filter(|seconds| seconds.is_finite())
            .map(|seconds| (seconds * 1_000_000.0).round() as i64),
    };

    micros
        .and_then(DateTime::from_timestamp_micros)
        .ok_or_else(|| AppError::Query(format!("invalid TIMESTAMP value '{value}'")))
}
