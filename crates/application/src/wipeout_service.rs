use std::sync::Arc;

use tracing::{error, info};
use wipeout_core::{AppError, AppResult, RunId};
use wipeout_domain::{BrandConfig, WipeoutSummary};

use crate::candidate_query::{CandidateQuery, DEFAULT_LOOKBACK_MINUTES};
use crate::wipeout_ports::{ObjectStore, TranscriptQueryEngine, WipeoutLogWriter};

mod deletion;

/// Scan, delete and log workflow for redacted sessions.
#[derive(Clone)]
pub struct WipeoutService {
    query_engine: Arc<dyn TranscriptQueryEngine>,
    object_store: Arc<dyn ObjectStore>,
    log_writer: Arc<dyn WipeoutLogWriter>,
    lookback_minutes: u32,
}

impl WipeoutService {
    /// Creates a wipeout service over injected client handles.
    #[must_use]
    pub fn new(
        query_engine: Arc<dyn TranscriptQueryEngine>,
        object_store: Arc<dyn ObjectStore>,
        log_writer: Arc<dyn WipeoutLogWriter>,
    ) -> Self {
        Self {
            query_engine,
            object_store,
            log_writer,
            lookback_minutes: DEFAULT_LOOKBACK_MINUTES,
        }
    }

    /// Overrides the trailing scan window.
    #[must_use]
    pub fn with_lookback_minutes(mut self, lookback_minutes: u32) -> Self {
        self.lookback_minutes = lookback_minutes;
        self
    }

    /// Verifies both backing clients are live.
    pub async fn check_ready(&self) -> AppResult<()> {
        self.query_engine.check_ready().await.map_err(|error| {
            AppError::Unavailable(format!("query engine is not ready: {error}"))
        })?;
        self.object_store.check_ready().await.map_err(|error| {
            AppError::Unavailable(format!("object store is not ready: {error}"))
        })?;

        Ok(())
    }

    /// Runs one wipeout pass for a brand.
    ///
    /// A query failure aborts the run before any deletion. Failures while
    /// deleting or logging one session are counted in the summary and the
    /// next session is processed.
    pub async fn run_for_brand(&self, brand: &BrandConfig) -> AppResult<WipeoutSummary> {
        let run_id = RunId::new();
        let mut summary = WipeoutSummary::new(run_id, brand.name());

        info!(%run_id, brand = %brand.name(), "starting wipeout job");
        if let Some(log_table) = brand.wipeout_log_table() {
            info!(
                brand = %brand.name(),
                log_table = %log_table,
                "using wipeout log to exclude previously deleted sessions"
            );
        }
        info!(
            brand = %brand.name(),
            transcripts_table = %brand.transcripts_table(),
            lookback_minutes = self.lookback_minutes,
            bucket = brand
                .storage()
                .map(|storage| storage.bucket())
                .unwrap_or("Not configured (deletion skipped)"),
            "scanning transcripts"
        );

        let query = CandidateQuery::for_brand(brand).with_lookback_minutes(self.lookback_minutes);
        let candidates = self
            .query_engine
            .find_candidate_sessions(&query)
            .await
            .map_err(|error| {
                error!(%run_id, brand = %brand.name(), error = %error, "candidate query failed");
                match error {
                    AppError::Query(_) => error,
                    other => AppError::Query(other.to_string()),
                }
            })?;

        for candidate in &candidates {
            summary.scanned_sessions = summary.scanned_sessions.saturating_add(1);
            self.process_session(brand, candidate, &mut summary).await;
        }

        info!(
            %run_id,
            brand = %brand.name(),
            scanned_sessions = summary.scanned_sessions,
            deleted_folders = summary.deleted_folders,
            deleted_files = summary.deleted_files,
            logged_sessions = summary.logged_sessions,
            errors = summary.errors,
            "wipeout job finished"
        );

        Ok(summary)
    }
}
