use chrono::Utc;
use tracing::{error, info, warn};
use wipeout_core::{AppError, AppResult};
use wipeout_domain::{
    AgentId, BrandConfig, CandidateSession, SessionId, StoragePrefix, StorageTarget,
    WipeoutRecord, WipeoutSummary,
};

use super::WipeoutService;

impl WipeoutService {
    pub(super) async fn process_session(
        &self,
        brand: &BrandConfig,
        candidate: &CandidateSession,
        summary: &mut WipeoutSummary,
    ) {
        let Some(storage) = brand.storage() else {
            info!(
                brand = %brand.name(),
                session_id = %candidate.session_id,
                "found session but deletion is disabled (missing bucket or path template)"
            );
            return;
        };

        let prefix = match render_prefix(storage, candidate) {
            Ok(prefix) => prefix,
            Err(error) => {
                error!(
                    brand = %brand.name(),
                    session_id = %candidate.session_id,
                    error = %error,
                    "failed to build storage prefix for session"
                );
                summary.errors = summary.errors.saturating_add(1);
                return;
            }
        };

        info!(
            brand = %brand.name(),
            session_id = %candidate.session_id,
            target = %format!("gs://{}/{}", storage.bucket(), prefix),
            "found session to delete"
        );

        let deleted_files = match self.delete_prefix(storage.bucket(), &prefix).await {
            Ok(0) => {
                warn!(
                    brand = %brand.name(),
                    session_id = %candidate.session_id,
                    prefix = %prefix,
                    "no files found under prefix; folder may already be deleted"
                );
                return;
            }
            Ok(deleted_files) => deleted_files,
            Err(error) => {
                error!(
                    brand = %brand.name(),
                    session_id = %candidate.session_id,
                    prefix = %prefix,
                    error = %error,
                    "failed to delete session files"
                );
                summary.errors = summary.errors.saturating_add(1);
                return;
            }
        };

        summary.deleted_files = summary.deleted_files.saturating_add(deleted_files);
        summary.deleted_folders = summary.deleted_folders.saturating_add(1);
        info!(
            brand = %brand.name(),
            session_id = %candidate.session_id,
            deleted_files,
            "deleted all files for session"
        );

        let Some(log_table) = brand.wipeout_log_table() else {
            return;
        };

        let record = WipeoutRecord {
            session_id: candidate.session_id.clone(),
            request_timestamp: candidate.request_time,
            deleted_timestamp: Utc::now(),
        };

        match self.log_writer.append_record(log_table, &record).await {
            Ok(()) => {
                summary.logged_sessions = summary.logged_sessions.saturating_add(1);
                info!(
                    brand = %brand.name(),
                    session_id = %candidate.session_id,
                    log_table = %log_table,
                    "logged session to wipeout log"
                );
            }
            Err(error) => {
                error!(
                    brand = %brand.name(),
                    session_id = %candidate.session_id,
                    log_table = %log_table,
                    error = %error,
                    "failed to log session to wipeout log"
                );
                summary.errors = summary.errors.saturating_add(1);
            }
        }
    }

    /// Deletes every object under `prefix` and returns how many were removed.
    async fn delete_prefix(&self, bucket: &str, prefix: &StoragePrefix) -> AppResult<u64> {
        let objects = self.object_store.list_objects(bucket, prefix).await?;
        if objects.is_empty() {
            return Ok(0);
        }

        info!(bucket, prefix = %prefix, file_count = objects.len(), "deleting session files");

        let mut deleted = 0_u64;
        for object in &objects {
            self.object_store
                .delete_object(object)
                .await
                .map_err(|error| {
                    AppError::Storage(format!(
                        "deleted {deleted} of {} objects under '{prefix}' before failing on '{}': {error}",
                        objects.len(),
                        object.name
                    ))
                })?;
            deleted = deleted.saturating_add(1);
        }

        Ok(deleted)
    }
}

fn render_prefix(storage: &StorageTarget, candidate: &CandidateSession) -> AppResult<StoragePrefix> {
    let agent_id = AgentId::new(candidate.agent_id.as_str())?;
    let session_id = SessionId::new(candidate.session_id.as_str())?;

    Ok(storage
        .path_template()
        .render(&agent_id, candidate.request_date(), &session_id))
}
