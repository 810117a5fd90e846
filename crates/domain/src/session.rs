//! Candidate sessions, storage objects and wipeout run results.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use wipeout_core::RunId;

/// Renders a timestamp as an RFC 3339 UTC string with microsecond precision.
#[must_use]
pub fn iso_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Session flagged by the candidate query as containing the redaction marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSession {
    /// Conversation session identifier.
    pub session_id: String,
    /// Project segment of the conversation name, when present.
    pub project_id: Option<String>,
    /// Agent segment of the conversation name.
    pub agent_id: String,
    /// Earliest matching turn's request time.
    pub request_time: DateTime<Utc>,
}

impl CandidateSession {
    /// Returns the UTC calendar date used in storage paths.
    #[must_use]
    pub fn request_date(&self) -> NaiveDate {
        self.request_time.date_naive()
    }
}

/// One object found under a session prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageObject {
    /// Bucket holding the object.
    pub bucket: String,
    /// Full object name.
    pub name: String,
    /// Object generation reported by the store, if any.
    pub generation: Option<i64>,
}

/// Append-only wipeout log entry written after a successful deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WipeoutRecord {
    /// Session whose audio was deleted.
    pub session_id: String,
    /// Request time of the matched session.
    pub request_timestamp: DateTime<Utc>,
    /// Time the deletion completed.
    pub deleted_timestamp: DateTime<Utc>,
}

/// Aggregate counters for one wipeout invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WipeoutSummary {
    /// Invocation identifier.
    pub run_id: RunId,
    /// Normalized brand name.
    pub brand: String,
    /// Sessions returned by the candidate query.
    pub scanned_sessions: u64,
    /// Sessions whose objects were all deleted.
    pub deleted_folders: u64,
    /// Objects deleted across all sessions.
    pub deleted_files: u64,
    /// Wipeout log records appended.
    pub logged_sessions: u64,
    /// Per-session failures during deletion or logging.
    pub errors: u64,
}

impl WipeoutSummary {
    /// Creates an empty summary for one brand run.
    #[must_use]
    pub fn new(run_id: RunId, brand: impl Into<String>) -> Self {
        Self {
            run_id,
            brand: brand.into(),
            scanned_sessions: 0,
            deleted_folders: 0,
            deleted_files: 0,
            logged_sessions: 0,
            errors: 0,
        }
    }
}

impl Display for WipeoutSummary {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "Job finished for brand '{}'. Found {} sessions matching criteria. \
             Successfully deleted {} folders ({} total files). \
             Encountered {} errors during GCS deletion.",
            self.brand,
            self.scanned_sessions,
            self.deleted_folders,
            self.deleted_files,
            self.errors
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use wipeout_core::RunId;

    use super::{CandidateSession, WipeoutSummary, iso_timestamp};

    #[test]
    fn request_date_uses_utc_calendar_day() {
        let session = CandidateSession {
            session_id: "S1".to_owned(),
            project_id: None,
            agent_id: "A1".to_owned(),
            request_time: Utc
                .with_ymd_and_hms(2024, 3, 5, 23, 59, 59)
                .single()
                .unwrap_or_default(),
        };

        assert_eq!(session.request_date().to_string(), "2024-03-05");
    }

    #[test]
    fn iso_timestamp_is_utc_with_micros() {
        let value = Utc
            .with_ymd_and_hms(2024, 3, 5, 10, 0, 0)
            .single()
            .unwrap_or_default();
        assert_eq!(iso_timestamp(value), "2024-03-05T10:00:00.000000Z");
    }

    #[test]
    fn summary_renders_job_message() {
        let mut summary = WipeoutSummary::new(RunId::new(), "mcdonalds");
        summary.scanned_sessions = 3;
        summary.deleted_folders = 2;
        summary.deleted_files = 7;
        summary.errors = 1;

        assert_eq!(
            summary.to_string(),
            "Job finished for brand 'mcdonalds'. Found 3 sessions matching criteria. \
             Successfully deleted 2 folders (7 total files). \
             Encountered 1 errors during GCS deletion."
        );
    }
}
