use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use wipeout_application::{
    AGENT_ID_OFFSET, CandidateQuery, PROJECT_ID_OFFSET, SESSION_ID_OFFSET, TranscriptQueryEngine,
    WipeoutLogWriter,
};
use wipeout_core::{AppError, AppResult};
use wipeout_domain::{CandidateSession, TablePath, WipeoutRecord};

/// One conversation turn row of a transcript table.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptTurn {
    /// Slash-separated conversation resource name.
    pub conversation_name: String,
    /// Time the turn was requested.
    pub request_time: DateTime<Utc>,
    /// Structured user utterances of the turn.
    pub user_utterances: Value,
}

/// In-memory transcript warehouse acting as query engine and wipeout log.
///
/// Candidate selection mirrors the SQL rendered by [`CandidateQuery`]:
/// trailing window, split offsets, marker search over the serialized
/// utterances, one row per session with the earliest request time, and
/// exclusion of sessions already in the wipeout log.
#[derive(Debug, Default)]
pub struct InMemoryTranscriptWarehouse {
    transcripts: RwLock<HashMap<String, Vec<TranscriptTurn>>>,
    wipeout_logs: RwLock<HashMap<String, Vec<WipeoutRecord>>>,
    reference_time: Option<DateTime<Utc>>,
}

impl InMemoryTranscriptWarehouse {
    /// Creates an empty warehouse evaluated against the wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the time the trailing window is measured from.
    #[must_use]
    pub fn with_reference_time(mut self, reference_time: DateTime<Utc>) -> Self {
        self.reference_time = Some(reference_time);
        self
    }

    /// Appends a turn to a transcript table.
    pub async fn insert_turn(&self, table: &TablePath, turn: TranscriptTurn) {
        self.transcripts
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .push(turn);
    }

    /// Returns the records appended to a wipeout log table.
    pub async fn wipeout_log(&self, table: &TablePath) -> Vec<WipeoutRecord> {
        self.wipeout_logs
            .read()
            .await
            .get(&table.to_string())
            .cloned()
            .unwrap_or_default()
    }

    fn now(&self) -> DateTime<Utc> {
        self.reference_time.unwrap_or_else(Utc::now)
    }
}

#[async_trait]
impl TranscriptQueryEngine for InMemoryTranscriptWarehouse {
    async fn check_ready(&self) -> AppResult<()> {
        Ok(())
    }

    async fn find_candidate_sessions(
        &self,
        query: &CandidateQuery,
    ) -> AppResult<Vec<CandidateSession>> {
        let window_start = self.now() - Duration::minutes(i64::from(query.lookback_minutes));

        let excluded: HashSet<String> = match &query.wipeout_log_table {
            Some(log_table) => self
                .wipeout_logs
                .read()
                .await
                .get(&log_table.to_string())
                .map(|records| {
                    records
                        .iter()
                        .map(|record| record.session_id.clone())
                        .collect()
                })
                .unwrap_or_default(),
            None => HashSet::new(),
        };

        let transcripts = self.transcripts.read().await;
        let turns = transcripts
            .get(&query.transcripts_table.to_string())
            .ok_or_else(|| {
                AppError::Query(format!(
                    "Not found: Table {} was not found",
                    query.transcripts_table
                ))
            })?;

        let mut sessions: BTreeMap<String, CandidateSession> = BTreeMap::new();
        for turn in turns {
            if turn.request_time < window_start {
                continue;
            }

            let utterances = serde_json::to_string(&turn.user_utterances).map_err(|error| {
                AppError::Query(format!("failed to serialize user utterances: {error}"))
            })?;
            if !utterances.contains(query.marker.as_str()) {
                continue;
            }

            let segments: Vec<&str> = turn.conversation_name.split('/').collect();
            let (Some(agent_id), Some(session_id)) = (
                segments.get(AGENT_ID_OFFSET),
                segments.get(SESSION_ID_OFFSET),
            ) else {
                continue;
            };

            sessions
                .entry((*session_id).to_owned())
                .and_modify(|session| {
                    if turn.request_time < session.request_time {
                        session.request_time = turn.request_time;
                    }
                })
                .or_insert_with(|| CandidateSession {
                    session_id: (*session_id).to_owned(),
                    project_id: segments
                        .get(PROJECT_ID_OFFSET)
                        .map(|value| (*value).to_owned()),
                    agent_id: (*agent_id).to_owned(),
                    request_time: turn.request_time,
                });
        }

        let mut candidates: Vec<CandidateSession> = sessions
            .into_values()
            .filter(|session| !excluded.contains(&session.session_id))
            .collect();
        candidates.sort_by(|left, right| {
            left.request_time
                .cmp(&right.request_time)
                .then_with(|| left.session_id.cmp(&right.session_id))
        });

        Ok(candidates)
    }
}

#[async_trait]
impl WipeoutLogWriter for InMemoryTranscriptWarehouse {
    async fn append_record(&self, table: &TablePath, record: &WipeoutRecord) -> AppResult<()> {
        self.wipeout_logs
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .push(record.clone());

        Ok(())
    }
}
