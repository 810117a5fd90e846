//! Candidate session query.
//!
//! Conversation names follow the layout
//! `projects/{project}/locations/{location}/agents/{agent}/sessions/{session}/...`,
//! so the project, agent and session ids sit at split offsets 1, 5 and 7.

use wipeout_domain::{BrandConfig, TablePath};

/// Literal substring that flags an utterance for audio deletion.
pub const REDACTION_MARKER: &str = "[redacted]";

/// Trailing window scanned on every run.
pub const DEFAULT_LOOKBACK_MINUTES: u32 = 60;

/// Conversation name split offset holding the project id.
pub const PROJECT_ID_OFFSET: usize = 1;
/// Conversation name split offset holding the agent id.
pub const AGENT_ID_OFFSET: usize = 5;
/// Conversation name split offset holding the session id.
pub const SESSION_ID_OFFSET: usize = 7;

/// Read-only query selecting unprocessed sessions that contain the marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery {
    /// Transcript table scanned.
    pub transcripts_table: TablePath,
    /// Wipeout log used to exclude already processed sessions.
    pub wipeout_log_table: Option<TablePath>,
    /// Trailing window relative to execution time.
    pub lookback_minutes: u32,
    /// Case-sensitive marker searched in user utterances.
    pub marker: String,
}

impl CandidateQuery {
    /// Builds the query for one brand with the default window and marker.
    #[must_use]
    pub fn for_brand(brand: &BrandConfig) -> Self {
        Self {
            transcripts_table: brand.transcripts_table().clone(),
            wipeout_log_table: brand.wipeout_log_table().cloned(),
            lookback_minutes: DEFAULT_LOOKBACK_MINUTES,
            marker: REDACTION_MARKER.to_owned(),
        }
    }

    /// Overrides the trailing window.
    #[must_use]
    pub fn with_lookback_minutes(mut self, lookback_minutes: u32) -> Self {
        self.lookback_minutes = lookback_minutes;
        self
    }

    /// Renders the query as BigQuery Standard SQL.
    ///
    /// One row is produced per session id, carrying the earliest matching
    /// request time. Sessions present in the wipeout log are excluded through
    /// a left anti-join.
    #[must_use]
    pub fn to_sql(&self) -> String {
        let (join_clause, exclusion_clause) = match &self.wipeout_log_table {
            Some(log_table) => (
                format!("\n        LEFT JOIN `{log_table}` AS log ON T.session_id = log.session_id"),
                "\n        WHERE log.session_id IS NULL".to_owned(),
            ),
            None => (String::new(), String::new()),
        };

        format!(
            r#"
        WITH ConversationTurn AS (
          SELECT
            request_time,
            SPLIT(conversation_name, "/")[SAFE_OFFSET({PROJECT_ID_OFFSET})] AS project_id,
            SPLIT(conversation_name, "/")[SAFE_OFFSET({AGENT_ID_OFFSET})] AS agent_id,
            SPLIT(conversation_name, "/")[SAFE_OFFSET({SESSION_ID_OFFSET})] AS session_id,
            TO_JSON_STRING(derived_data.userUtterances) AS customer_utterance
          FROM
            `{transcripts_table}`
          WHERE
            request_time >= TIMESTAMP_SUB(CURRENT_TIMESTAMP(), INTERVAL {lookback} MINUTE)
        ),
        RedactedSession AS (
          SELECT
            session_id,
            ANY_VALUE(project_id) AS project_id,
            ANY_VALUE(agent_id) AS agent_id,
            MIN(request_time) AS request_time
          FROM
            ConversationTurn
          WHERE
            STRPOS(customer_utterance, {marker}) > 0
            AND session_id IS NOT NULL
            AND agent_id IS NOT NULL
            AND request_time IS NOT NULL
          GROUP BY
            session_id
        )
        SELECT
            T.session_id,
            T.project_id,
            T.agent_id,
            T.request_time
        FROM
            RedactedSession AS T{join_clause}{exclusion_clause}
    "#,
            transcripts_table = self.transcripts_table,
            lookback = self.lookback_minutes,
            marker = sql_string_literal(self.marker.as_str()),
        )
    }
}

fn sql_string_literal(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

#[cfg(test)]
mod tests {
    use wipeout_domain::{BrandConfig, BrandConfigInput};

    use super::CandidateQuery;

    fn brand(log_table: Option<&str>) -> BrandConfig {
        BrandConfig::new(
            "mcdonalds",
            BrandConfigInput {
                transcripts_table: Some("mcdonalds-ttm.transcripts_decibel.prod".to_owned()),
                bucket: Some("mcdonalds-ttm-audio".to_owned()),
                wipeout_log_table: log_table.map(str::to_owned),
                path_template: Some("ttm/{agent_id}/{date_str}/{session_id}/".to_owned()),
            },
        )
        .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn query_scans_trailing_window_for_marker() {
        let sql = CandidateQuery::for_brand(&brand(None)).to_sql();

        assert!(sql.contains("FROM\n            `mcdonalds-ttm.transcripts_decibel.prod`"));
        assert!(sql.contains("INTERVAL 60 MINUTE"));
        assert!(sql.contains("STRPOS(customer_utterance, '[redacted]') > 0"));
        assert!(sql.contains("[SAFE_OFFSET(5)] AS agent_id"));
        assert!(sql.contains("[SAFE_OFFSET(7)] AS session_id"));
        assert!(sql.contains("GROUP BY\n            session_id"));
        assert!(!sql.contains("LEFT JOIN"));
    }

    #[test]
    fn query_excludes_logged_sessions_when_log_table_configured() {
        let sql = CandidateQuery::for_brand(&brand(Some(
            "foodai-analytics.audio_wipeout_dataset.mcdonalds_prod_log",
        )))
        .to_sql();

        assert!(sql.contains(
            "LEFT JOIN `foodai-analytics.audio_wipeout_dataset.mcdonalds_prod_log` AS log \
             ON T.session_id = log.session_id"
        ));
        assert!(sql.contains("WHERE log.session_id IS NULL"));
    }

    #[test]
    fn lookback_override_changes_interval() {
        let sql = CandidateQuery::for_brand(&brand(None))
            .with_lookback_minutes(15)
            .to_sql();

        assert!(sql.contains("INTERVAL 15 MINUTE"));
    }

    #[test]
    fn marker_quotes_are_escaped() {
        let mut query = CandidateQuery::for_brand(&brand(None));
        query.marker = "it's".to_owned();

        assert!(query.to_sql().contains("STRPOS(customer_utterance, 'it\\'s') > 0"));
    }
}
