use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::json;
use wipeout_application::{CandidateQuery, TranscriptQueryEngine, WipeoutLogWriter};
use wipeout_core::AppError;
use wipeout_domain::{BrandConfig, BrandConfigInput, TablePath, WipeoutRecord};
use wiremock::matchers::{
    body_partial_json, header, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::google_access_token::StaticAccessTokenProvider;

use super::BigQueryClient;
use super::query::parse_timestamp;

const QUERIES_PATH: &str = "/bigquery/v2/projects/billing-project/queries";

fn client(server: &MockServer) -> BigQueryClient {
    BigQueryClient::new(
        reqwest::Client::new(),
        format!("{}/bigquery/v2", server.uri()).as_str(),
        "billing-project",
        Arc::new(StaticAccessTokenProvider::new("test-token")),
    )
    .unwrap_or_else(|_| unreachable!())
}

fn candidate_query() -> CandidateQuery {
    let brand = BrandConfig::new(
        "acme",
        BrandConfigInput {
            transcripts_table: Some("acme.transcripts.prod".to_owned()),
            wipeout_log_table: Some("acme.wipeout.log".to_owned()),
            ..BrandConfigInput::default()
        },
    )
    .unwrap_or_else(|_| unreachable!());

    CandidateQuery::for_brand(&brand)
}

fn schema() -> serde_json::Value {
    json!({
        "fields": [
            {"name": "session_id", "type": "STRING"},
            {"name": "project_id", "type": "STRING"},
            {"name": "agent_id", "type": "STRING"},
            {"name": "request_time", "type": "TIMESTAMP"}
        ]
    })
}

fn row(session_id: &str, project_id: Option<&str>, micros: i64) -> serde_json::Value {
    json!({
        "f": [
            {"v": session_id},
            {"v": project_id},
            {"v": "agent-7"},
            {"v": micros.to_string()}
        ]
    })
}

#[tokio::test]
async fn query_decodes_single_page_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUERIES_PATH))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({
            "useLegacySql": false,
            "formatOptions": {"useInt64Timestamp": true}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "bigquery#queryResponse",
            "jobComplete": true,
            "jobReference": {"projectId": "billing-project", "jobId": "job-1", "location": "US"},
            "schema": schema(),
            "rows": [row("S1", Some("proj-1"), 1_709_632_800_000_000), row("S2", None, 1_709_632_860_000_000)],
            "totalRows": "2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sessions = client(&server)
        .find_candidate_sessions(&candidate_query())
        .await;

    assert!(sessions.is_ok());
    let sessions = sessions.unwrap_or_default();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].session_id, "S1");
    assert_eq!(sessions[0].project_id.as_deref(), Some("proj-1"));
    assert_eq!(sessions[0].agent_id, "agent-7");
    assert_eq!(
        sessions[0].request_time,
        Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0)
            .single()
            .unwrap_or_default()
    );
    assert_eq!(sessions[1].project_id, None);
}

#[tokio::test]
async fn query_polls_incomplete_job_and_follows_page_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUERIES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobComplete": false,
            "jobReference": {"projectId": "billing-project", "jobId": "job-9", "location": "EU"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{QUERIES_PATH}/job-9")))
        .and(query_param("location", "EU"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobComplete": true,
            "jobReference": {"projectId": "billing-project", "jobId": "job-9", "location": "EU"},
            "schema": schema(),
            "rows": [row("S1", Some("p"), 1_709_632_800_000_000)],
            "pageToken": "page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{QUERIES_PATH}/job-9")))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobComplete": true,
            "jobReference": {"projectId": "billing-project", "jobId": "job-9", "location": "EU"},
            "schema": schema(),
            "rows": [row("S2", Some("p"), 1_709_632_900_000_000)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sessions = client(&server)
        .find_candidate_sessions(&candidate_query())
        .await;

    assert!(sessions.is_ok());
    let ids: Vec<String> = sessions
        .unwrap_or_default()
        .into_iter()
        .map(|session| session.session_id)
        .collect();
    assert_eq!(ids, vec!["S1".to_owned(), "S2".to_owned()]);
}

#[tokio::test]
async fn query_error_status_is_a_query_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUERIES_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "Unrecognized name: conversation_name"}
        })))
        .mount(&server)
        .await;

    let result = client(&server)
        .find_candidate_sessions(&candidate_query())
        .await;

    match result {
        Err(AppError::Query(message)) => {
            assert!(message.contains("400"));
            assert!(message.contains("Unrecognized name"));
        }
        other => panic!("expected query error, got {other:?}"),
    }
}

#[tokio::test]
async fn row_missing_session_id_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUERIES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobComplete": true,
            "schema": schema(),
            "rows": [{"f": [{"v": null}, {"v": "p"}, {"v": "a"}, {"v": "1709632800000000"}]}]
        })))
        .mount(&server)
        .await;

    let result = client(&server)
        .find_candidate_sessions(&candidate_query())
        .await;

    assert!(matches!(result, Err(AppError::Query(_))));
}

#[tokio::test]
async fn append_record_streams_one_row_keyed_by_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/bigquery/v2/projects/acme/datasets/wipeout/tables/log/insertAll",
        ))
        .and(body_partial_json(json!({
            "rows": [{
                "insertId": "S1",
                "json": {
                    "session_id": "S1",
                    "request_timestamp": "2024-03-05T10:00:00.000000Z",
                    "deleted_timestamp": "2024-03-05T11:30:00.000000Z"
                }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "bigquery#tableDataInsertAllResponse"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let table = TablePath::parse("acme.wipeout.log").unwrap_or_else(|_| unreachable!());
    let record = WipeoutRecord {
        session_id: "S1".to_owned(),
        request_timestamp: Utc
            .with_ymd_and_hms(2024, 3, 5, 10, 0, 0)
            .single()
            .unwrap_or_default(),
        deleted_timestamp: Utc
            .with_ymd_and_hms(2024, 3, 5, 11, 30, 0)
            .single()
            .unwrap_or_default(),
    };

    let result = client(&server).append_record(&table, &record).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn append_record_reports_insert_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/bigquery/v2/projects/acme/datasets/wipeout/tables/log/insertAll",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "insertErrors": [
                {"index": 0, "errors": [{"reason": "invalid", "message": "no such field: deleted_timestamp"}]}
            ]
        })))
        .mount(&server)
        .await;

    let table = TablePath::parse("acme.wipeout.log").unwrap_or_else(|_| unreachable!());
    let record = WipeoutRecord {
        session_id: "S1".to_owned(),
        request_timestamp: Utc::now(),
        deleted_timestamp: Utc::now(),
    };

    let result = client(&server).append_record(&table, &record).await;

    match result {
        Err(AppError::AuditLog(message)) => assert!(message.contains("no such field")),
        other => panic!("expected audit log error, got {other:?}"),
    }
}

#[tokio::test]
async fn check_ready_lists_datasets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bigquery/v2/projects/billing-project/datasets"))
        .and(query_param("maxResults", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"datasets": []})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client(&server).check_ready().await.is_ok());
}

#[tokio::test]
async fn check_ready_reports_denied_credentials_as_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bigquery/v2/projects/billing-project/datasets"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let result = client(&server).check_ready().await;

    assert!(matches!(result, Err(AppError::Unavailable(_))));
}

#[test]
fn timestamps_accept_micros_and_float_seconds() {
    let expected = Utc
        .with_ymd_and_hms(2024, 3, 5, 10, 0, 0)
        .single()
        .unwrap_or_default();

    assert_eq!(parse_timestamp("1709632800000000").ok(), Some(expected));
    assert_eq!(parse_timestamp("1.7096328E9").ok(), Some(expected));
    assert!(parse_timestamp("yesterday").is_err());
}
