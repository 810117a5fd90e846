use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wipeout_application::WipeoutLogWriter;
use wipeout_core::{AppError, AppResult};
use wipeout_domain::{TablePath, WipeoutRecord, iso_timestamp};

use super::BigQueryClient;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllRequest {
    rows: Vec<InsertRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertRow {
    insert_id: String,
    json: WipeoutRow,
}

#[derive(Debug, Serialize)]
struct WipeoutRow {
    session_id: String,
    request_timestamp: String,
    deleted_timestamp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<Value>,
}

#[async_trait]
impl WipeoutLogWriter for BigQueryClient {
    async fn append_record(&self, table: &TablePath, record: &WipeoutRecord) -> AppResult<()> {
        let endpoint = self.endpoint(&[
            "projects",
            table.project(),
            "datasets",
            table.dataset(),
            "tables",
            table.table(),
            "insertAll",
        ])?;
        let request = self.http_client.post(endpoint).json(&InsertAllRequest {
            rows: vec![InsertRow {
                insert_id: record.session_id.clone(),
                json: WipeoutRow {
                    session_id: record.session_id.clone(),
                    request_timestamp: iso_timestamp(record.request_timestamp),
                    deleted_timestamp: iso_timestamp(record.deleted_timestamp),
                },
            }],
        });

        let response: InsertAllResponse = self
            .send_json(request, "tabledata.insertAll", AppError::AuditLog)
            .await?;

        if !response.insert_errors.is_empty() {
            let details = serde_json::to_string(&response.insert_errors)
                .unwrap_or_else(|_| "<unprintable insert errors>".to_owned());
            return Err(AppError::AuditLog(format!(
                "insert into '{table}' rejected session '{}': {details}",
                record.session_id
            )));
        }

        Ok(())
    }
}
