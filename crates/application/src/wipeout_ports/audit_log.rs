use async_trait::async_trait;
use wipeout_core::AppResult;
use wipeout_domain::{TablePath, WipeoutRecord};

/// Append-only wipeout log port.
#[async_trait]
pub trait WipeoutLogWriter: Send + Sync {
    /// Appends one record and fails when the store reports row errors.
    async fn append_record(&self, table: &TablePath, record: &WipeoutRecord) -> AppResult<()>;
}
