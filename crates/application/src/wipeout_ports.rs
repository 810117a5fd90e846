mod audit_log;
mod query;
mod storage;

pub use audit_log::WipeoutLogWriter;
pub use query::TranscriptQueryEngine;
pub use storage::ObjectStore;
