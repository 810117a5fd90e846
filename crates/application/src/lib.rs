//! Application services and ports.

#![forbid(unsafe_code)]

mod candidate_query;
mod wipeout_ports;
mod wipeout_service;

pub use candidate_query::{
    AGENT_ID_OFFSET, CandidateQuery, DEFAULT_LOOKBACK_MINUTES, PROJECT_ID_OFFSET, REDACTION_MARKER,
    SESSION_ID_OFFSET,
};
pub use wipeout_ports::{ObjectStore, TranscriptQueryEngine, WipeoutLogWriter};
pub use wipeout_service::WipeoutService;
