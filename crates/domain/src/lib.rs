//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod brand;
mod path_template;
mod session;

pub use brand::{
    BrandConfig, BrandConfigInput, BrandRegistry, StorageTarget, TablePath, normalize_brand,
};
pub use path_template::{AgentId, PathTemplate, SessionId, StoragePrefix};
pub use session::{
    CandidateSession, StorageObject, WipeoutRecord, WipeoutSummary, iso_timestamp,
};
