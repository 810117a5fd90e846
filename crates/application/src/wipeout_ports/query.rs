use async_trait::async_trait;
use wipeout_core::AppResult;
use wipeout_domain::CandidateSession;

use crate::candidate_query::CandidateQuery;

/// Analytical query port over the transcript store.
#[async_trait]
pub trait TranscriptQueryEngine: Send + Sync {
    /// Verifies the engine is reachable with the configured credentials.
    async fn check_ready(&self) -> AppResult<()>;

    /// Executes the candidate query and returns every result row.
    async fn find_candidate_sessions(
        &self,
        query: &CandidateQuery,
    ) -> AppResult<Vec<CandidateSession>>;
}
