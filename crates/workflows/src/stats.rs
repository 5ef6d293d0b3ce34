//! Statistics workflow
//!
//! Stats are time-sensitive aggregates: every load re-executes the
//! query instead of serving a cached copy, and the displayed values are
//! exactly what the service returns.

use guichet_cache::QueryCache;
use guichet_core::TransactionStats;
use guichet_gateway::{QueryData, QuerySpec};

use crate::error::{Result, WorkflowError};

pub struct StatsView {
    cache: QueryCache,
}

impl StatsView {
    pub fn new(cache: QueryCache) -> Self {
        Self { cache }
    }

    /// Fetch fresh aggregates
    pub async fn load(&self) -> Result<TransactionStats> {
        let snapshot = self.cache.refetch(QuerySpec::TransactionStats).await;
        if let Some(QueryData::Stats(stats)) = snapshot.data {
            return Ok(stats);
        }
        Err(WorkflowError::Query(
            snapshot.error.unwrap_or_else(|| "stats unavailable".into()),
        ))
    }
}
