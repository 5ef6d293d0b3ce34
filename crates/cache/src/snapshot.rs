use chrono::{DateTime, Utc};
use guichet_gateway::QueryData;

/// Latest known outcome of one cached query
///
/// Fully replaced on every completed execution, never merged
/// field-by-field. `loading` is true while any request for the key is in
/// flight; the previous `data` stays visible during that window.
#[derive(Debug, Clone, Default)]
pub struct QuerySnapshot {
    pub data: Option<QueryData>,
    pub error: Option<String>,
    pub loading: bool,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl QuerySnapshot {
    /// True once at least one execution has completed, with data or error
    pub fn is_settled(&self) -> bool {
        self.data.is_some() || self.error.is_some()
    }
}
