use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregate transaction statistics, recomputed fully by the remote
/// service on each request and never persisted client-side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStats {
    pub count: u64,
    pub sum_depots: Decimal,
    pub sum_retraits: Decimal,
}
