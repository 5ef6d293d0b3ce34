use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CompteId;

/// Unique identifier for a transaction (server-assigned GraphQL ID)
pub type TransactionId = String;

/// Kind of transaction: deposit (DEPOT) or withdrawal (RETRAIT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Depot,
    Retrait,
}

/// Reference to the owning compte, as selected by `addTransaction`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompteRef {
    pub id: CompteId,
}

/// A deposit or withdrawal applied to a compte; immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub montant: Decimal,
    /// Server-assigned timestamp
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Present only on the `addTransaction` selection set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compte: Option<CompteRef>,
}
