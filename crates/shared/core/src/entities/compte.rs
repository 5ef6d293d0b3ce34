use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unique identifier for a compte (server-assigned GraphQL ID)
pub type CompteId = String;

/// Kind of compte: checking (COURANT) or savings (EPARGNE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompteType {
    Courant,
    Epargne,
}

/// A balance-bearing account as exposed by the remote service
///
/// `solde` is maintained server-side as the sum of deposits minus
/// withdrawals; the client only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compte {
    pub id: CompteId,
    pub solde: Decimal,
    /// Server-assigned creation timestamp
    pub date_creation: DateTime<Utc>,
    #[serde(rename = "type")]
    pub compte_type: CompteType,
}
