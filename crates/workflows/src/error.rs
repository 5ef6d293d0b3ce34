//! Workflow errors

use guichet_gateway::GatewayError;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Client-side input malformed; raised before any network call
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Client-side withdrawal guard against the selection-time balance;
    /// raised before any network call
    #[error("Insufficient funds: balance {solde}, withdrawal {montant}")]
    InsufficientFunds { solde: Decimal, montant: Decimal },

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// A cached read settled with the failure message recorded in the
    /// query cache
    #[error("Query failed: {0}")]
    Query(String),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
