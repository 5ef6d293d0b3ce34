//! Error types for the gateway crate

use thiserror::Error;

/// Transport-level errors (network/connectivity)
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Gateway-level errors surfaced to the cache and workflows
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The service reported a failure for an otherwise well-formed
    /// request; the server message is preserved verbatim
    #[error("Server error: {0}")]
    Server(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
