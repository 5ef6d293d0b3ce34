//! Transport abstraction for executing GraphQL requests
//!
//! The trait-based seam lets tests swap the HTTP transport for an
//! in-process stand-in of the remote service.

pub mod http;

use crate::error::TransportError;
use crate::wire::{GraphqlRequest, GraphqlResponse};
use async_trait::async_trait;

/// Executes one GraphQL request against the remote endpoint
///
/// No retries, no timeout: a transport failure surfaces as-is and a hung
/// call simply never resolves.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    /// Send a request and wait for the response envelope
    async fn send(&self, request: &GraphqlRequest) -> Result<GraphqlResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Ensure the trait is object-safe
    fn _assert_transport_object_safe(_: &dyn GraphqlTransport) {}
}
