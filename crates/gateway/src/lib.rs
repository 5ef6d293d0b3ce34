//! Guichet Gateway
//!
//! Remote data gateway for the Guichet banking client. Provides:
//! - Typed operation specs for the fixed GraphQL contract (each mutation
//!   declaring the cached queries it invalidates)
//! - The `{query, operationName, variables}` wire envelope
//! - Transport abstraction (HTTP over reqwest, with a trait seam so tests
//!   can plug in an in-process stand-in)
//!
//! ## Architecture
//!
//! ```text
//! Workflows / Cache
//!        │ QuerySpec / MutationSpec
//!   ┌────▼─────────┐
//!   │CompteGateway │  typed decode, server-error surfacing
//!   └────┬─────────┘
//!        │ GraphqlRequest / GraphqlResponse
//!   ┌────▼─────────┐
//!   │  Transport   │  HttpTransport (reqwest) | banque-sim (tests)
//!   └────┬─────────┘
//!        │
//!   GraphQL endpoint
//! ```

pub mod client;
pub mod error;
pub mod operations;
pub mod transport;
pub mod wire;

// Re-export commonly used types
pub use client::{CompteGateway, MutationData, QueryData, RemoteGateway};
pub use error::{GatewayError, Result, TransportError};
pub use operations::{CompteRequest, MutationSpec, QuerySpec, TransactionRequest};
pub use transport::{GraphqlTransport, http::HttpTransport};
pub use wire::{GraphqlRequest, GraphqlResponse, GraphqlResponseError};
