//! Guichet Query Cache
//!
//! Client-side state synchronization over the remote gateway. The cache
//! holds the latest result of each distinct query, keyed by operation
//! identity plus variables, and re-executes the queries a mutation
//! declares as invalidated, keeping independently-cached results (account
//! list, per-account history, stats) coherent.
//!
//! ## Architecture
//!
//! ```text
//! View-models ──subscribe──► ┌──────────────────────────────────┐
//!                            │           QueryCache             │
//! Workflows ───fetch/────►   │  per-key slot:                   │
//!           execute(mutation)│   watch<QuerySnapshot>           │
//!                            │   issued/applied sequence numbers│
//!                            │   staleness + in-flight tracking │
//!                            └───────────────┬──────────────────┘
//!                                            │ QuerySpec / MutationSpec
//!                                            ▼
//!                                      RemoteGateway
//! ```
//!
//! Ordering guarantee: per key, completions are applied in completion
//! order; a completion whose sequence number is not newer than the last
//! applied one is discarded, so a slow stale request never overwrites a
//! newer cached value.

mod coordinator;
mod snapshot;

pub use coordinator::QueryCache;
pub use snapshot::QuerySnapshot;
