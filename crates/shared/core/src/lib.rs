//! Guichet Core Domain
//!
//! Pure domain types for the Guichet banking client.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;

// Re-export commonly used types at crate root
pub use entities::{
    Compte, CompteId, CompteRef, CompteType, Transaction, TransactionId, TransactionStats,
    TransactionType,
};
