mod compte;
mod stats;
mod transaction;

pub use compte::{Compte, CompteId, CompteType};
pub use stats::TransactionStats;
pub use transaction::{CompteRef, Transaction, TransactionId, TransactionType};
