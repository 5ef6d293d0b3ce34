//! The fixed operation set of the remote contract
//!
//! Documents and field names are frozen: they must match the server schema
//! exactly. Each mutation declares, at definition time, the cached queries
//! it invalidates on success; targets that depend on runtime state (the
//! transaction list of the mutated compte) are parameterized by the
//! mutation's own variables.

use guichet_core::{CompteId, CompteType, TransactionType};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Value, json};

use crate::wire::GraphqlRequest;

const ALL_COMPTES: &str = r#"query GetAllComptes {
    allComptes {
        id
        solde
        dateCreation
        type
    }
}"#;

const COMPTE_BY_ID: &str = r#"query GetCompteById($id: ID!) {
    compteById(id: $id) {
        id
        solde
        dateCreation
        type
    }
}"#;

const FIND_BY_TYPE: &str = r#"query FindByType($type: TypeCompte!) {
    findByType(type: $type) {
        id
        solde
        dateCreation
        type
    }
}"#;

const COMPTE_TRANSACTIONS: &str = r#"query GetCompteTransactions($id: ID!) {
    compteTransactions(id: $id) {
        id
        montant
        date
        type
    }
}"#;

const TRANSACTION_STATS: &str = r#"query GetTransactionStats {
    transactionStats {
        count
        sumDepots
        sumRetraits
    }
}"#;

// The server schema exposes deletion with the `query` keyword; the document
// keeps that wire form, but the client only ever issues it as a mutation.
const DELETE_COMPTE: &str = r#"query DeleteCompte($id: ID!) {
    deleteCompte(id: $id) {
        id
        solde
        dateCreation
        type
    }
}"#;

const SAVE_COMPTE: &str = r#"mutation SaveCompte($compte: CompteRequest!) {
    saveCompte(compte: $compte) {
        id
        solde
        dateCreation
        type
    }
}"#;

const ADD_TRANSACTION: &str = r#"mutation AddTransaction($transaction: TransactionRequest!) {
    addTransaction(transaction: $transaction) {
        id
        montant
        date
        type
        compte {
            id
        }
    }
}"#;

/// Input object for `saveCompte`
#[derive(Debug, Clone, Serialize)]
pub struct CompteRequest {
    pub solde: Decimal,
    #[serde(rename = "type")]
    pub compte_type: CompteType,
}

/// Input object for `addTransaction`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub compte_id: CompteId,
    pub montant: Decimal,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
}

/// One of the fixed named queries
///
/// A `QuerySpec` doubles as the cache key for its result: operation
/// identity plus variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QuerySpec {
    AllComptes,
    CompteById { id: CompteId },
    FindByType { compte_type: CompteType },
    CompteTransactions { id: CompteId },
    TransactionStats,
}

impl QuerySpec {
    pub fn operation_name(&self) -> &'static str {
        match self {
            QuerySpec::AllComptes => "GetAllComptes",
            QuerySpec::CompteById { .. } => "GetCompteById",
            QuerySpec::FindByType { .. } => "FindByType",
            QuerySpec::CompteTransactions { .. } => "GetCompteTransactions",
            QuerySpec::TransactionStats => "GetTransactionStats",
        }
    }

    pub fn document(&self) -> &'static str {
        match self {
            QuerySpec::AllComptes => ALL_COMPTES,
            QuerySpec::CompteById { .. } => COMPTE_BY_ID,
            QuerySpec::FindByType { .. } => FIND_BY_TYPE,
            QuerySpec::CompteTransactions { .. } => COMPTE_TRANSACTIONS,
            QuerySpec::TransactionStats => TRANSACTION_STATS,
        }
    }

    /// Root field under `data` that carries this query's payload
    pub fn root_field(&self) -> &'static str {
        match self {
            QuerySpec::AllComptes => "allComptes",
            QuerySpec::CompteById { .. } => "compteById",
            QuerySpec::FindByType { .. } => "findByType",
            QuerySpec::CompteTransactions { .. } => "compteTransactions",
            QuerySpec::TransactionStats => "transactionStats",
        }
    }

    pub fn variables(&self) -> Value {
        match self {
            QuerySpec::AllComptes | QuerySpec::TransactionStats => json!({}),
            QuerySpec::CompteById { id } | QuerySpec::CompteTransactions { id } => {
                json!({ "id": id })
            }
            QuerySpec::FindByType { compte_type } => json!({ "type": compte_type }),
        }
    }

    pub fn request(&self) -> GraphqlRequest {
        GraphqlRequest::new(self.document(), self.operation_name(), self.variables())
    }
}

/// One of the fixed named mutations
///
/// `DeleteCompte` rides a wire-level `query` document, but invoking it
/// causes server-side deletion, so the client models it here.
#[derive(Debug, Clone)]
pub enum MutationSpec {
    SaveCompte(CompteRequest),
    AddTransaction(TransactionRequest),
    DeleteCompte { id: CompteId },
}

impl MutationSpec {
    pub fn operation_name(&self) -> &'static str {
        match self {
            MutationSpec::SaveCompte(_) => "SaveCompte",
            MutationSpec::AddTransaction(_) => "AddTransaction",
            MutationSpec::DeleteCompte { .. } => "DeleteCompte",
        }
    }

    pub fn document(&self) -> &'static str {
        match self {
            MutationSpec::SaveCompte(_) => SAVE_COMPTE,
            MutationSpec::AddTransaction(_) => ADD_TRANSACTION,
            MutationSpec::DeleteCompte { .. } => DELETE_COMPTE,
        }
    }

    /// Root field under `data` that carries this mutation's payload
    pub fn root_field(&self) -> &'static str {
        match self {
            MutationSpec::SaveCompte(_) => "saveCompte",
            MutationSpec::AddTransaction(_) => "addTransaction",
            MutationSpec::DeleteCompte { .. } => "deleteCompte",
        }
    }

    pub fn variables(&self) -> Value {
        match self {
            MutationSpec::SaveCompte(compte) => json!({ "compte": compte }),
            MutationSpec::AddTransaction(transaction) => json!({ "transaction": transaction }),
            MutationSpec::DeleteCompte { id } => json!({ "id": id }),
        }
    }

    pub fn request(&self) -> GraphqlRequest {
        GraphqlRequest::new(self.document(), self.operation_name(), self.variables())
    }

    /// Cached queries to invalidate when this mutation succeeds
    ///
    /// Every mutation touches the account list (balances or membership);
    /// adding a transaction additionally touches the history of the
    /// mutated compte.
    pub fn invalidates(&self) -> Vec<QuerySpec> {
        match self {
            MutationSpec::SaveCompte(_) | MutationSpec::DeleteCompte { .. } => {
                vec![QuerySpec::AllComptes]
            }
            MutationSpec::AddTransaction(transaction) => vec![
                QuerySpec::CompteTransactions {
                    id: transaction.compte_id.clone(),
                },
                QuerySpec::AllComptes,
            ],
        }
    }
}
