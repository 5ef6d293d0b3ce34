//! Account management workflow
//!
//! Create and delete comptes, and read per-compte details and history.
//! Deletion is unconditional once called: confirming with the user first
//! is the caller's concern.

use guichet_cache::{QueryCache, QuerySnapshot};
use guichet_core::{Compte, CompteId, CompteType, Transaction};
use guichet_gateway::{
    CompteRequest, GatewayError, MutationData, MutationSpec, QueryData, QuerySpec,
};
use log::info;
use rust_decimal::Decimal;

use crate::error::{Result, WorkflowError};

pub struct CompteAdmin {
    cache: QueryCache,
}

impl CompteAdmin {
    pub fn new(cache: QueryCache) -> Self {
        Self { cache }
    }

    /// Create a compte from raw form input
    ///
    /// The opening balance arrives as text; anything non-numeric fails
    /// before the network is touched. Success invalidates the account
    /// list. No undo.
    pub async fn create_compte(&self, solde: &str, compte_type: CompteType) -> Result<Compte> {
        let solde: Decimal = solde
            .trim()
            .parse()
            .map_err(|_| WorkflowError::Validation(format!("solde `{solde}` is not a number")))?;
        let request = CompteRequest { solde, compte_type };
        match self.cache.execute(MutationSpec::SaveCompte(request)).await? {
            MutationData::Compte(compte) => {
                info!(
                    "compte {} created ({:?}, solde {})",
                    compte.id, compte.compte_type, compte.solde
                );
                Ok(compte)
            }
            other => Err(GatewayError::Decode(format!(
                "unexpected payload for saveCompte: {other:?}"
            ))
            .into()),
        }
    }

    /// Delete a compte; unconditional once called
    ///
    /// Whether a compte with existing transactions may be deleted is
    /// server policy; no pre-check happens here. Success invalidates the
    /// account list.
    pub async fn delete_compte(&self, id: &CompteId) -> Result<Compte> {
        match self
            .cache
            .execute(MutationSpec::DeleteCompte { id: id.clone() })
            .await?
        {
            MutationData::Compte(compte) => {
                info!("compte {} deleted", compte.id);
                Ok(compte)
            }
            other => Err(GatewayError::Decode(format!(
                "unexpected payload for deleteCompte: {other:?}"
            ))
            .into()),
        }
    }

    /// Transaction history of one compte
    pub async fn compte_transactions(&self, id: &CompteId) -> Result<Vec<Transaction>> {
        let snapshot = self
            .cache
            .fetch(QuerySpec::CompteTransactions { id: id.clone() })
            .await;
        settle(snapshot, |data| match data {
            QueryData::Transactions(transactions) => Some(transactions),
            _ => None,
        })
    }

    /// Look up one compte
    pub async fn compte_by_id(&self, id: &CompteId) -> Result<Compte> {
        let snapshot = self.cache.fetch(QuerySpec::CompteById { id: id.clone() }).await;
        settle(snapshot, |data| match data {
            QueryData::Compte(compte) => Some(compte),
            _ => None,
        })
    }
}

fn settle<T>(snapshot: QuerySnapshot, extract: impl FnOnce(QueryData) -> Option<T>) -> Result<T> {
    if let Some(data) = snapshot.data {
        return extract(data)
            .ok_or_else(|| WorkflowError::Query("unexpected query payload".into()));
    }
    Err(WorkflowError::Query(
        snapshot.error.unwrap_or_else(|| "no result".into()),
    ))
}
