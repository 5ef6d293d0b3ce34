//! Transaction entry workflow
//!
//! Guards a submission with synchronous validation against the account
//! snapshot taken at selection time, then submits through the
//! coordinator so the dependent caches are invalidated on success.

use guichet_cache::QueryCache;
use guichet_core::{Compte, Transaction, TransactionType};
use guichet_gateway::{GatewayError, MutationData, MutationSpec, TransactionRequest};
use log::{info, warn};
use rust_decimal::Decimal;

use crate::error::{Result, WorkflowError};

/// Provisional transaction fields while the user fills the form
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    /// Raw text input; parsed only at submission
    pub montant: String,
    pub transaction_type: TransactionType,
}

impl Default for TransactionDraft {
    fn default() -> Self {
        Self {
            montant: String::new(),
            transaction_type: TransactionType::Depot,
        }
    }
}

/// Where the entry workflow currently stands
#[derive(Debug, Clone)]
pub enum EntryState {
    Idle,
    /// A target compte is designated and the draft is editable
    Selecting {
        compte: Compte,
        draft: TransactionDraft,
    },
    Submitting {
        compte: Compte,
        draft: TransactionDraft,
    },
    /// Submission failed; selection and draft are preserved so the user
    /// can retry without re-entering data
    Failed {
        compte: Compte,
        draft: TransactionDraft,
        message: String,
    },
}

pub struct TransactionEntry {
    cache: QueryCache,
    state: EntryState,
}

impl TransactionEntry {
    pub fn new(cache: QueryCache) -> Self {
        Self {
            cache,
            state: EntryState::Idle,
        }
    }

    pub fn state(&self) -> &EntryState {
        &self.state
    }

    /// Designate the target compte, snapshotting its balance for the
    /// withdrawal guard
    pub fn select(&mut self, compte: Compte) {
        self.state = EntryState::Selecting {
            compte,
            draft: TransactionDraft::default(),
        };
    }

    pub fn set_montant(&mut self, montant: impl Into<String>) {
        if let EntryState::Selecting { draft, .. } | EntryState::Failed { draft, .. } =
            &mut self.state
        {
            draft.montant = montant.into();
        }
    }

    pub fn set_type(&mut self, transaction_type: TransactionType) {
        if let EntryState::Selecting { draft, .. } | EntryState::Failed { draft, .. } =
            &mut self.state
        {
            draft.transaction_type = transaction_type;
        }
    }

    /// Abandon the entry, clearing selection and draft
    pub fn cancel(&mut self) {
        self.state = EntryState::Idle;
    }

    /// Validate and submit the draft
    ///
    /// Validation failures surface before any network call. Gateway
    /// failures land in `Failed` with the message preserved. On success
    /// the compte's history and the account list are invalidated by the
    /// mutation declaration and the workflow returns to idle.
    pub async fn submit(&mut self) -> Result<Transaction> {
        let (compte, draft) = match &self.state {
            EntryState::Selecting { compte, draft }
            | EntryState::Failed { compte, draft, .. } => (compte.clone(), draft.clone()),
            _ => return Err(WorkflowError::Validation("no compte selected".into())),
        };

        let montant = match validate(&compte, &draft) {
            Ok(montant) => montant,
            Err(e) => {
                warn!("transaction rejected client-side: {e}");
                self.state = EntryState::Failed {
                    compte,
                    draft,
                    message: e.to_string(),
                };
                return Err(e);
            }
        };

        self.state = EntryState::Submitting {
            compte: compte.clone(),
            draft: draft.clone(),
        };
        let request = TransactionRequest {
            compte_id: compte.id.clone(),
            montant,
            transaction_type: draft.transaction_type,
        };
        let outcome = self
            .cache
            .execute(MutationSpec::AddTransaction(request))
            .await
            .and_then(|data| match data {
                MutationData::Transaction(transaction) => Ok(transaction),
                other => Err(GatewayError::Decode(format!(
                    "unexpected payload for addTransaction: {other:?}"
                ))),
            });

        match outcome {
            Ok(transaction) => {
                info!(
                    "transaction {} ({:?} {}) added to compte {}",
                    transaction.id, transaction.transaction_type, transaction.montant, compte.id
                );
                self.state = EntryState::Idle;
                Ok(transaction)
            }
            Err(e) => {
                warn!("addTransaction failed: {e}");
                self.state = EntryState::Failed {
                    compte,
                    draft,
                    message: e.to_string(),
                };
                Err(e.into())
            }
        }
    }
}

fn validate(compte: &Compte, draft: &TransactionDraft) -> Result<Decimal> {
    let montant: Decimal = draft.montant.trim().parse().map_err(|_| {
        WorkflowError::Validation(format!("montant `{}` is not a number", draft.montant))
    })?;
    if montant <= Decimal::ZERO {
        return Err(WorkflowError::Validation("montant must be positive".into()));
    }
    // Best-effort guard against the selection-time balance; the server
    // remains authoritative
    if draft.transaction_type == TransactionType::Retrait && montant > compte.solde {
        return Err(WorkflowError::InsufficientFunds {
            solde: compte.solde,
            montant,
        });
    }
    Ok(montant)
}
