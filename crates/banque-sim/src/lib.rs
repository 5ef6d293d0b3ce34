//! Banque Sim
//!
//! In-memory stand-in for the remote GraphQL banking service. Implements
//! the client's transport trait directly: requests are dispatched on
//! operation name and answered from process-local state, so integration
//! tests can exercise the full client stack without a server.
//!
//! Semantics mirror the real service where the client depends on them:
//! server-assigned ids and timestamps, balance enforcement on
//! withdrawals, deletion through the wire-level `DeleteCompte` query,
//! and full stats recomputation on every request.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use guichet_core::{Compte, CompteId, CompteType, Transaction, TransactionType};
use guichet_gateway::{GraphqlRequest, GraphqlResponse, GraphqlTransport, TransportError};
use log::debug;
use rust_decimal::Decimal;
use serde_json::{Value, json};

#[derive(Default)]
struct BankState {
    comptes: Vec<Compte>,
    /// Transactions paired with their owning compte id, oldest first
    transactions: Vec<(CompteId, Transaction)>,
    next_compte_id: u64,
    next_transaction_id: u64,
}

struct SimInner {
    state: Mutex<BankState>,
    offline: AtomicBool,
    requests: AtomicU64,
}

/// The simulated bank; cheap to clone, all clones share one state
#[derive(Clone)]
pub struct BankSim {
    inner: Arc<SimInner>,
}

impl Default for BankSim {
    fn default() -> Self {
        Self::new()
    }
}

impl BankSim {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SimInner {
                state: Mutex::new(BankState::default()),
                offline: AtomicBool::new(false),
                requests: AtomicU64::new(0),
            }),
        }
    }

    /// While offline, every request fails with a connection error
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Total requests seen, including ones rejected while offline
    pub fn requests(&self) -> u64 {
        self.inner.requests.load(Ordering::SeqCst)
    }

    /// Server-side view of one compte, for asserting state in tests
    pub fn compte(&self, id: &str) -> Option<Compte> {
        self.inner
            .state
            .lock()
            .unwrap()
            .comptes
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    fn handle(&self, request: &GraphqlRequest) -> GraphqlResponse {
        let vars = &request.variables;
        let mut guard = self.inner.state.lock().unwrap();
        let state = &mut *guard;
        match request.operation_name {
            "GetAllComptes" => GraphqlResponse::of_data(json!({
                "allComptes": comptes_json(state.comptes.iter())
            })),
            "GetCompteById" => match find_compte(&state, vars) {
                Some(compte) => GraphqlResponse::of_data(json!({ "compteById": compte_json(compte) })),
                None => compte_introuvable(vars),
            },
            "FindByType" => match parse_type(&vars["type"]) {
                Some(compte_type) => GraphqlResponse::of_data(json!({
                    "findByType": comptes_json(
                        state.comptes.iter().filter(|c| c.compte_type == compte_type),
                    )
                })),
                None => GraphqlResponse::of_error("Type de compte invalide"),
            },
            "GetCompteTransactions" => {
                let Some(id) = vars["id"].as_str() else {
                    return compte_introuvable(vars);
                };
                let transactions = state
                    .transactions
                    .iter()
                    .filter(|(owner, _)| owner == id)
                    .map(|(_, t)| transaction_json(t))
                    .collect::<Vec<_>>();
                GraphqlResponse::of_data(json!({ "compteTransactions": transactions }))
            }
            "GetTransactionStats" => {
                let sum = |kind: TransactionType| -> Decimal {
                    state
                        .transactions
                        .iter()
                        .filter(|(_, t)| t.transaction_type == kind)
                        .map(|(_, t)| t.montant)
                        .sum()
                };
                GraphqlResponse::of_data(json!({ "transactionStats": {
                    "count": state.transactions.len(),
                    "sumDepots": sum(TransactionType::Depot),
                    "sumRetraits": sum(TransactionType::Retrait),
                }}))
            }
            "DeleteCompte" => {
                let Some(position) = vars["id"]
                    .as_str()
                    .and_then(|id| state.comptes.iter().position(|c| c.id == id))
                else {
                    return compte_introuvable(vars);
                };
                let compte = state.comptes.remove(position);
                GraphqlResponse::of_data(json!({ "deleteCompte": compte_json(&compte) }))
            }
            "SaveCompte" => {
                let input = &vars["compte"];
                let (Some(solde), Some(compte_type)) =
                    (parse_decimal(&input["solde"]), parse_type(&input["type"]))
                else {
                    return GraphqlResponse::of_error("Requête de compte invalide");
                };
                state.next_compte_id += 1;
                let compte = Compte {
                    id: state.next_compte_id.to_string(),
                    solde,
                    date_creation: Utc::now(),
                    compte_type,
                };
                state.comptes.push(compte.clone());
                GraphqlResponse::of_data(json!({ "saveCompte": compte_json(&compte) }))
            }
            "AddTransaction" => {
                let input = &vars["transaction"];
                let (Some(compte_id), Some(montant), Some(transaction_type)) = (
                    input["compteId"].as_str(),
                    parse_decimal(&input["montant"]),
                    parse_transaction_type(&input["type"]),
                ) else {
                    return GraphqlResponse::of_error("Requête de transaction invalide");
                };
                let Some(compte) = state.comptes.iter_mut().find(|c| c.id == compte_id) else {
                    return GraphqlResponse::of_error(format!(
                        "Compte introuvable : {compte_id}"
                    ));
                };
                match transaction_type {
                    TransactionType::Retrait if montant > compte.solde => {
                        return GraphqlResponse::of_error(format!(
                            "Solde insuffisant pour le retrait : solde {}, montant {montant}",
                            compte.solde
                        ));
                    }
                    TransactionType::Retrait => compte.solde -= montant,
                    TransactionType::Depot => compte.solde += montant,
                }
                let owner = compte.id.clone();
                state.next_transaction_id += 1;
                let transaction = Transaction {
                    id: state.next_transaction_id.to_string(),
                    montant,
                    date: Utc::now(),
                    transaction_type,
                    compte: None,
                };
                let response = json!({ "addTransaction": {
                    "id": transaction.id,
                    "montant": transaction.montant,
                    "date": transaction.date,
                    "type": transaction.transaction_type,
                    "compte": { "id": owner },
                }});
                state.transactions.push((owner, transaction));
                GraphqlResponse::of_data(response)
            }
            other => GraphqlResponse::of_error(format!("Opération inconnue : {other}")),
        }
    }
}

#[async_trait]
impl GraphqlTransport for BankSim {
    async fn send(&self, request: &GraphqlRequest) -> Result<GraphqlResponse, TransportError> {
        self.inner.requests.fetch_add(1, Ordering::SeqCst);
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Connect("connection refused".into()));
        }
        debug!("handling {}", request.operation_name);
        Ok(self.handle(request))
    }
}

fn find_compte<'a>(state: &'a BankState, vars: &Value) -> Option<&'a Compte> {
    let id = vars["id"].as_str()?;
    state.comptes.iter().find(|c| c.id == id)
}

fn compte_introuvable(vars: &Value) -> GraphqlResponse {
    GraphqlResponse::of_error(format!(
        "Compte introuvable : {}",
        vars["id"].as_str().unwrap_or("?")
    ))
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    serde_json::from_value(value.clone()).ok()
}

fn parse_type(value: &Value) -> Option<CompteType> {
    serde_json::from_value(value.clone()).ok()
}

fn parse_transaction_type(value: &Value) -> Option<TransactionType> {
    serde_json::from_value(value.clone()).ok()
}

fn compte_json(compte: &Compte) -> Value {
    json!({
        "id": compte.id,
        "solde": compte.solde,
        "dateCreation": compte.date_creation,
        "type": compte.compte_type,
    })
}

fn comptes_json<'a>(comptes: impl Iterator<Item = &'a Compte>) -> Value {
    Value::Array(comptes.map(compte_json).collect())
}

fn transaction_json(transaction: &Transaction) -> Value {
    json!({
        "id": transaction.id,
        "montant": transaction.montant,
        "date": transaction.date,
        "type": transaction.transaction_type,
    })
}
