//! Typed GraphQL client for the compte service
//!
//! `CompteGateway` turns operation specs into wire requests and decodes the
//! response root field into typed payloads. It performs no caching and no
//! retries; coordination lives in `guichet-cache`.

use async_trait::async_trait;
use guichet_core::{Compte, Transaction, TransactionStats};
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{GatewayError, Result};
use crate::operations::{MutationSpec, QuerySpec};
use crate::transport::GraphqlTransport;
use crate::wire::GraphqlRequest;

/// Typed result of a query operation
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    Comptes(Vec<Compte>),
    Compte(Compte),
    Transactions(Vec<Transaction>),
    Stats(TransactionStats),
}

impl QueryData {
    pub fn as_comptes(&self) -> Option<&[Compte]> {
        match self {
            QueryData::Comptes(comptes) => Some(comptes),
            _ => None,
        }
    }

    pub fn as_compte(&self) -> Option<&Compte> {
        match self {
            QueryData::Compte(compte) => Some(compte),
            _ => None,
        }
    }

    pub fn as_transactions(&self) -> Option<&[Transaction]> {
        match self {
            QueryData::Transactions(transactions) => Some(transactions),
            _ => None,
        }
    }

    pub fn as_stats(&self) -> Option<&TransactionStats> {
        match self {
            QueryData::Stats(stats) => Some(stats),
            _ => None,
        }
    }
}

/// Typed result of a mutation operation
#[derive(Debug, Clone, PartialEq)]
pub enum MutationData {
    Compte(Compte),
    Transaction(Transaction),
}

/// Executes operation specs against the remote service
///
/// The seam between the cache/workflows and the concrete client; tests
/// substitute scripted implementations.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn query(&self, spec: &QuerySpec) -> Result<QueryData>;
    async fn mutate(&self, spec: &MutationSpec) -> Result<MutationData>;
}

/// Gateway over a concrete transport
pub struct CompteGateway<T> {
    transport: T,
}

impl<T: GraphqlTransport> CompteGateway<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    async fn execute(&self, request: GraphqlRequest, root_field: &str) -> Result<Value> {
        debug!("executing {}", request.operation_name);
        let response = self.transport.send(&request).await?;
        let mut data = response.into_data()?;
        data.get_mut(root_field).map(Value::take).ok_or_else(|| {
            GatewayError::Decode(format!("missing field `{root_field}` in response data"))
        })
    }
}

fn decode<D: DeserializeOwned>(value: Value) -> Result<D> {
    serde_json::from_value(value).map_err(|e| GatewayError::Decode(e.to_string()))
}

#[async_trait]
impl<T: GraphqlTransport> RemoteGateway for CompteGateway<T> {
    async fn query(&self, spec: &QuerySpec) -> Result<QueryData> {
        let value = self.execute(spec.request(), spec.root_field()).await?;
        Ok(match spec {
            QuerySpec::AllComptes | QuerySpec::FindByType { .. } => {
                QueryData::Comptes(decode(value)?)
            }
            QuerySpec::CompteById { .. } => QueryData::Compte(decode(value)?),
            QuerySpec::CompteTransactions { .. } => QueryData::Transactions(decode(value)?),
            QuerySpec::TransactionStats => QueryData::Stats(decode(value)?),
        })
    }

    async fn mutate(&self, spec: &MutationSpec) -> Result<MutationData> {
        let value = self.execute(spec.request(), spec.root_field()).await?;
        Ok(match spec {
            MutationSpec::SaveCompte(_) | MutationSpec::DeleteCompte { .. } => {
                MutationData::Compte(decode(value)?)
            }
            MutationSpec::AddTransaction(_) => MutationData::Transaction(decode(value)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::operations::TransactionRequest;
    use crate::wire::GraphqlResponse;
    use guichet_core::{CompteType, TransactionType};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Transport returning canned responses, recording every request
    struct StubTransport {
        responses: Mutex<VecDeque<std::result::Result<GraphqlResponse, TransportError>>>,
        seen: Mutex<Vec<(String, Value)>>,
    }

    impl StubTransport {
        fn returning(
            responses: Vec<std::result::Result<GraphqlResponse, TransportError>>,
        ) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GraphqlTransport for StubTransport {
        async fn send(
            &self,
            request: &GraphqlRequest,
        ) -> std::result::Result<GraphqlResponse, TransportError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.operation_name.to_string(), request.variables.clone()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request")
        }
    }

    #[tokio::test]
    async fn test_query_decodes_compte_list() {
        let transport = StubTransport::returning(vec![Ok(GraphqlResponse::of_data(json!({
            "allComptes": [
                {"id": "1", "solde": "250.75", "dateCreation": "2024-01-05T09:30:00Z", "type": "COURANT"},
                {"id": "2", "solde": 40, "dateCreation": "2024-02-01T00:00:00Z", "type": "EPARGNE"},
            ]
        })))]);
        let gateway = CompteGateway::new(transport);

        let data = gateway.query(&QuerySpec::AllComptes).await.unwrap();
        let comptes = data.as_comptes().unwrap();
        assert_eq!(comptes.len(), 2);
        assert_eq!(comptes[0].solde, dec!(250.75));
        assert_eq!(comptes[1].compte_type, CompteType::Epargne);
    }

    #[tokio::test]
    async fn test_empty_filtered_list_is_data_not_error() {
        let transport = StubTransport::returning(vec![Ok(GraphqlResponse::of_data(
            json!({ "findByType": [] }),
        ))]);
        let gateway = CompteGateway::new(transport);

        let data = gateway
            .query(&QuerySpec::FindByType {
                compte_type: CompteType::Epargne,
            })
            .await
            .unwrap();
        assert_eq!(data.as_comptes().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_server_errors_surface_verbatim() {
        let transport = StubTransport::returning(vec![Ok(GraphqlResponse::of_error(
            "Compte introuvable : 42",
        ))]);
        let gateway = CompteGateway::new(transport);

        let err = gateway
            .query(&QuerySpec::CompteById { id: "42".into() })
            .await
            .unwrap_err();
        match err {
            GatewayError::Server(message) => assert_eq!(message, "Compte introuvable : 42"),
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_errors_pass_through() {
        let transport = StubTransport::returning(vec![Err(TransportError::Connect(
            "connection refused".into(),
        ))]);
        let gateway = CompteGateway::new(transport);

        let err = gateway.query(&QuerySpec::TransactionStats).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[tokio::test]
    async fn test_missing_root_field_is_decode_error() {
        let transport =
            StubTransport::returning(vec![Ok(GraphqlResponse::of_data(json!({})))]);
        let gateway = CompteGateway::new(transport);

        let err = gateway.query(&QuerySpec::AllComptes).await.unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[tokio::test]
    async fn test_mutation_sends_schema_shaped_envelope() {
        let transport = StubTransport::returning(vec![Ok(GraphqlResponse::of_data(json!({
            "addTransaction": {
                "id": "t-1",
                "montant": "50",
                "date": "2024-03-01T12:00:00Z",
                "type": "DEPOT",
                "compte": {"id": "3"},
            }
        })))]);
        let gateway = CompteGateway::new(transport);

        let spec = MutationSpec::AddTransaction(TransactionRequest {
            compte_id: "3".into(),
            montant: dec!(50),
            transaction_type: TransactionType::Depot,
        });
        let data = gateway.mutate(&spec).await.unwrap();

        match data {
            MutationData::Transaction(transaction) => {
                assert_eq!(transaction.montant, dec!(50));
                assert_eq!(transaction.compte.unwrap().id, "3");
            }
            other => panic!("expected transaction payload, got {other:?}"),
        }

        let seen = gateway.transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "AddTransaction");
        assert_eq!(
            seen[0].1,
            json!({ "transaction": { "compteId": "3", "montant": "50", "type": "DEPOT" } })
        );
    }
}
