//! HTTP transport over reqwest
//!
//! POSTs the standard `{query, operationName, variables}` JSON envelope to
//! a single configured endpoint.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use url::Url;

use super::GraphqlTransport;
use crate::error::TransportError;
use crate::wire::{GraphqlRequest, GraphqlResponse};

/// GraphQL-over-HTTP transport
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }

    /// Use a caller-configured reqwest client
    pub fn with_client(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl GraphqlTransport for HttpTransport {
    async fn send(&self, request: &GraphqlRequest) -> Result<GraphqlResponse, TransportError> {
        debug!("POST {} ({})", self.endpoint, request.operation_name);

        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    TransportError::Connect(e.to_string())
                } else {
                    TransportError::Http(e.to_string())
                }
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| TransportError::Http(format!("malformed response body: {e}")))
    }
}
