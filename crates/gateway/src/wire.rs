//! GraphQL wire envelope types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

/// Request envelope: fixed operation document plus its variables
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub query: &'static str,
    pub operation_name: &'static str,
    pub variables: Value,
}

impl GraphqlRequest {
    pub fn new(query: &'static str, operation_name: &'static str, variables: Value) -> Self {
        Self {
            query,
            operation_name,
            variables,
        }
    }
}

/// One entry of the server's `errors` array
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphqlResponseError {
    pub message: String,
}

/// Response envelope as returned by the endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphqlResponseError>,
}

impl GraphqlResponse {
    /// Build a data-only response (used by in-process service stand-ins)
    pub fn of_data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// Build an error-only response carrying one server message
    pub fn of_error(message: impl Into<String>) -> Self {
        Self {
            data: None,
            errors: vec![GraphqlResponseError {
                message: message.into(),
            }],
        }
    }

    /// Extract the data payload, surfacing server-reported errors verbatim
    pub fn into_data(self) -> Result<Value, GatewayError> {
        if !self.errors.is_empty() {
            let message = self
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(GatewayError::Server(message));
        }
        self.data
            .ok_or_else(|| GatewayError::Decode("response carried neither data nor errors".into()))
    }
}
