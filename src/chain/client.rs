// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! REST client for a Move full node.
//!
//! Thin wrapper over `reqwest` that turns non-2xx responses into
//! [`ChainError::Upstream`] carrying the node's own error message.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::types::NetworkConfig;

/// Per-request timeout for node calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur talking to the node.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChainError {
    #[error("Chain node unavailable: {0}")]
    Unavailable(String),

    #[error("Chain node returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Unexpected node response: {0}")]
    Decode(String),

    #[error("Transaction {hash} failed: {vm_status}")]
    Execution { hash: String, vm_status: String },

    #[error("Timed out waiting for transaction {0}")]
    Timeout(String),

    /// The node has no record of the transaction.
    #[error("Transaction {0} is unknown to the node")]
    Dropped(String),
}

impl ChainError {
    /// Message suitable to hand back to a relay caller.
    pub fn upstream_message(&self) -> String {
        match self {
            ChainError::Upstream { message, .. } => message.clone(),
            ChainError::Execution { vm_status, .. } => vm_status.clone(),
            ChainError::Unavailable(_) => "Failed to reach the chain node".to_string(),
            ChainError::Decode(_) => "Unexpected response from the chain node".to_string(),
            ChainError::Timeout(_) => "Timed out waiting for transaction confirmation".to_string(),
            ChainError::Dropped(_) => "Transaction was dropped before it committed".to_string(),
        }
    }
}

/// Pull a human-readable message out of a node error body.
///
/// Nodes answer `{"message": "...", "error_code": "...", "vm_error_code": ...}`.
pub fn extract_upstream_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(json) => json
            .get("message")
            .or_else(|| json.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string),
        Err(_) if trimmed.len() <= 512 => Some(trimmed.to_string()),
        Err(_) => None,
    }
}

/// Numbers the node renders either as JSON numbers or decimal strings.
pub fn parse_u64_field(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Full node REST client.
#[derive(Debug, Clone)]
pub struct NodeClient {
    network: NetworkConfig,
    http: Client,
}

impl NodeClient {
    pub fn new(network: NetworkConfig) -> Result<Self, ChainError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChainError::Unavailable(e.to_string()))?;
        Ok(Self { network, http })
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    async fn handle(response: reqwest::Response) -> Result<Value, ChainError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_upstream_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(ChainError::Upstream {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| ChainError::Decode(e.to_string()))
    }

    /// `GET <node><path>`
    pub async fn get(&self, path: &str) -> Result<Value, ChainError> {
        let response = self
            .http
            .get(self.network.node_endpoint(path))
            .send()
            .await
            .map_err(|e| ChainError::Unavailable(e.to_string()))?;
        Self::handle(response).await
    }

    /// `POST <node><path>` with a JSON body.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ChainError> {
        let response = self
            .http
            .post(self.network.node_endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ChainError::Unavailable(e.to_string()))?;
        Self::handle(response).await
    }

    /// Chain id from the ledger info at `GET /`.
    pub async fn chain_id(&self) -> Result<u8, ChainError> {
        let info = self.get("/").await?;
        info.get("chain_id")
            .and_then(parse_u64_field)
            .and_then(|id| u8::try_from(id).ok())
            .ok_or_else(|| ChainError::Decode("ledger info missing chain_id".to_string()))
    }

    /// Next sequence number for `address`.
    pub async fn sequence_number(&self, address: &str) -> Result<u64, ChainError> {
        let account = self.get(&format!("/accounts/{address}")).await?;
        account
            .get("sequence_number")
            .and_then(parse_u64_field)
            .ok_or_else(|| ChainError::Decode("account missing sequence_number".to_string()))
    }

    /// Current gas unit price estimate.
    pub async fn gas_price(&self) -> Result<u64, ChainError> {
        let estimate = self.get("/estimate_gas_price").await?;
        estimate
            .get("gas_estimate")
            .and_then(parse_u64_field)
            .ok_or_else(|| ChainError::Decode("missing gas_estimate".to_string()))
    }

    /// Node is reachable and reports a chain id.
    pub async fn health_check(&self) -> Result<(), ChainError> {
        self.chain_id().await.map(|_| ())
    }
}
