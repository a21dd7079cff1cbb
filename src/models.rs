// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the REST API. Every success body is an
//! [`ApiResponse`] envelope `{success, message?, data}`; failures use
//! [`crate::error::ErrorBody`].
//!
//! ## Model Categories
//!
//! - **Auth**: challenge issuance, verification and account linking
//! - **Relay**: sponsored memory submission and history
//! - **Accounts**: balance and on-chain memory reads

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::ChallengeMode;
use crate::chain::ChainMemoryRecord;
use crate::storage::RelayRecord;

// =============================================================================
// Envelope
// =============================================================================

/// Success envelope shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Always `true`.
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

// =============================================================================
// Auth Models
// =============================================================================

/// Query for `GET /v1/auth/challenge`.
#[derive(Debug, Clone, Deserialize, ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChallengeQuery {
    /// Wallet address that will sign the challenge.
    pub address: String,
    /// `authenticate` (default) or `link`.
    #[serde(default)]
    pub mode: ChallengeMode,
}

/// Issued session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    /// Bearer token for authenticated endpoints.
    pub token: String,
    /// Address the token is bound to.
    pub address: String,
    /// Unix seconds.
    pub expires_at: i64,
}

/// Result of linking a second wallet to the session's account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkData {
    /// Address of the authenticated session.
    pub account: String,
    /// Address proven by the link signature.
    pub linked_address: String,
}

// =============================================================================
// Relay Models
// =============================================================================

/// Transaction reference for a relayed memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TxInfo {
    pub hash: String,
    pub explorer_url: String,
}

/// Body of a successful relay.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RelayData {
    pub memory: RelayRecord,
    pub tx: TxInfo,
}

impl From<RelayRecord> for RelayData {
    fn from(record: RelayRecord) -> Self {
        let tx = TxInfo {
            hash: record.tx_hash.clone(),
            explorer_url: record.explorer_url.clone(),
        };
        Self { memory: record, tx }
    }
}

/// Relays recorded for the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RelayListData {
    pub relays: Vec<RelayRecord>,
    pub total: usize,
}

// =============================================================================
// Account Models
// =============================================================================

/// Native coin balance in the smallest unit.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceData {
    pub address: String,
    pub balance: u64,
}

/// Memories decoded from chain state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MemoriesData {
    pub address: String,
    pub memories: Vec<ChainMemoryRecord>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn envelope_omits_absent_message() {
        let json = serde_json::to_value(ApiResponse::ok(1)).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": 1}));

        let json = serde_json::to_value(ApiResponse::with_message("done", 2)).unwrap();
        assert_eq!(json["message"], "done");
    }

    #[test]
    fn relay_data_shape() {
        let record = RelayRecord {
            address: "0xabc".to_string(),
            content_hash: "bafy".to_string(),
            title: "t".to_string(),
            category: String::new(),
            tx_hash: "0xfeed".to_string(),
            explorer_url: "https://explorer/txn/0xfeed".to_string(),
            relayed_at: Utc::now(),
        };
        let json = serde_json::to_value(RelayData::from(record)).unwrap();
        assert_eq!(json["tx"]["hash"], "0xfeed");
        assert_eq!(json["tx"]["explorerUrl"], "https://explorer/txn/0xfeed");
        assert_eq!(json["memory"]["contentHash"], "bafy");
    }

    #[test]
    fn challenge_query_defaults_to_authenticate() {
        let q: ChallengeQuery = serde_json::from_value(serde_json::json!({"address": "0x1"})).unwrap();
        assert_eq!(q.mode, ChallengeMode::Authenticate);
    }
}
