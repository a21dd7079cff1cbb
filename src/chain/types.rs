// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain types and constants.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Coin store holding the native gas coin.
pub const DEFAULT_COIN_STORE_TYPE: &str = "0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>";

/// Testnet full node REST endpoint.
pub const DEFAULT_NODE_URL: &str = "https://fullnode.testnet.aptoslabs.com/v1";

/// Public block explorer.
pub const DEFAULT_EXPLORER_URL: &str = "https://explorer.aptoslabs.com";

pub const DEFAULT_NETWORK: &str = "testnet";

/// Module publishing `record_memory_for` and `get_memories`.
pub const DEFAULT_MEMORY_MODULE: &str = "0x1::memory_vault";

/// Entry function the relayer calls on a user's behalf.
pub const RECORD_FUNCTION: &str = "record_memory_for";

/// View function returning an address's records.
pub const VIEW_FUNCTION: &str = "get_memories";

/// Network configuration for a Move chain reachable over REST.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name used in explorer links (e.g. `testnet`)
    pub network: String,
    /// Full node REST base URL, e.g. `https://.../v1`
    pub node_url: String,
    /// Block explorer base URL
    pub explorer_url: String,
    /// `<address>::<module>` holding the memory functions
    pub memory_module: String,
    /// Fully qualified coin store resource type
    pub coin_store_type: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            network: DEFAULT_NETWORK.to_string(),
            node_url: DEFAULT_NODE_URL.to_string(),
            explorer_url: DEFAULT_EXPLORER_URL.to_string(),
            memory_module: DEFAULT_MEMORY_MODULE.to_string(),
            coin_store_type: DEFAULT_COIN_STORE_TYPE.to_string(),
        }
    }
}

impl NetworkConfig {
    /// `<explorer>/txn/<hash>?network=<network>`
    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        format!(
            "{}/txn/{}?network={}",
            self.explorer_url.trim_end_matches('/'),
            tx_hash,
            self.network
        )
    }

    /// Node URL with `path` appended (path starts with `/`).
    pub fn node_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.node_url.trim_end_matches('/'), path)
    }

    pub fn record_function(&self) -> String {
        format!("{}::{}", self.memory_module, RECORD_FUNCTION)
    }

    pub fn view_function(&self) -> String {
        format!("{}::{}", self.memory_module, VIEW_FUNCTION)
    }
}

/// A memory record decoded from chain state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChainMemoryRecord {
    /// Locally generated; the chain carries no id.
    pub synthetic_id: String,
    pub title: String,
    pub content_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// What the relayer asks the chain to record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRecordCall {
    pub owner: String,
    pub title: String,
    pub content_hash: String,
    pub category: String,
}

/// A signed transaction the node accepted into its mempool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    pub tx_hash: String,
    /// Unix seconds; the node drops the transaction if it has not committed by then.
    pub expires_at_secs: i64,
}

/// A transaction the node accepted and executed successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    pub tx_hash: String,
    pub explorer_url: String,
}
