// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sponsored transaction submission.
//!
//! The relayer account is the transaction sender and pays the gas. The user's
//! address is passed as the `owner` argument of `record_memory_for`, so the
//! user never needs funds.
//!
//! Submission flow:
//! 1. Read the relayer's sequence number and the gas price estimate
//! 2. Ask the node to encode the signing message (`encode_submission`)
//! 3. Sign it with the relayer key
//! 4. `POST /transactions`; the node now owns the transaction
//! 5. Wait for the committed result (a separate step, so the caller can
//!    persist the hash in between and resume waiting later)

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::client::{ChainError, NodeClient};
use super::types::{MemoryRecordCall, PendingSubmission, SubmitResult};
use crate::storage::RelayerAccount;

/// Gas ceiling for a single `record_memory_for` call.
pub const MAX_GAS_AMOUNT: u64 = 20_000;

/// Seconds until an unsubmitted transaction becomes invalid.
pub const EXPIRATION_SECS: i64 = 60;

/// Delay between `by_hash` polls once `wait_by_hash` returns pending.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Polls after the long-poll before giving up.
const MAX_POLLS: usize = 40;

/// Seam between the relay coordinator and the chain.
#[async_trait]
pub trait ChainSubmitter: Send + Sync {
    /// Sign and submit a sponsored `record_memory_for`. Returns once the node
    /// has accepted it; an `Err` means nothing reached the mempool.
    async fn submit_memory(&self, call: &MemoryRecordCall) -> Result<PendingSubmission, ChainError>;

    /// Wait for an accepted transaction to commit and check it succeeded.
    async fn await_commit(&self, tx_hash: &str) -> Result<SubmitResult, ChainError>;
}

/// Submits through a full node's REST API, signing with the relayer key.
pub struct NodeSubmitter {
    node: NodeClient,
    relayer: RelayerAccount,
    /// Held from sequence-number read until the node accepts the transaction.
    sequence_lock: Mutex<()>,
}

impl NodeSubmitter {
    pub fn new(node: NodeClient, relayer: RelayerAccount) -> Self {
        Self {
            node,
            relayer,
            sequence_lock: Mutex::new(()),
        }
    }

    pub fn relayer_address(&self) -> &str {
        self.relayer.address()
    }

    fn entry_payload(&self, call: &MemoryRecordCall) -> Value {
        json!({
            "type": "entry_function_payload",
            "function": self.node.network().record_function(),
            "type_arguments": [],
            "arguments": [call.owner, call.title, call.content_hash, call.category],
        })
    }

    /// Build, sign and submit. Returns the pending transaction hash.
    async fn sign_and_submit(&self, call: &MemoryRecordCall) -> Result<PendingSubmission, ChainError> {
        let _guard = self.sequence_lock.lock().await;

        let sequence_number = self.node.sequence_number(self.relayer.address()).await?;
        let gas_unit_price = self.node.gas_price().await?;
        let expiration = chrono::Utc::now().timestamp() + EXPIRATION_SECS;

        let mut txn = json!({
            "sender": self.relayer.address(),
            "sequence_number": sequence_number.to_string(),
            "max_gas_amount": MAX_GAS_AMOUNT.to_string(),
            "gas_unit_price": gas_unit_price.to_string(),
            "expiration_timestamp_secs": expiration.to_string(),
            "payload": self.entry_payload(call),
        });

        let encoded = self.node.post("/transactions/encode_submission", &txn).await?;
        let signing_message = encoded
            .as_str()
            .and_then(|s| hex::decode(s.trim_start_matches("0x")).ok())
            .ok_or_else(|| ChainError::Decode("encode_submission did not return hex".to_string()))?;

        let signature = self.relayer.sign(&signing_message);
        txn["signature"] = json!({
            "type": "ed25519_signature",
            "public_key": format!("0x{}", self.relayer.public_key_hex()),
            "signature": format!("0x{}", hex::encode(signature.to_bytes())),
        });

        let pending = self.node.post("/transactions", &txn).await?;
        let hash = pending
            .get("hash")
            .and_then(Value::as_str)
            .ok_or_else(|| ChainError::Decode("submission response missing hash".to_string()))?
            .to_string();

        tracing::info!(
            tx_hash = %hash,
            sequence_number,
            owner = %call.owner,
            "Submitted sponsored transaction"
        );
        Ok(PendingSubmission {
            tx_hash: hash,
            expires_at_secs: expiration,
        })
    }

    async fn fetch_transaction(&self, path: &str, hash: &str) -> Result<Value, ChainError> {
        match self.node.get(path).await {
            Err(ChainError::Upstream { status: 404, .. }) => Err(ChainError::Dropped(hash.to_string())),
            other => other,
        }
    }

    /// Wait until the transaction is committed, then check it succeeded.
    async fn wait_for_commit(&self, hash: &str) -> Result<(), ChainError> {
        let mut txn = self
            .fetch_transaction(&format!("/transactions/wait_by_hash/{hash}"), hash)
            .await?;

        let mut polls = 0;
        while is_pending(&txn) {
            if polls >= MAX_POLLS {
                return Err(ChainError::Timeout(hash.to_string()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            txn = self
                .fetch_transaction(&format!("/transactions/by_hash/{hash}"), hash)
                .await?;
            polls += 1;
        }

        check_committed(hash, &txn)
    }
}

fn is_pending(txn: &Value) -> bool {
    txn.get("type").and_then(Value::as_str) == Some("pending_transaction")
}

/// A committed transaction must report `success: true`.
fn check_committed(hash: &str, txn: &Value) -> Result<(), ChainError> {
    if txn.get("success").and_then(Value::as_bool) == Some(true) {
        return Ok(());
    }
    let vm_status = txn
        .get("vm_status")
        .and_then(Value::as_str)
        .unwrap_or("unknown VM status")
        .to_string();
    Err(ChainError::Execution {
        hash: hash.to_string(),
        vm_status,
    })
}

#[async_trait]
impl ChainSubmitter for NodeSubmitter {
    async fn submit_memory(&self, call: &MemoryRecordCall) -> Result<PendingSubmission, ChainError> {
        self.sign_and_submit(call).await
    }

    async fn await_commit(&self, tx_hash: &str) -> Result<SubmitResult, ChainError> {
        self.wait_for_commit(tx_hash).await?;
        Ok(SubmitResult {
            explorer_url: self.node.network().explorer_tx_url(tx_hash),
            tx_hash: tx_hash.to_string(),
        })
    }
}
