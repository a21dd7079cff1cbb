// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-then-relay coordination.
//!
//! ```text
//! verify signature ─► validate fields ─► lock address ─► ledger lookup
//!                                                          │
//!                recorded: return prior result ◄───────────┤
//!                                                          ▼
//!                        pending hash recorded? ── no ─► submit ─► record pending
//!                                   │ yes                                 │
//!                                   ▼                                     │
//!                            wait for commit ◄────────────────────────────┘
//!                                   ▼
//!                       record ─► invalidate cache
//! ```
//!
//! A bad signature returns before anything touches the chain or the ledger.
//! Once the node accepts a transaction its hash is kept until it commits or
//! can never commit, so a retried relay waits on it instead of paying again.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use super::locks::AddressLocks;
use super::payload::RelayPayload;
use crate::audit_log;
use crate::auth::AuthToken;
use crate::chain::{ChainError, ChainStateReader, ChainSubmitter, MemoryRecordCall};
use crate::storage::{
    AuditEvent, AuditEventType, EncryptedStorage, LedgerError, PendingRelay, RelayLedger,
    RelayRecord,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("Signature does not match the authenticated wallet")]
    SignatureInvalid,

    #[error("Invalid memory descriptor: {0}")]
    Validation(String),

    /// Chain submission failed; carries the node's message when it had one.
    #[error("{0}")]
    RelayFailed(String),

    #[error("Relay ledger error: {0}")]
    Ledger(String),
}

impl From<LedgerError> for RelayError {
    fn from(err: LedgerError) -> Self {
        RelayError::Ledger(err.to_string())
    }
}

/// Result of a relay request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    pub record: RelayRecord,
    /// `true` when the record came from an earlier relay of the same content.
    pub deduplicated: bool,
}

/// Coordinates verification, deduplication and sponsored submission.
pub struct RelayCoordinator {
    ledger: Arc<RelayLedger>,
    submitter: Arc<dyn ChainSubmitter>,
    reader: ChainStateReader,
    storage: Arc<EncryptedStorage>,
    locks: AddressLocks,
}

impl RelayCoordinator {
    pub fn new(
        ledger: Arc<RelayLedger>,
        submitter: Arc<dyn ChainSubmitter>,
        reader: ChainStateReader,
        storage: Arc<EncryptedStorage>,
    ) -> Self {
        Self {
            ledger,
            submitter,
            reader,
            storage,
            locks: AddressLocks::new(),
        }
    }

    /// Relay `payload` on behalf of the session's address.
    pub async fn relay(
        &self,
        session: &AuthToken,
        payload: RelayPayload,
    ) -> Result<RelayOutcome, RelayError> {
        let address = session.subject_address.as_str();
        let descriptor = payload.descriptor.clone();

        if let Err(e) = payload.verify(session) {
            tracing::warn!(address = %address, reason = %e, "Relay signature rejected");
            audit_log!(
                &self.storage,
                AuditEvent::new(AuditEventType::RelayRejected)
                    .with_address(address)
                    .with_resource("content_hash", &descriptor.content_hash)
                    .failed(e.to_string())
            );
            return Err(RelayError::SignatureInvalid);
        }

        descriptor.validate().map_err(RelayError::Validation)?;

        let _guard = self.locks.acquire(address).await;

        if let Some(existing) = self.ledger.get(address, &descriptor.content_hash)? {
            tracing::info!(
                address = %address,
                tx_hash = %existing.tx_hash,
                "Relay already recorded; returning prior result"
            );
            audit_log!(
                &self.storage,
                AuditEventType::RelayDeduplicated,
                address,
                "tx",
                &existing.tx_hash
            );
            return Ok(RelayOutcome {
                record: existing,
                deduplicated: true,
            });
        }

        let pending = match self.ledger.get_pending(address, &descriptor.content_hash)? {
            Some(pending) => {
                tracing::info!(
                    address = %address,
                    tx_hash = %pending.tx_hash,
                    "Resuming accepted transaction instead of resubmitting"
                );
                pending
            }
            None => {
                let call = MemoryRecordCall {
                    owner: address.to_string(),
                    title: descriptor.title.trim().to_string(),
                    content_hash: descriptor.content_hash.clone(),
                    category: descriptor.category.clone(),
                };
                let accepted = match self.submitter.submit_memory(&call).await {
                    Ok(accepted) => accepted,
                    Err(e) => return Err(self.failed(address, &descriptor.content_hash, &e)),
                };

                let pending = PendingRelay {
                    address: call.owner,
                    content_hash: call.content_hash,
                    title: call.title,
                    category: call.category,
                    tx_hash: accepted.tx_hash,
                    expires_at_secs: accepted.expires_at_secs,
                    submitted_at: Utc::now(),
                };
                if let Err(e) = self.ledger.record_pending(&pending) {
                    tracing::error!(
                        address = %address,
                        tx_hash = %pending.tx_hash,
                        error = %e,
                        "Failed to record pending transaction"
                    );
                }
                pending
            }
        };

        let submitted = match self.submitter.await_commit(&pending.tx_hash).await {
            Ok(result) => result,
            Err(e) => {
                if can_never_commit(&e, &pending) {
                    if let Err(clear_err) = self.ledger.clear_pending(address, &pending.content_hash) {
                        tracing::error!(address = %address, error = %clear_err, "Failed to clear pending transaction");
                    }
                }
                return Err(self.failed(address, &descriptor.content_hash, &e));
            }
        };

        let record = RelayRecord {
            address: address.to_string(),
            content_hash: pending.content_hash,
            title: pending.title,
            category: pending.category,
            tx_hash: submitted.tx_hash,
            explorer_url: submitted.explorer_url,
            relayed_at: Utc::now(),
        };
        let stored = self.ledger.insert(&record)?;
        self.reader.invalidate(address);

        tracing::info!(address = %address, tx_hash = %stored.tx_hash, "Relay confirmed");
        audit_log!(
            &self.storage,
            AuditEvent::new(AuditEventType::RelaySubmitted)
                .with_address(address)
                .with_resource("tx", &stored.tx_hash)
                .with_details(json!({
                    "content_hash": stored.content_hash,
                    "file_name": descriptor.file_name,
                    "file_size": descriptor.file_size,
                }))
        );

        Ok(RelayOutcome {
            record: stored,
            deduplicated: false,
        })
    }

    fn failed(&self, address: &str, content_hash: &str, err: &ChainError) -> RelayError {
        tracing::error!(address = %address, error = %err, "Sponsored submission failed");
        audit_log!(
            &self.storage,
            AuditEvent::new(AuditEventType::RelayFailed)
                .with_address(address)
                .with_resource("content_hash", content_hash)
                .failed(err.to_string())
        );
        RelayError::RelayFailed(err.upstream_message())
    }

    /// Relays previously recorded for `address`, oldest first.
    pub fn list_relays(&self, address: &str) -> Result<Vec<RelayRecord>, RelayError> {
        Ok(self.ledger.list_by_address(address)?)
    }
}

/// Whether a failed wait means the accepted transaction is gone for good.
///
/// A committed-but-aborted transaction is final. An unknown hash is final
/// only once its expiration has passed; before that it may still be in
/// another node's mempool.
fn can_never_commit(err: &ChainError, pending: &PendingRelay) -> bool {
    match err {
        ChainError::Execution { .. } => true,
        ChainError::Dropped(_) => Utc::now().timestamp() > pending.expires_at_secs,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{NetworkConfig, NodeClient, NodeSubmitter};
    use crate::relay::MemoryDescriptor;
    use crate::storage::{AuditRepository, RelayerAccount};
    use crate::testing::{spawn_stub, TestApp};
    use axum::{
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn descriptor(content_hash: &str) -> MemoryDescriptor {
        MemoryDescriptor {
            title: "First steps".to_string(),
            content_hash: content_hash.to_string(),
            category: "video".to_string(),
            file_name: Some("steps.mp4".to_string()),
            file_size: Some(10_485_760),
        }
    }

    fn today() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    #[tokio::test]
    async fn relays_and_records_result() {
        let app = TestApp::new().await;
        let (_, session) = app.issue_token_for(&app.wallet);
        let payload = app.sign_payload(&app.wallet, descriptor("bafy-one"));

        let outcome = app.state.coordinator.relay(&session, payload).await.unwrap();
        assert!(!outcome.deduplicated);
        assert_eq!(outcome.record.address, app.wallet.address());
        assert!(outcome.record.explorer_url.contains(&outcome.record.tx_hash));
        assert_eq!(app.submitter.calls(), 1);

        let calls = app.submitter.recorded();
        assert_eq!(calls[0].owner, app.wallet.address());
        assert_eq!(calls[0].category, "video");

        let listed = app.state.coordinator.list_relays(app.wallet.address()).unwrap();
        assert_eq!(listed, vec![outcome.record]);
    }

    #[tokio::test]
    async fn identical_relay_is_deduplicated() {
        let app = TestApp::new().await;
        let (_, session) = app.issue_token_for(&app.wallet);
        let payload = app.sign_payload(&app.wallet, descriptor("bafy-dup"));

        let first = app.state.coordinator.relay(&session, payload.clone()).await.unwrap();
        let second = app.state.coordinator.relay(&session, payload).await.unwrap();

        assert_eq!(first.record, second.record);
        assert!(second.deduplicated);
        assert_eq!(app.submitter.calls(), 1);
    }

    #[tokio::test]
    async fn concurrent_identical_relays_sponsor_once() {
        let app = TestApp::new().await;
        let (_, session) = app.issue_token_for(&app.wallet);
        let payload = app.sign_payload(&app.wallet, descriptor("bafy-race"));

        let coordinator = app.state.coordinator.clone();
        let mut handles = Vec::new();
        for _ in 0..5 {
            let coordinator = coordinator.clone();
            let session = session.clone();
            let payload = payload.clone();
            handles.push(tokio::spawn(async move {
                coordinator.relay(&session, payload).await
            }));
        }

        let mut hashes = Vec::new();
        for handle in handles {
            hashes.push(handle.await.unwrap().unwrap().record.tx_hash);
        }
        hashes.dedup();
        assert_eq!(hashes.len(), 1);
        assert_eq!(app.submitter.calls(), 1);
    }

    #[tokio::test]
    async fn payload_signed_by_other_wallet_is_rejected_without_submission() {
        let app = TestApp::new().await;
        let other = TestApp::other_wallet();
        let (_, session) = app.issue_token_for(&app.wallet);
        let payload = app.sign_payload(&other, descriptor("bafy-foreign"));

        let err = app.state.coordinator.relay(&session, payload).await.unwrap_err();
        assert_eq!(err, RelayError::SignatureInvalid);
        assert_eq!(app.submitter.calls(), 0);
        assert!(app
            .state
            .coordinator
            .list_relays(app.wallet.address())
            .unwrap()
            .is_empty());

        let events = AuditRepository::new(&app.state.storage)
            .search_by_address(app.wallet.address(), &today())
            .unwrap();
        assert!(events
            .iter()
            .any(|e| e.event_type == AuditEventType::RelayRejected && !e.success));
    }

    #[tokio::test]
    async fn invalid_fields_are_rejected_after_signature_check() {
        let app = TestApp::new().await;
        let (_, session) = app.issue_token_for(&app.wallet);
        let mut bad = descriptor("bafy-x");
        bad.title = String::new();
        let payload = app.sign_payload(&app.wallet, bad);

        let err = app.state.coordinator.relay(&session, payload).await.unwrap_err();
        assert!(matches!(err, RelayError::Validation(_)));
        assert_eq!(app.submitter.calls(), 0);
    }

    #[tokio::test]
    async fn chain_failure_surfaces_upstream_message_and_records_nothing() {
        let app = TestApp::new().await;
        app.submitter.fail_next(ChainError::Upstream {
            status: 400,
            message: "INSUFFICIENT_BALANCE_FOR_TRANSACTION_FEE".to_string(),
        });
        let (_, session) = app.issue_token_for(&app.wallet);
        let payload = app.sign_payload(&app.wallet, descriptor("bafy-fail"));

        let err = app
            .state
            .coordinator
            .relay(&session, payload.clone())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RelayError::RelayFailed("INSUFFICIENT_BALANCE_FOR_TRANSACTION_FEE".to_string())
        );
        assert!(app
            .state
            .coordinator
            .list_relays(app.wallet.address())
            .unwrap()
            .is_empty());

        // A later resubmission goes through.
        let outcome = app.state.coordinator.relay(&session, payload).await.unwrap();
        assert!(!outcome.deduplicated);
        assert_eq!(app.submitter.calls(), 2);
    }

    #[tokio::test]
    async fn transport_failure_uses_generic_message() {
        let app = TestApp::new().await;
        app.submitter
            .fail_next(ChainError::Unavailable("connection refused".to_string()));
        let (_, session) = app.issue_token_for(&app.wallet);
        let payload = app.sign_payload(&app.wallet, descriptor("bafy-down"));

        let err = app.state.coordinator.relay(&session, payload).await.unwrap_err();
        assert_eq!(
            err,
            RelayError::RelayFailed("Failed to reach the chain node".to_string())
        );
    }

    #[tokio::test]
    async fn commit_timeout_keeps_hash_and_resumes_without_resubmitting() {
        let app = TestApp::new().await;
        app.submitter.fail_next_commit(ChainError::Timeout("0x1".to_string()));
        let (_, session) = app.issue_token_for(&app.wallet);
        let payload = app.sign_payload(&app.wallet, descriptor("bafy-slow"));

        let err = app
            .state
            .coordinator
            .relay(&session, payload.clone())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RelayError::RelayFailed("Timed out waiting for transaction confirmation".to_string())
        );
        let pending = app
            .state
            .ledger
            .get_pending(app.wallet.address(), "bafy-slow")
            .unwrap()
            .expect("accepted hash kept");

        let outcome = app.state.coordinator.relay(&session, payload).await.unwrap();
        assert_eq!(outcome.record.tx_hash, pending.tx_hash);
        assert_eq!(app.submitter.calls(), 1);
        assert_eq!(app.submitter.commits(), 2);
        assert!(app
            .state
            .ledger
            .get_pending(app.wallet.address(), "bafy-slow")
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn aborted_transaction_can_be_relayed_again() {
        let app = TestApp::new().await;
        app.submitter.fail_next_commit(ChainError::Execution {
            hash: "0x1".to_string(),
            vm_status: "Move abort: EPAUSED".to_string(),
        });
        let (_, session) = app.issue_token_for(&app.wallet);
        let payload = app.sign_payload(&app.wallet, descriptor("bafy-abort"));

        let err = app
            .state
            .coordinator
            .relay(&session, payload.clone())
            .await
            .unwrap_err();
        assert_eq!(err, RelayError::RelayFailed("Move abort: EPAUSED".to_string()));
        assert!(app
            .state
            .ledger
            .get_pending(app.wallet.address(), "bafy-abort")
            .unwrap()
            .is_none());

        app.state.coordinator.relay(&session, payload).await.unwrap();
        assert_eq!(app.submitter.calls(), 2);
    }

    #[tokio::test]
    async fn unknown_hash_is_forgotten_only_after_expiry() {
        let app = TestApp::new().await;
        let (_, session) = app.issue_token_for(&app.wallet);

        app.submitter.fail_next_commit(ChainError::Dropped("0x1".to_string()));
        let live = app.sign_payload(&app.wallet, descriptor("bafy-live"));
        assert!(app.state.coordinator.relay(&session, live).await.is_err());
        assert!(app
            .state
            .ledger
            .get_pending(app.wallet.address(), "bafy-live")
            .unwrap()
            .is_some());

        app.submitter.expire_submissions();
        app.submitter.fail_next_commit(ChainError::Dropped("0x2".to_string()));
        let expired = app.sign_payload(&app.wallet, descriptor("bafy-expired"));
        assert!(app.state.coordinator.relay(&session, expired).await.is_err());
        assert!(app
            .state
            .ledger
            .get_pending(app.wallet.address(), "bafy-expired")
            .unwrap()
            .is_none());
    }

    /// A node that accepts every transaction; `wait_by_hash` answers 504
    /// until `committed` is set.
    fn slow_node(posts: Arc<AtomicUsize>, committed: Arc<AtomicBool>) -> Router {
        Router::new()
            .route(
                "/v1/accounts/{address}",
                get(|| async { Json(json!({"sequence_number": "3"})) }),
            )
            .route(
                "/v1/estimate_gas_price",
                get(|| async { Json(json!({"gas_estimate": 100})) }),
            )
            .route(
                "/v1/transactions/encode_submission",
                post(|| async { Json(json!("0x00")) }),
            )
            .route(
                "/v1/transactions",
                post(move || {
                    posts.fetch_add(1, Ordering::SeqCst);
                    async {
                        (
                            StatusCode::ACCEPTED,
                            Json(json!({"hash": "0xfeed", "type": "pending_transaction"})),
                        )
                    }
                }),
            )
            .route(
                "/v1/transactions/wait_by_hash/{hash}",
                get(move || {
                    let done = committed.load(Ordering::SeqCst);
                    async move {
                        if done {
                            (
                                StatusCode::OK,
                                Json(json!({"type": "user_transaction", "success": true, "vm_status": "Executed successfully"})),
                            )
                        } else {
                            (
                                StatusCode::GATEWAY_TIMEOUT,
                                Json(json!({"message": "upstream timeout"})),
                            )
                        }
                    }
                }),
            )
    }

    #[tokio::test]
    async fn accepted_but_unconfirmed_transaction_is_sponsored_once() {
        let posts = Arc::new(AtomicUsize::new(0));
        let committed = Arc::new(AtomicBool::new(false));
        let node_url = spawn_stub(slow_node(posts.clone(), committed.clone())).await;

        let app = TestApp::with_node_url(&node_url).await;
        let node = NodeClient::new(NetworkConfig {
            node_url,
            ..NetworkConfig::default()
        })
        .unwrap();
        let relayer = RelayerAccount::from_hex(&hex::encode([5u8; 32])).unwrap();
        let coordinator = RelayCoordinator::new(
            app.state.ledger.clone(),
            Arc::new(NodeSubmitter::new(node, relayer)),
            app.state.reader.clone(),
            app.state.storage.clone(),
        );

        let (_, session) = app.issue_token_for(&app.wallet);
        let payload = app.sign_payload(&app.wallet, descriptor("bafy-unconfirmed"));

        for _ in 0..2 {
            let err = coordinator.relay(&session, payload.clone()).await.unwrap_err();
            assert_eq!(err, RelayError::RelayFailed("upstream timeout".to_string()));
        }
        assert_eq!(posts.load(Ordering::SeqCst), 1);

        committed.store(true, Ordering::SeqCst);
        let outcome = coordinator.relay(&session, payload).await.unwrap();
        assert_eq!(outcome.record.tx_hash, "0xfeed");
        assert_eq!(posts.load(Ordering::SeqCst), 1);
    }
}
