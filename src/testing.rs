// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared test fixtures.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tempfile::TempDir;
use tokio::net::TcpListener;

use crate::auth::challenge::{build_challenge, now_ms, ChallengeMode};
use crate::auth::{AuthToken, ChallengeAuthenticator, NonceRegistry, TokenIssuer, VerifyRequest};
use crate::chain::{
    ChainError, ChainStateReader, ChainSubmitter, MemoryCache, MemoryRecordCall, NetworkConfig,
    NodeClient, PendingSubmission, SubmitResult,
};
use crate::config::ServerConfig;
use crate::custody::keys::WalletIdentity;
use crate::custody::mnemonic::validate_phrase;
use crate::relay::{MemoryDescriptor, RelayPayload};
use crate::state::AppState;
use crate::storage::{EncryptedStorage, RelayLedger, StoragePaths};

pub const TEST_TOKEN_SECRET: &[u8] = b"test-token-secret";

const PHRASE_12: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// Nothing listens on the discard port; reads degrade to zero/empty.
const UNREACHABLE_NODE: &str = "http://127.0.0.1:9/v1";

/// Serve `router` on an ephemeral loopback port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Serve a stub node; returns its `http://<addr>/v1` base URL.
pub async fn spawn_stub(router: Router) -> String {
    format!("http://{}/v1", serve(router).await)
}

/// Chain seam double that counts sponsored submissions.
#[derive(Default)]
pub struct FakeSubmitter {
    calls: AtomicUsize,
    commits: AtomicUsize,
    recorded: Mutex<Vec<MemoryRecordCall>>,
    fail_next: Mutex<Option<ChainError>>,
    fail_commit: Mutex<Option<ChainError>>,
    expired: AtomicBool,
}

impl FakeSubmitter {
    /// Transactions submitted (each one would cost gas).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Waits for commit, including resumed ones.
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> Vec<MemoryRecordCall> {
        self.recorded.lock().unwrap().clone()
    }

    /// Make the next submission fail with `err` before the node accepts it.
    pub fn fail_next(&self, err: ChainError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    /// Make the next wait for commit fail with `err`.
    pub fn fail_next_commit(&self, err: ChainError) {
        *self.fail_commit.lock().unwrap() = Some(err);
    }

    /// Hand out transactions whose expiration has already passed.
    pub fn expire_submissions(&self) {
        self.expired.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainSubmitter for FakeSubmitter {
    async fn submit_memory(&self, call: &MemoryRecordCall) -> Result<PendingSubmission, ChainError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.recorded.lock().unwrap().push(call.clone());

        // Hold the await point so overlapping relays would interleave.
        tokio::time::sleep(Duration::from_millis(10)).await;

        if let Some(err) = self.fail_next.lock().unwrap().take() {
            return Err(err);
        }

        let now = chrono::Utc::now().timestamp();
        Ok(PendingSubmission {
            tx_hash: format!("0x{n:064x}"),
            expires_at_secs: if self.expired.load(Ordering::SeqCst) { now - 1 } else { now + 60 },
        })
    }

    async fn await_commit(&self, tx_hash: &str) -> Result<SubmitResult, ChainError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_commit.lock().unwrap().take() {
            return Err(err);
        }
        Ok(SubmitResult {
            explorer_url: NetworkConfig::default().explorer_tx_url(tx_hash),
            tx_hash: tx_hash.to_string(),
        })
    }
}

/// A fully wired server state over a temp directory and a fake chain.
pub struct TestApp {
    pub state: AppState,
    pub wallet: WalletIdentity,
    pub submitter: Arc<FakeSubmitter>,
    _temp: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_node_url(UNREACHABLE_NODE).await
    }

    /// Reads go to the node at `node_url`; writes go to the fake.
    pub async fn with_node_url(node_url: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let config = ServerConfig {
            data_dir: temp.path().to_path_buf(),
            network: NetworkConfig {
                node_url: node_url.to_string(),
                ..NetworkConfig::default()
            },
            ..ServerConfig::default()
        };

        let mut storage = EncryptedStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        let ledger = RelayLedger::open(&storage.paths().relay_ledger()).unwrap();

        let reader = ChainStateReader::new(NodeClient::new(config.network.clone()).unwrap())
            .with_cache(Arc::new(MemoryCache::default()));
        let authenticator = ChallengeAuthenticator::new(
            config.app_name.clone(),
            config.challenge_ttl_ms,
            Arc::new(NonceRegistry::new()),
            TokenIssuer::new(TEST_TOKEN_SECRET, 3600),
        );
        let submitter = Arc::new(FakeSubmitter::default());

        let state = AppState::new(
            config,
            Arc::new(storage),
            Arc::new(ledger),
            authenticator,
            submitter.clone(),
            reader,
        );

        Self {
            state,
            wallet: Self::primary_wallet(),
            submitter,
            _temp: temp,
        }
    }

    pub fn primary_wallet() -> WalletIdentity {
        WalletIdentity::from_mnemonic(&validate_phrase(PHRASE_12).unwrap())
    }

    pub fn other_wallet() -> WalletIdentity {
        let phrase = [vec!["abandon"; 23], vec!["art"]].concat().join(" ");
        WalletIdentity::from_mnemonic(&validate_phrase(&phrase).unwrap())
    }

    pub fn router(&self) -> Router {
        crate::api::router(self.state.clone())
    }

    /// Issue a session for `wallet` without going through a challenge.
    pub fn issue_token_for(&self, wallet: &WalletIdentity) -> (String, AuthToken) {
        self.state
            .authenticator
            .tokens()
            .issue(
                wallet.address(),
                &wallet.public_key_hex(),
                chrono::Utc::now().timestamp(),
            )
            .unwrap()
    }

    /// Sign a fresh challenge the way a wallet client would.
    pub fn signed_challenge(&self, wallet: &WalletIdentity, mode: ChallengeMode) -> VerifyRequest {
        let challenge = build_challenge(
            self.state.authenticator.app_name(),
            wallet.address(),
            mode,
            now_ms(),
        );
        VerifyRequest {
            address: wallet.address().to_string(),
            public_key: wallet.public_key_hex(),
            signature: hex::encode(wallet.sign(challenge.message.as_bytes()).to_bytes()),
            message: challenge.message,
            full_message: None,
            nonce: challenge.nonce,
        }
    }

    /// Sign `descriptor` with `wallet`.
    pub fn sign_payload(&self, wallet: &WalletIdentity, descriptor: MemoryDescriptor) -> RelayPayload {
        let signature = wallet.sign(&descriptor.canonical_bytes());
        RelayPayload {
            descriptor,
            signature: hex::encode(signature.to_bytes()),
        }
    }
}
