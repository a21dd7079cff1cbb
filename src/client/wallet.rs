// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the relay server, signing with a local [`KeyCustody`].
//!
//! The private key never leaves custody: the client only sends the address,
//! the public key and signatures. Every request carries a 30 second timeout
//! and can be cancelled by dropping its future; nothing here writes to the
//! wallet store except [`WalletClient::logout`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use zeroize::Zeroizing;

use crate::auth::{Challenge, ChallengeMode, VerifyRequest};
use crate::chain::client::extract_upstream_message;
use crate::custody::{CustodyError, KeyCustody};
use crate::models::{ApiResponse, BalanceData, LinkData, MemoriesData, RelayData, TokenData};
use crate::relay::{MemoryDescriptor, RelayPayload};

/// Per-request budget.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Custody(#[from] CustodyError),

    #[error("not authenticated")]
    NotAuthenticated,

    /// The request never got an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a failure body.
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        error_code: Option<String>,
    },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn error_code(&self) -> Option<&str> {
        match self {
            ClientError::Rejected { error_code, .. } => error_code.as_deref(),
            _ => None,
        }
    }
}

/// Authenticates a local wallet and relays memories through the server.
pub struct WalletClient {
    http: Client,
    base_url: String,
    custody: Arc<KeyCustody>,
    token: RwLock<Option<Zeroizing<String>>>,
}

impl WalletClient {
    pub fn new(base_url: impl Into<String>, custody: Arc<KeyCustody>) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            custody,
            token: RwLock::new(None),
        })
    }

    pub fn custody(&self) -> &Arc<KeyCustody> {
        &self.custody
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<ApiResponse<T>, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if !status.is_success() {
            let error_code = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("error_code").and_then(Value::as_str).map(str::to_string));
            let message = extract_upstream_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message,
                error_code,
            });
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        bearer: Option<&str>,
    ) -> Result<ApiResponse<T>, ClientError> {
        let mut request = self.http.post(self.url(path)).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        self.send(request).await
    }

    async fn bearer(&self) -> Result<Zeroizing<String>, ClientError> {
        self.token
            .read()
            .await
            .clone()
            .ok_or(ClientError::NotAuthenticated)
    }

    /// Fetch a challenge for the custody wallet and sign it.
    async fn sign_challenge(
        &self,
        custody: &KeyCustody,
        mode: ChallengeMode,
    ) -> Result<VerifyRequest, ClientError> {
        let wallet = custody.identity().await?;
        let request = self
            .http
            .get(self.url("/v1/auth/challenge"))
            .query(&[("address", wallet.address.as_str()), ("mode", mode_param(mode))]);
        let challenge: Challenge = self.send(request).await?.data;

        let signature = custody.sign_hex(challenge.message.as_bytes()).await?;
        Ok(VerifyRequest {
            address: wallet.address,
            public_key: wallet.public_key_hex,
            signature,
            message: challenge.message,
            full_message: None,
            nonce: challenge.nonce,
        })
    }

    /// Challenge-response sign-in. Stores the session token on success.
    pub async fn authenticate(&self) -> Result<TokenData, ClientError> {
        let request = self.sign_challenge(&self.custody, ChallengeMode::Authenticate).await?;
        let session: TokenData = self.post("/v1/auth/verify", &request, None).await?.data;

        *self.token.write().await = Some(Zeroizing::new(session.token.clone()));
        tracing::debug!(address = %session.address, "Authenticated with relay server");
        Ok(session)
    }

    /// Prove `other` and link it to the current session's account.
    pub async fn link(&self, other: &KeyCustody) -> Result<LinkData, ClientError> {
        let token = self.bearer().await?;
        let request = self.sign_challenge(other, ChallengeMode::Link).await?;
        Ok(self.post("/v1/auth/link", &request, Some(&token)).await?.data)
    }

    /// Sign `descriptor` locally and ask the server to relay it.
    ///
    /// Failures are returned as-is; resubmitting the same descriptor is safe
    /// because the server deduplicates by content hash.
    pub async fn relay_memory(&self, descriptor: MemoryDescriptor) -> Result<RelayData, ClientError> {
        let token = self.bearer().await?;
        let signature = self.custody.sign_hex(&descriptor.canonical_bytes()).await?;
        let payload = RelayPayload {
            descriptor,
            signature,
        };
        Ok(self
            .post("/v1/memories/relay", &payload, Some(&token))
            .await?
            .data)
    }

    pub async fn balance(&self, address: &str) -> Result<BalanceData, ClientError> {
        let request = self.http.get(self.url(&format!("/v1/accounts/{address}/balance")));
        Ok(self.send(request).await?.data)
    }

    pub async fn memories(&self, address: &str) -> Result<MemoriesData, ClientError> {
        let request = self.http.get(self.url(&format!("/v1/accounts/{address}/memories")));
        Ok(self.send(request).await?.data)
    }

    /// Drop the session and wipe the wallet from this device.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.token.write().await.take();
        self.custody.logout().await?;
        Ok(())
    }
}

fn mode_param(mode: ChallengeMode) -> &'static str {
    match mode {
        ChallengeMode::Authenticate => "authenticate",
        ChallengeMode::Link => "link",
    }
}
