// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Challenge-response verification.
//!
//! ## Order of checks
//!
//! 0. Shape: hex fields decode, `message` equals the template rebuilt from
//!    `(address, timestamp)`, and `fullMessage` (if sent) embeds both the
//!    message and the nonce. Failures here record nothing.
//! 1. Address recomputed from the public key must equal the claimed address.
//! 2. Ed25519 signature over the signed text.
//! 3. Timestamp within the TTL window of server time.
//! 4. Nonce (and signature) not seen before; claimed atomically.
//! 5. Session token issued.
//!
//! A nonce presented to a request that fails steps 1-3 is burned as well.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::challenge::{challenge_message, parse_timestamp};
use super::nonce::NonceRegistry;
use super::token::{AuthToken, TokenIssuer};
use super::ChallengeError;
use crate::custody::keys::{
    derive_address, normalize_address, parse_public_key, parse_signature, verify_signature,
};

/// Default challenge lifetime.
pub const DEFAULT_CHALLENGE_TTL_MS: i64 = 5 * 60 * 1000;

/// How far a challenge timestamp may run ahead of the server clock.
pub const FUTURE_SKEW_MS: i64 = 60 * 1000;

const MAX_NONCE_LEN: usize = 128;

/// Signed challenge as posted by the client.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub address: String,
    /// Hex Ed25519 public key.
    pub public_key: String,
    /// Hex Ed25519 signature.
    pub signature: String,
    /// The challenge text.
    pub message: String,
    /// Exact text the wallet signed, when it wraps `message`.
    #[serde(default)]
    pub full_message: Option<String>,
    pub nonce: String,
}

/// A verified session plus its encoded bearer token.
#[derive(Debug, Clone)]
pub struct Verified {
    pub token: String,
    pub session: AuthToken,
}

/// Issues challenges and turns valid signatures into sessions.
pub struct ChallengeAuthenticator {
    app_name: String,
    ttl_ms: i64,
    nonces: Arc<NonceRegistry>,
    tokens: TokenIssuer,
}

impl ChallengeAuthenticator {
    pub fn new(
        app_name: impl Into<String>,
        ttl_ms: i64,
        nonces: Arc<NonceRegistry>,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            ttl_ms,
            nonces,
            tokens,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn nonces(&self) -> &Arc<NonceRegistry> {
        &self.nonces
    }

    /// Registry entries outlive the window in which the challenge is fresh.
    fn retention_until(&self, now_ms: i64) -> i64 {
        now_ms
            .saturating_add(self.ttl_ms)
            .saturating_add(FUTURE_SKEW_MS)
    }

    /// Verify a signed challenge at server time `now_ms`.
    pub fn verify(&self, req: &VerifyRequest, now_ms: i64) -> Result<Verified, ChallengeError> {
        // Step 0: shape. Nothing is recorded on these failures.
        let nonce = req.nonce.trim();
        if nonce.is_empty() || nonce.len() > MAX_NONCE_LEN {
            return Err(ChallengeError::MalformedChallenge(
                "nonce must be 1-128 characters".to_string(),
            ));
        }

        let timestamp_ms = parse_timestamp(&req.message).ok_or_else(|| {
            ChallengeError::MalformedChallenge("message has no timestamp".to_string())
        })?;
        if req.message != challenge_message(&self.app_name, &req.address, timestamp_ms) {
            return Err(ChallengeError::MalformedChallenge(
                "message does not match the challenge template".to_string(),
            ));
        }

        let signed_text = match req.full_message.as_deref() {
            Some(full) if !full.is_empty() => {
                if !full.contains(&req.message) || !full.contains(nonce) {
                    return Err(ChallengeError::MalformedChallenge(
                        "fullMessage must contain the message and nonce".to_string(),
                    ));
                }
                full
            }
            _ => req.message.as_str(),
        };

        let public_key = parse_public_key(&req.public_key)
            .map_err(|e| ChallengeError::MalformedChallenge(e.to_string()))?;
        let signature = parse_signature(&req.signature)
            .map_err(|e| ChallengeError::MalformedChallenge(e.to_string()))?;

        let claimed = normalize_address(&req.address);
        let retain_until = self.retention_until(now_ms);

        // Step 1: address binding.
        let derived = derive_address(&public_key.to_bytes());
        if derived != claimed {
            self.nonces.burn(nonce, retain_until);
            tracing::warn!(address = %claimed, "Challenge public key does not match address");
            return Err(ChallengeError::AddressMismatch);
        }

        // Step 2: signature.
        if verify_signature(&public_key, signed_text.as_bytes(), &signature).is_err() {
            self.nonces.burn(nonce, retain_until);
            tracing::warn!(address = %claimed, "Challenge signature invalid");
            return Err(ChallengeError::SignatureInvalid);
        }

        // Step 3: freshness. The window is [-skew, ttl); registry entries
        // live until at least timestamp + ttl, so the window never outlasts
        // the replay record.
        let age = now_ms - timestamp_ms;
        if age >= self.ttl_ms || age < -FUTURE_SKEW_MS {
            self.nonces.burn(nonce, retain_until);
            tracing::info!(address = %claimed, age_ms = age, "Challenge expired");
            return Err(ChallengeError::Expired);
        }

        // Step 4: single use. The signature is claimed with the nonce so the
        // same signed text cannot be replayed under a new nonce.
        let signature_key = format!("sig:{}", hex::encode(signature.to_bytes()));
        if !self
            .nonces
            .consume(&[nonce, signature_key.as_str()], retain_until, now_ms)
        {
            tracing::warn!(address = %claimed, "Challenge replay rejected");
            return Err(ChallengeError::ReplayDetected);
        }

        // Step 5: session.
        let (token, session) = self
            .tokens
            .issue(&claimed, &hex::encode(public_key.to_bytes()), now_ms / 1000)
            .map_err(|e| ChallengeError::TokenIssue(e.to_string()))?;

        tracing::info!(address = %claimed, "Wallet authenticated");
        Ok(Verified { token, session })
    }
}
