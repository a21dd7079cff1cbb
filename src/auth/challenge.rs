// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-in challenge construction.
//!
//! The challenge text is fixed byte-for-byte so the server can rebuild it
//! from `(address, timestamp)` and compare:
//!
//! ```text
//! Sign this message to authenticate with <App>.
//!
//! Wallet: <address>
//! Timestamp: <timestampMs>
//!
//! This signature will not trigger any blockchain transaction or cost any gas fees.
//! ```

use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// App name used in the template when `APP_NAME` is unset.
pub const DEFAULT_APP_NAME: &str = "Memory Relay";

/// Random bytes per nonce (rendered as 32 hex chars).
const NONCE_BYTES: usize = 16;

const TIMESTAMP_PREFIX: &str = "\nTimestamp: ";

/// Whether the signature opens a session or links a wallet to one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeMode {
    #[default]
    Authenticate,
    Link,
}

/// A one-time sign-in challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub address: String,
    pub nonce: String,
    pub timestamp_ms: i64,
    pub message: String,
    pub mode: ChallengeMode,
}

/// Render the fixed challenge text.
pub fn challenge_message(app_name: &str, address: &str, timestamp_ms: i64) -> String {
    format!(
        "Sign this message to authenticate with {app_name}.\n\nWallet: {address}\nTimestamp: {timestamp_ms}\n\nThis signature will not trigger any blockchain transaction or cost any gas fees."
    )
}

/// Fresh random nonce, 32 lowercase hex characters.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Build a challenge for `address` stamped with `now_ms`.
pub fn build_challenge(
    app_name: &str,
    address: &str,
    mode: ChallengeMode,
    now_ms: i64,
) -> Challenge {
    Challenge {
        address: address.to_string(),
        nonce: generate_nonce(),
        timestamp_ms: now_ms,
        message: challenge_message(app_name, address, now_ms),
        mode,
    }
}

/// Pull the timestamp out of a challenge message, if it has one.
pub fn parse_timestamp(message: &str) -> Option<i64> {
    let start = message.find(TIMESTAMP_PREFIX)? + TIMESTAMP_PREFIX.len();
    let rest = &message[start..];
    let end = rest.find('\n').unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
