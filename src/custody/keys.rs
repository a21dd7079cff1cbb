// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ed25519 key derivation and account addresses.
//!
//! The account address is `sha3_256(public_key || 0x00)` rendered as `0x`
//! followed by 64 lowercase hex characters. The trailing `0x00` is the
//! single-signer Ed25519 scheme byte.

use bip39::Mnemonic;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha3::{Digest, Sha3_256};
use zeroize::Zeroizing;

use super::mnemonic::mnemonic_to_seed;

/// Authentication scheme byte appended before hashing the public key.
const ED25519_SCHEME: u8 = 0x00;

pub const PUBLIC_KEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    #[error("signature does not verify")]
    SignatureMismatch,
}

/// Derive the account address from a raw Ed25519 public key.
pub fn derive_address(public_key: &[u8; PUBLIC_KEY_LEN]) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(public_key);
    hasher.update([ED25519_SCHEME]);
    format!("0x{}", hex::encode(hasher.finalize()))
}

/// Canonical form of an address for comparison and keying: lowercase, `0x`.
pub fn normalize_address(address: &str) -> String {
    let trimmed = address.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    format!("0x{}", body.to_ascii_lowercase())
}

/// `0x` + exactly 64 lowercase hex characters.
pub fn is_valid_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .map(|body| {
            body.len() == 64
                && body
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        })
        .unwrap_or(false)
}

/// Parse a hex public key (with or without `0x`).
pub fn parse_public_key(hex_key: &str) -> Result<VerifyingKey, KeyError> {
    let bytes = hex::decode(hex_key.trim().trim_start_matches("0x"))
        .map_err(|e| KeyError::InvalidPublicKey(e.to_string()))?;
    let bytes: [u8; PUBLIC_KEY_LEN] = bytes.as_slice().try_into().map_err(|_| {
        KeyError::InvalidPublicKey(format!(
            "expected {PUBLIC_KEY_LEN} bytes, got {}",
            bytes.len()
        ))
    })?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| KeyError::InvalidPublicKey(e.to_string()))
}

/// Parse a hex signature (with or without `0x`).
pub fn parse_signature(hex_sig: &str) -> Result<Signature, KeyError> {
    let bytes = hex::decode(hex_sig.trim().trim_start_matches("0x"))
        .map_err(|e| KeyError::InvalidSignatureEncoding(e.to_string()))?;
    let bytes: [u8; SIGNATURE_LEN] = bytes.as_slice().try_into().map_err(|_| {
        KeyError::InvalidSignatureEncoding(format!(
            "expected {SIGNATURE_LEN} bytes, got {}",
            bytes.len()
        ))
    })?;
    Ok(Signature::from_bytes(&bytes))
}

/// Verify an Ed25519 signature over raw message bytes.
pub fn verify_signature(
    public_key: &VerifyingKey,
    message: &[u8],
    signature: &Signature,
) -> Result<(), KeyError> {
    public_key
        .verify(message, signature)
        .map_err(|_| KeyError::SignatureMismatch)
}

/// A fully derived wallet. Secret fields never leave the holding process.
pub struct WalletIdentity {
    mnemonic: Zeroizing<String>,
    seed: Zeroizing<[u8; 64]>,
    signing_key: SigningKey,
    public_key: [u8; PUBLIC_KEY_LEN],
    address: String,
}

impl std::fmt::Debug for WalletIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletIdentity")
            .field("address", &self.address)
            .field("public_key", &hex::encode(self.public_key))
            .field("mnemonic", &"[REDACTED]")
            .field("seed", &"[REDACTED]")
            .finish()
    }
}

impl WalletIdentity {
    /// Deterministically derive the identity: the first 32 bytes of the
    /// BIP-39 seed are the Ed25519 secret key.
    pub fn from_mnemonic(mnemonic: &Mnemonic) -> Self {
        let seed = mnemonic_to_seed(mnemonic);
        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(&seed[..32]);

        let signing_key = SigningKey::from_bytes(&secret);
        let public_key = signing_key.verifying_key().to_bytes();
        let address = derive_address(&public_key);

        Self {
            mnemonic: Zeroizing::new(mnemonic.to_string()),
            seed,
            signing_key,
            public_key,
            address,
        }
    }

    /// Mnemonic phrase, shown once to the user for backup.
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    pub fn seed(&self) -> &[u8; 64] {
        &self.seed
    }

    pub fn private_key_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing_key.to_bytes())
    }

    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public_key
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn sign(&self, payload: &[u8]) -> Signature {
        self.signing_key.sign(payload)
    }
}
