// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AES-256-GCM envelope encryption for opaque byte blobs.
//!
//! Each call to [`encrypt`] draws a fresh 96-bit IV from the OS RNG. The
//! 128-bit GCM tag is appended to the ciphertext by the `aes-gcm` crate, so
//! any change to the IV, the ciphertext, or the key makes [`decrypt`] fail
//! with [`EnvelopeError::AuthenticationFailure`].

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

pub const IV_LEN: usize = 12;
pub const KEY_LEN: usize = 32;
pub const TAG_LEN: usize = 16;

/// Errors from the symmetric envelope layer.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Tag mismatch: tampered IV/ciphertext or the wrong key.
    #[error("Authentication failure: ciphertext or key does not match")]
    AuthenticationFailure,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Malformed blob: {0}")]
    MalformedBlob(String),

    #[error("Encryption failed")]
    EncryptionFailed,
}

/// 256-bit symmetric key, zeroized on drop.
#[derive(Clone)]
pub struct EnvelopeKey(Zeroizing<[u8; KEY_LEN]>);

impl std::fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EnvelopeKey([REDACTED])")
    }
}

impl EnvelopeKey {
    /// Generate a new random key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(key.as_mut());
        Self(key)
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Parse a 64-character hex key (optional `0x` prefix).
    pub fn from_hex(hex_key: &str) -> Result<Self, EnvelopeError> {
        let raw = Zeroizing::new(
            hex::decode(hex_key.trim().trim_start_matches("0x"))
                .map_err(|e| EnvelopeError::InvalidKey(e.to_string()))?,
        );
        let bytes: [u8; KEY_LEN] = raw.as_slice().try_into().map_err(|_| {
            EnvelopeError::InvalidKey(format!("expected {KEY_LEN} bytes, got {}", raw.len()))
        })?;
        Ok(Self::from_bytes(bytes))
    }

    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(&self.0[..]))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

/// Encrypted payload: the IV used plus ciphertext with the GCM tag appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    pub iv: [u8; IV_LEN],
    pub ciphertext: Vec<u8>,
}

impl EncryptedBlob {
    /// Wire form: `iv || ciphertext || tag`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(IV_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        if bytes.len() < IV_LEN + TAG_LEN {
            return Err(EnvelopeError::MalformedBlob(format!(
                "blob is {} bytes, need at least {}",
                bytes.len(),
                IV_LEN + TAG_LEN
            )));
        }
        let (iv, ciphertext) = bytes.split_at(IV_LEN);
        let iv: [u8; IV_LEN] = iv
            .try_into()
            .map_err(|_| EnvelopeError::MalformedBlob("bad IV length".to_string()))?;
        Ok(Self {
            iv,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Encrypt `plaintext` under `key` with a fresh random IV.
pub fn encrypt(key: &EnvelopeKey, plaintext: &[u8]) -> Result<EncryptedBlob, EnvelopeError> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| EnvelopeError::InvalidKey(e.to_string()))?;

    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| EnvelopeError::EncryptionFailed)?;

    Ok(EncryptedBlob { iv, ciphertext })
}

/// Decrypt a blob. Never returns altered plaintext: any tag mismatch is an error.
pub fn decrypt(key: &EnvelopeKey, blob: &EncryptedBlob) -> Result<Vec<u8>, EnvelopeError> {
    if blob.ciphertext.len() < TAG_LEN {
        return Err(EnvelopeError::MalformedBlob(
            "ciphertext shorter than authentication tag".to_string(),
        ));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| EnvelopeError::InvalidKey(e.to_string()))?;

    cipher
        .decrypt(Nonce::from_slice(&blob.iv), blob.ciphertext.as_slice())
        .map_err(|_| EnvelopeError::AuthenticationFailure)
}
