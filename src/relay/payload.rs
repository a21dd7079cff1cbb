// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed memory descriptors.
//!
//! The client signs the canonical encoding of a [`MemoryDescriptor`]: compact
//! JSON with the keys in the order `title, contentHash, category, fileName,
//! fileSize`. The server re-derives the same bytes from the request fields, so
//! any edit to a field after signing breaks the signature.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthToken;
use crate::custody::keys::{derive_address, parse_public_key, parse_signature, verify_signature};

/// Longest accepted title, in characters.
pub const MAX_TITLE_CHARS: usize = 200;

/// Longest accepted content hash, in bytes.
pub const MAX_CONTENT_HASH_LEN: usize = 256;

/// Longest accepted category, in characters.
pub const MAX_CATEGORY_CHARS: usize = 64;

/// What a relay records, minus the signature.
///
/// Field order is part of the signed encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDescriptor {
    pub title: String,
    /// Opaque content-addressed identifier from the storage collaborator.
    pub content_hash: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

impl MemoryDescriptor {
    /// Bytes the client signs.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        // Serializing a plain struct of strings and integers cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Field checks that run after the signature is verified.
    pub fn validate(&self) -> Result<(), String> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err("title is required".to_string());
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(format!("title exceeds {MAX_TITLE_CHARS} characters"));
        }

        if self.content_hash.is_empty() {
            return Err("contentHash is required".to_string());
        }
        if self.content_hash.len() > MAX_CONTENT_HASH_LEN {
            return Err(format!("contentHash exceeds {MAX_CONTENT_HASH_LEN} bytes"));
        }
        if !self.content_hash.chars().all(|c| c.is_ascii_graphic()) {
            return Err("contentHash must be printable ASCII without spaces".to_string());
        }

        if self.category.chars().count() > MAX_CATEGORY_CHARS {
            return Err(format!("category exceeds {MAX_CATEGORY_CHARS} characters"));
        }
        Ok(())
    }
}

/// A descriptor plus the owner's signature over its canonical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelayPayload {
    #[serde(flatten)]
    pub descriptor: MemoryDescriptor,
    /// Hex Ed25519 signature, no `0x`.
    pub signature: String,
}

/// Why a payload signature was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadSignatureError {
    #[error("session public key is invalid")]
    SessionKey,

    #[error("session public key does not match the session address")]
    SessionAddress,

    #[error("signature is not valid hex Ed25519")]
    Encoding,

    #[error("signature does not match the session identity")]
    Mismatch,
}

impl RelayPayload {
    /// Verify against the identity in `session` only. Any address the
    /// caller might claim elsewhere is ignored.
    pub fn verify(&self, session: &AuthToken) -> Result<(), PayloadSignatureError> {
        let public_key =
            parse_public_key(&session.public_key_hex).map_err(|_| PayloadSignatureError::SessionKey)?;
        if derive_address(&public_key.to_bytes()) != session.subject_address {
            return Err(PayloadSignatureError::SessionAddress);
        }

        let signature =
            parse_signature(&self.signature).map_err(|_| PayloadSignatureError::Encoding)?;
        verify_signature(&public_key, &self.descriptor.canonical_bytes(), &signature)
            .map_err(|_| PayloadSignatureError::Mismatch)
    }
}
