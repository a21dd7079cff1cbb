// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository for the sponsoring (relayer) account key.
//!
//! The relayer pays gas for every relayed memory. Its key is either supplied
//! through `RELAYER_PRIVATE_KEY` or generated once and kept sealed under
//! `relayer/`.

use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zeroize::Zeroizing;

use super::{EncryptedStorage, StorageError, StorageResult};
use crate::custody::keys::derive_address;

/// Public metadata for the relayer account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RelayerMetadata {
    /// Chain address paying for sponsored transactions.
    pub address: String,
    /// Hex Ed25519 public key.
    pub public_key: String,
    pub created_at: DateTime<Utc>,
}

/// Loaded relayer key. Signs transaction signing messages.
#[derive(Clone)]
pub struct RelayerAccount {
    signing_key: SigningKey,
    address: String,
}

impl std::fmt::Debug for RelayerAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayerAccount")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl RelayerAccount {
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = derive_address(&signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            address,
        }
    }

    /// Parse a 32-byte hex secret (optional `0x`).
    pub fn from_hex(hex_key: &str) -> StorageResult<Self> {
        let raw = Zeroizing::new(
            hex::decode(hex_key.trim().trim_start_matches("0x"))
                .map_err(|e| StorageError::SerializationError(format!("relayer key: {e}")))?,
        );
        let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
            StorageError::SerializationError(format!(
                "relayer key must be 32 bytes, got {}",
                raw.len()
            ))
        })?;
        let bytes = Zeroizing::new(bytes);
        Ok(Self::from_signing_key(SigningKey::from_bytes(&bytes)))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }
}

/// Repository for relayer key lifecycle.
pub struct RelayerRepository<'a> {
    storage: &'a EncryptedStorage,
}

impl<'a> RelayerRepository<'a> {
    pub fn new(storage: &'a EncryptedStorage) -> Self {
        Self { storage }
    }

    pub fn exists(&self) -> bool {
        self.storage.exists(self.storage.paths().relayer_key())
    }

    pub fn metadata(&self) -> StorageResult<RelayerMetadata> {
        let path = self.storage.paths().relayer_meta();
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound("Relayer metadata".to_string()));
        }
        self.storage.read_json(path)
    }

    /// Load the relayer account, generating and sealing a key if missing.
    pub fn bootstrap(&self) -> StorageResult<RelayerAccount> {
        if self.exists() {
            return self.load();
        }

        let account = RelayerAccount::from_signing_key(SigningKey::generate(&mut OsRng));
        let metadata = RelayerMetadata {
            address: account.address().to_string(),
            public_key: account.public_key_hex(),
            created_at: Utc::now(),
        };

        self.storage.create_dir(self.storage.paths().relayer_dir())?;
        let secret = Zeroizing::new(account.signing_key.to_bytes());
        self.storage
            .write_sealed(self.storage.paths().relayer_key(), secret.as_slice())?;
        self.storage
            .write_json(self.storage.paths().relayer_meta(), &metadata)?;

        tracing::info!(address = %account.address(), "Generated relayer account; fund it before relaying");
        Ok(account)
    }

    /// Load the sealed relayer key.
    pub fn load(&self) -> StorageResult<RelayerAccount> {
        let raw = Zeroizing::new(self.storage.read_sealed(self.storage.paths().relayer_key())?);
        let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
            StorageError::IntegrityViolation("relayer key has wrong length".to_string())
        })?;
        let bytes = Zeroizing::new(bytes);
        Ok(RelayerAccount::from_signing_key(SigningKey::from_bytes(&bytes)))
    }
}
