// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sealed filesystem operations.
//!
//! JSON records and raw secrets are sealed with AES-256-GCM under a device
//! key before they touch disk. The device key lives in `device.key` under the
//! storage root (created on first [`EncryptedStorage::initialize`]) unless one
//! is injected with [`EncryptedStorage::with_sealing_key`].
//!
//! Every write goes to a temporary sibling and is renamed into place, so an
//! interrupted write never leaves a partial file behind.
//!
//! Audit logs are append-only JSONL and use the unsealed raw helpers.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use super::StoragePaths;
use crate::custody::envelope::{self, EncryptedBlob, EnvelopeError, EnvelopeKey};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage not initialized")]
    NotInitialized,

    /// Sealed file failed authentication (tampered, truncated or foreign key).
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(e.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

impl From<EnvelopeError> for StorageError {
    fn from(e: EnvelopeError) -> Self {
        match e {
            EnvelopeError::AuthenticationFailure | EnvelopeError::MalformedBlob(_) => {
                StorageError::IntegrityViolation(e.to_string())
            }
            other => StorageError::SerializationError(other.to_string()),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Sealed storage rooted at a [`StoragePaths`] directory.
#[derive(Debug, Clone)]
pub struct EncryptedStorage {
    paths: StoragePaths,
    sealing_key: Option<EnvelopeKey>,
    initialized: bool,
}

impl EncryptedStorage {
    /// Create a new EncryptedStorage instance.
    ///
    /// Does NOT initialize the directory structure. Call `initialize()` first.
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            sealing_key: None,
            initialized: false,
        }
    }

    /// Create with an externally supplied sealing key; `device.key` is not used.
    pub fn with_sealing_key(paths: StoragePaths, key: EnvelopeKey) -> Self {
        Self {
            paths,
            sealing_key: Some(key),
            initialized: false,
        }
    }

    /// Get the storage paths.
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Check if storage is initialized.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Create the directory layout and load (or create) the device key.
    ///
    /// Safe to call multiple times (idempotent).
    pub fn initialize(&mut self) -> StorageResult<()> {
        let dirs = [
            self.paths.root().to_path_buf(),
            self.paths.secrets_dir(),
            self.paths.audit_dir(),
        ];

        for dir in dirs {
            fs::create_dir_all(&dir)?;
        }

        if self.sealing_key.is_none() {
            self.sealing_key = Some(self.load_or_create_device_key()?);
        }

        self.initialized = true;
        Ok(())
    }

    fn load_or_create_device_key(&self) -> StorageResult<EnvelopeKey> {
        let path = self.paths.device_key();
        match fs::read_to_string(&path) {
            Ok(hex_key) => EnvelopeKey::from_hex(&hex_key).map_err(|e| {
                StorageError::IntegrityViolation(format!("device key unreadable: {e}"))
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let key = EnvelopeKey::generate();
                write_atomic(&path, key.to_hex().as_bytes())?;
                restrict_permissions(&path)?;
                tracing::info!(path = %path.display(), "Created new device sealing key");
                Ok(key)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn key(&self) -> StorageResult<&EnvelopeKey> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }
        self.sealing_key.as_ref().ok_or(StorageError::NotInitialized)
    }

    /// Verify the data directory accepts a sealed write-read-delete cycle.
    pub fn health_check(&self) -> StorageResult<()> {
        let test_file = self.paths.root().join(".health_check");
        let test_data = b"health_check_data";

        self.write_sealed(&test_file, test_data)?;
        let read_data = self.read_sealed(&test_file)?;
        fs::remove_file(&test_file)?;

        if read_data != test_data {
            return Err(StorageError::IntegrityViolation(
                "Health check data mismatch".to_string(),
            ));
        }

        Ok(())
    }

    // ========== Sealed JSON Operations ==========

    /// Read and unseal a JSON file.
    pub fn read_json<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> StorageResult<T> {
        let plaintext = zeroize::Zeroizing::new(self.read_sealed(path)?);
        Ok(serde_json::from_slice(&plaintext)?)
    }

    /// Seal and write a JSON file (atomic write via rename).
    pub fn write_json<T: Serialize>(&self, path: impl AsRef<Path>, value: &T) -> StorageResult<()> {
        let plaintext = zeroize::Zeroizing::new(serde_json::to_vec(value)?);
        self.write_sealed(path, &plaintext)
    }

    // ========== Sealed Raw Operations ==========

    /// Seal raw bytes and write them atomically.
    pub fn write_sealed(&self, path: impl AsRef<Path>, data: &[u8]) -> StorageResult<()> {
        let key = self.key()?;
        let blob = envelope::encrypt(key, data)?;
        write_atomic(path.as_ref(), &blob.to_bytes())
    }

    /// Read and unseal raw bytes.
    pub fn read_sealed(&self, path: impl AsRef<Path>) -> StorageResult<Vec<u8>> {
        let key = self.key()?;
        let bytes = fs::read(path.as_ref())?;
        let blob = EncryptedBlob::from_bytes(&bytes)?;
        Ok(envelope::decrypt(key, &blob)?)
    }

    /// Check if a file exists.
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        File::open(path.as_ref()).is_ok()
    }

    /// Delete a file. Missing files are not an error.
    pub fn delete(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }
        match fs::remove_file(path.as_ref()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    // ========== Unsealed Raw Operations (audit logs) ==========

    /// Read raw bytes from a file.
    pub fn read_raw(&self, path: impl AsRef<Path>) -> StorageResult<Vec<u8>> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let mut file = File::open(path.as_ref())?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Create a directory (including parents).
    pub fn create_dir(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }
        fs::create_dir_all(path.as_ref())?;
        Ok(())
    }
}

/// Write to `<path>.tmp`, flush, then rename over `path`.
fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> StorageResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> StorageResult<()> {
    Ok(())
}
