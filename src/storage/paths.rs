// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the on-disk storage layout.

use std::path::{Path, PathBuf};

/// Default data directory when `DATA_DIR` is not set.
pub const DATA_ROOT: &str = "./data";

/// Storage path utilities shared by the wallet store and the relay server.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all persisted data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Sealing key for every encrypted file under this root.
    pub fn device_key(&self) -> PathBuf {
        self.root.join("device.key")
    }

    // ========== Wallet Secret Paths ==========

    /// Directory holding the sealed wallet secrets.
    pub fn secrets_dir(&self) -> PathBuf {
        self.root.join("secrets")
    }

    /// Sealed `{privateKey, publicKey, address, mnemonic, envelopeKey}` record.
    pub fn wallet_secret(&self) -> PathBuf {
        self.secrets_dir().join("wallet.sealed")
    }

    // ========== Relayer Paths ==========

    /// Directory for the sponsoring account.
    pub fn relayer_dir(&self) -> PathBuf {
        self.root.join("relayer")
    }

    /// Public relayer metadata (address, public key).
    pub fn relayer_meta(&self) -> PathBuf {
        self.relayer_dir().join("meta.json")
    }

    /// Sealed relayer private key.
    pub fn relayer_key(&self) -> PathBuf {
        self.relayer_dir().join("key.sealed")
    }

    // ========== Relay Ledger ==========

    /// Embedded redb database recording completed relays.
    pub fn relay_ledger(&self) -> PathBuf {
        self.root.join("relays.redb")
    }

    // ========== Audit Log Paths ==========

    /// Directory containing audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Directory for a specific date's audit logs.
    pub fn audit_date_dir(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date)
    }

    /// Path to a daily audit events file (JSONL format).
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_date_dir(date).join("events.jsonl")
    }
}
