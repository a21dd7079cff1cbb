// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state for both sides of the system.
//!
//! ## Storage Layout
//!
//! ```text
//! <DATA_DIR>/
//!   device.key            # Sealing key for *.sealed files (0600)
//!   secrets/
//!     wallet.sealed       # Client wallet secrets (KeyCustody)
//!   relayer/
//!     meta.json           # Relayer address + public key (sealed)
//!     key.sealed          # Relayer private key
//!   relays.redb           # Relay ledger (idempotency + history)
//!   audit/
//!     {date}/events.jsonl # Daily audit logs
//! ```
//!
//! Sealed files are AES-256-GCM encrypted and written atomically; see
//! [`encrypted_fs`].

pub mod audit;
pub mod encrypted_fs;
pub mod paths;
pub mod relay_ledger;
pub mod relayer;

pub use audit::{AuditEvent, AuditEventType, AuditRepository};
pub use encrypted_fs::{EncryptedStorage, StorageError, StorageResult};
pub use paths::StoragePaths;
pub use relay_ledger::{LedgerError, PendingRelay, RelayLedger, RelayRecord};
pub use relayer::{RelayerAccount, RelayerMetadata, RelayerRepository};
