// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded relay ledger backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `relays`: `lowercase_address|content_hash` → serialized [`RelayRecord`]
//! - `pending`: same key → serialized [`PendingRelay`], written as soon as the
//!   node accepts a transaction and removed when it commits
//!
//! The key doubles as the idempotency key: a second relay of the same
//! content hash by the same address finds the first record (or the accepted
//! transaction) and is not resubmitted.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Table Definitions
// =============================================================================

const RELAYS: TableDefinition<&str, &[u8]> = TableDefinition::new("relays");
const PENDING: TableDefinition<&str, &[u8]> = TableDefinition::new("pending");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Records
// =============================================================================

/// A relay that reached the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelayRecord {
    /// Authenticated owner (lowercase `0x` address).
    pub address: String,
    pub content_hash: String,
    pub title: String,
    pub category: String,
    pub tx_hash: String,
    pub explorer_url: String,
    pub relayed_at: DateTime<Utc>,
}

/// A sponsored transaction the node accepted that has not been seen committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRelay {
    pub address: String,
    pub content_hash: String,
    pub title: String,
    pub category: String,
    pub tx_hash: String,
    /// Unix seconds after which the node can no longer commit it.
    pub expires_at_secs: i64,
    pub submitted_at: DateTime<Utc>,
}

// =============================================================================
// Key Helpers
// =============================================================================

fn make_key(address: &str, content_hash: &str) -> String {
    format!("{}|{}", address.to_lowercase(), content_hash)
}

fn make_prefix(address: &str) -> String {
    format!("{}|", address.to_lowercase())
}

/// `|` + 1 sorts directly after every key sharing the prefix.
fn make_prefix_end(address: &str) -> String {
    format!("{}}}", address.to_lowercase())
}

// =============================================================================
// RelayLedger
// =============================================================================

pub struct RelayLedger {
    db: Database,
}

impl RelayLedger {
    /// Open (or create) the ledger at the given path.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so read transactions never fail on a fresh file
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RELAYS)?;
            let _ = write_txn.open_table(PENDING)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Look up a prior relay of `content_hash` by `address`.
    pub fn get(&self, address: &str, content_hash: &str) -> LedgerResult<Option<RelayRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RELAYS)?;
        match table.get(make_key(address, content_hash).as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Record a relay unless one already exists for the same key, and drop
    /// any pending entry for it.
    ///
    /// Returns the record that is stored after the call.
    pub fn insert(&self, record: &RelayRecord) -> LedgerResult<RelayRecord> {
        let key = make_key(&record.address, &record.content_hash);
        let write_txn = self.db.begin_write()?;
        let stored = {
            let mut table = write_txn.open_table(RELAYS)?;
            let existing = match table.get(key.as_str())? {
                Some(value) => Some(serde_json::from_slice::<RelayRecord>(value.value())?),
                None => None,
            };
            match existing {
                Some(existing) => existing,
                None => {
                    let json = serde_json::to_vec(record)?;
                    table.insert(key.as_str(), json.as_slice())?;
                    record.clone()
                }
            }
        };
        {
            let mut pending = write_txn.open_table(PENDING)?;
            pending.remove(key.as_str())?;
        }
        write_txn.commit()?;
        Ok(stored)
    }

    /// The accepted-but-unconfirmed transaction for this key, if any.
    pub fn get_pending(&self, address: &str, content_hash: &str) -> LedgerResult<Option<PendingRelay>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PENDING)?;
        match table.get(make_key(address, content_hash).as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn record_pending(&self, pending: &PendingRelay) -> LedgerResult<()> {
        let key = make_key(&pending.address, &pending.content_hash);
        let json = serde_json::to_vec(pending)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PENDING)?;
            table.insert(key.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Forget a pending transaction that can no longer commit.
    pub fn clear_pending(&self, address: &str, content_hash: &str) -> LedgerResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PENDING)?;
            table.remove(make_key(address, content_hash).as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// All relays by an address, oldest first.
    pub fn list_by_address(&self, address: &str) -> LedgerResult<Vec<RelayRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RELAYS)?;

        let start = make_prefix(address);
        let end = make_prefix_end(address);

        let mut records = Vec::new();
        for entry in table.range(start.as_str()..end.as_str())? {
            let (_, value) = entry?;
            records.push(serde_json::from_slice::<RelayRecord>(value.value())?);
        }
        records.sort_by_key(|r| r.relayed_at);
        Ok(records)
    }

    /// Cheap read used by readiness checks.
    pub fn health_check(&self) -> LedgerResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(RELAYS)?;
        Ok(())
    }
}
