// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Chain Module
//!
//! REST access to a Move full node.
//!
//! - [`client`]: HTTP plumbing and error extraction
//! - [`reader`]: balances and memory lists (best effort, never errors)
//! - [`submitter`]: relayer-signed, gas-sponsored `record_memory_for` calls
//! - [`cache`]: short-lived LRU for memory lists

pub mod cache;
pub mod client;
pub mod reader;
pub mod submitter;
pub mod types;

pub use cache::MemoryCache;
pub use client::{ChainError, NodeClient};
pub use reader::{decode_hex_text, parse_memories, ChainStateReader, HexDecodeError};
pub use submitter::{ChainSubmitter, NodeSubmitter};
pub use types::{ChainMemoryRecord, MemoryRecordCall, NetworkConfig, PendingSubmission, SubmitResult};
