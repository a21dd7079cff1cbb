// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Memory Relay - Self-Custodied Wallet Auth & Sponsored Relay
//!
//! Wallets hold their own Ed25519 keys on the device. The server never sees a
//! user private key: it authenticates wallets with signed one-time challenges
//! and relays signed memory descriptors to a Move chain, paying gas from its
//! own relayer account.
//!
//! ## Modules
//!
//! - `custody` - Mnemonic wallets, sealed key storage, blob encryption
//! - `client` - Device worker pool and the HTTP wallet client
//! - `auth` - Challenges, nonce replay protection, session tokens
//! - `relay` - Signed payload verification and deduplicated relaying
//! - `chain` - Node REST client, sponsored submission, state reads
//! - `storage` - Sealed files, relay ledger (redb), audit log
//! - `api` - HTTP API handlers (Axum)

pub mod api;
pub mod auth;
pub mod chain;
pub mod client;
pub mod config;
pub mod custody;
pub mod error;
pub mod models;
pub mod relay;
pub mod state;
pub mod storage;

#[cfg(test)]
mod testing;
