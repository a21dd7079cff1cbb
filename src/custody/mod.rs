// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Key Custody
//!
//! Self-custodied wallet identity held on the user's device.
//!
//! - [`mnemonic`]: BIP-39 generation, normalization and validation
//! - [`keys`]: Ed25519 derivation, addresses and signature checks
//! - [`envelope`]: AES-256-GCM sealing of opaque blobs
//! - [`vault`]: the sealed store and the [`KeyCustody`] API
//!
//! The private key and seed never leave this module's process; only the
//! address, public key and signatures do.

pub mod envelope;
pub mod keys;
pub mod mnemonic;
pub mod vault;

pub use envelope::{EncryptedBlob, EnvelopeError, EnvelopeKey};
pub use keys::{derive_address, normalize_address, WalletIdentity};
pub use mnemonic::MnemonicError;
pub use vault::{CustodyError, KeyCustody, WalletPublic};
