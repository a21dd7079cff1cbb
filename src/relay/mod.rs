// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Relay Module
//!
//! Turns a memory descriptor signed by an authenticated wallet into a
//! gas-sponsored chain transaction.
//!
//! ## Rules
//!
//! - The signature is checked against the session's address and public key,
//!   never against anything the request body claims
//! - `(address, contentHash)` is relayed at most once; repeats return the
//!   recorded result
//! - Relays for one address run one at a time

pub mod coordinator;
pub mod locks;
pub mod payload;

pub use coordinator::{RelayCoordinator, RelayError, RelayOutcome};
pub use locks::AddressLocks;
pub use payload::{MemoryDescriptor, PayloadSignatureError, RelayPayload};
