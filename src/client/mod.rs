// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Device-side pieces: the blocking worker pool custody runs on, and the
//! HTTP client that signs locally and talks to the relay server.

pub mod pool;
pub mod wallet;

pub use pool::{PoolError, WorkerPool};
pub use wallet::{ClientError, WalletClient};
