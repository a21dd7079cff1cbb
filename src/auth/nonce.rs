// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Nonce Registry
//!
//! Remembers every consumed challenge nonce (and the signature that used it)
//! until the challenge could no longer pass the freshness check. A key that
//! is present and unexpired can never be consumed again.
//!
//! ## Pruning
//!
//! [`NonceRegistry::run`] sweeps expired entries every `prune_interval`
//! (default 60 s) and stops when its `CancellationToken` fires.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default interval between pruning sweeps.
const DEFAULT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// One-shot registry of consumed nonces.
pub struct NonceRegistry {
    /// key → expiry (Unix ms)
    entries: Mutex<HashMap<String, i64>>,
    prune_interval: Duration,
}

impl Default for NonceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            prune_interval: DEFAULT_PRUNE_INTERVAL,
        }
    }

    pub fn with_prune_interval(mut self, interval: Duration) -> Self {
        self.prune_interval = interval;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, i64>> {
        // A poisoned map is still a valid map; keep serving.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Atomically claim every key. Returns `false` and claims nothing if any
    /// key is already held and unexpired at `now_ms`.
    pub fn consume(&self, keys: &[&str], expires_at_ms: i64, now_ms: i64) -> bool {
        let mut entries = self.lock();
        let taken = keys
            .iter()
            .any(|k| entries.get(*k).is_some_and(|exp| *exp > now_ms));
        if taken {
            return false;
        }
        for key in keys {
            entries.insert((*key).to_string(), expires_at_ms);
        }
        true
    }

    /// Mark a key as used without checking it first.
    pub fn burn(&self, key: &str, expires_at_ms: i64) {
        let mut entries = self.lock();
        let slot = entries.entry(key.to_string()).or_insert(expires_at_ms);
        *slot = (*slot).max(expires_at_ms);
    }

    /// Drop entries that expired at or before `now_ms`. Returns how many.
    pub fn prune(&self, now_ms: i64) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, exp| *exp > now_ms);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the pruning loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(registry.clone().run(shutdown.clone()));
    /// ```
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            interval_secs = self.prune_interval.as_secs(),
            "Nonce pruner starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.prune_interval) => {
                    let removed = self.prune(super::challenge::now_ms());
                    if removed > 0 {
                        debug!(removed, remaining = self.len(), "Pruned expired nonces");
                    }
                },
                _ = shutdown.cancelled() => {
                    info!("Nonce pruner shutting down");
                    return;
                }
            }
        }
    }
}
