// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared application state.
//!
//! Every service is constructed once in [`AppState::build`] and handed to
//! handlers through axum's `State`. Tests assemble the same state from
//! parts with [`AppState::new`] so the chain seam can be swapped.

use std::sync::Arc;

use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

use crate::auth::{ChallengeAuthenticator, NonceRegistry, TokenIssuer};
use crate::chain::{ChainError, ChainStateReader, ChainSubmitter, MemoryCache, NodeClient, NodeSubmitter};
use crate::config::ServerConfig;
use crate::relay::RelayCoordinator;
use crate::storage::{
    EncryptedStorage, LedgerError, RelayLedger, RelayerAccount, RelayerRepository, StorageError,
    StoragePaths,
};

/// Failures while assembling the state at startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("relay ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("chain client: {0}")]
    Chain(#[from] ChainError),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub storage: Arc<EncryptedStorage>,
    pub ledger: Arc<RelayLedger>,
    pub authenticator: Arc<ChallengeAuthenticator>,
    pub coordinator: Arc<RelayCoordinator>,
    pub reader: ChainStateReader,
}

impl AppState {
    /// Assemble state from already-built services.
    pub fn new(
        config: ServerConfig,
        storage: Arc<EncryptedStorage>,
        ledger: Arc<RelayLedger>,
        authenticator: ChallengeAuthenticator,
        submitter: Arc<dyn ChainSubmitter>,
        reader: ChainStateReader,
    ) -> Self {
        let coordinator = RelayCoordinator::new(
            ledger.clone(),
            submitter,
            reader.clone(),
            storage.clone(),
        );
        Self {
            config: Arc::new(config),
            storage,
            ledger,
            authenticator: Arc::new(authenticator),
            coordinator: Arc::new(coordinator),
            reader,
        }
    }

    /// Build every service from configuration.
    ///
    /// Initializes the data directory, opens the relay ledger, loads or
    /// generates the relayer key and connects the node client.
    pub fn build(config: ServerConfig) -> Result<Self, StartupError> {
        let mut storage = EncryptedStorage::new(StoragePaths::new(&config.data_dir));
        storage.initialize()?;

        let ledger = RelayLedger::open(&storage.paths().relay_ledger())?;

        let relayer = match config.relayer_private_key.as_ref() {
            Some(hex_key) => RelayerAccount::from_hex(hex_key)?,
            None => RelayerRepository::new(&storage).bootstrap()?,
        };
        tracing::info!(relayer = %relayer.address(), "Relayer account loaded");

        let node = NodeClient::new(config.network.clone())?;
        let reader = ChainStateReader::new(node.clone()).with_cache(Arc::new(MemoryCache::default()));
        let submitter = NodeSubmitter::new(node, relayer);

        let authenticator = ChallengeAuthenticator::new(
            config.app_name.clone(),
            config.challenge_ttl_ms,
            Arc::new(NonceRegistry::new()),
            TokenIssuer::new(&token_secret(&config), config.token_ttl_secs),
        );

        Ok(Self::new(
            config,
            Arc::new(storage),
            Arc::new(ledger),
            authenticator,
            Arc::new(submitter),
            reader,
        ))
    }

    pub fn storage(&self) -> &EncryptedStorage {
        &self.storage
    }
}

/// Configured secret, or 32 random bytes for this process.
fn token_secret(config: &ServerConfig) -> Zeroizing<Vec<u8>> {
    match config.token_secret.as_ref() {
        Some(secret) => Zeroizing::new(secret.as_bytes().to_vec()),
        None => {
            tracing::warn!("AUTH_TOKEN_SECRET not set; sessions will not survive a restart");
            let mut bytes = Zeroizing::new(vec![0u8; 32]);
            OsRng.fill_bytes(&mut bytes);
            bytes
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn build_bootstraps_relayer_and_ledger() {
        let temp = TempDir::new().unwrap();
        let config = ServerConfig {
            data_dir: temp.path().to_path_buf(),
            ..ServerConfig::default()
        };

        let state = AppState::build(config.clone()).unwrap();
        assert!(state.storage().is_initialized());
        assert!(state.ledger.health_check().is_ok());
        let meta = RelayerRepository::new(state.storage()).metadata().unwrap();
        drop(state);

        // Second start reuses the sealed relayer key.
        let state = AppState::build(config).unwrap();
        assert_eq!(
            RelayerRepository::new(state.storage()).metadata().unwrap().address,
            meta.address
        );
    }

    #[test]
    fn build_rejects_malformed_relayer_key() {
        let temp = TempDir::new().unwrap();
        let config = ServerConfig {
            data_dir: temp.path().to_path_buf(),
            relayer_private_key: Some(Zeroizing::new("abcd".to_string())),
            ..ServerConfig::default()
        };
        assert!(matches!(
            AppState::build(config),
            Err(StartupError::Storage(_))
        ));
    }

    #[test]
    fn configured_token_secret_is_used() {
        let config = ServerConfig {
            token_secret: Some(Zeroizing::new("shared".to_string())),
            ..ServerConfig::default()
        };
        assert_eq!(token_secret(&config).as_slice(), b"shared");
        assert_eq!(token_secret(&ServerConfig::default()).len(), 32);
    }
}
