// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into a
//! [`ServerConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for sealed files, ledger and audit log | `./data` |
//! | `APP_NAME` | Name embedded in challenge messages | `Memory Relay` |
//! | `CHAIN_NODE_URL` | Full node REST base URL | Aptos testnet |
//! | `CHAIN_EXPLORER_URL` | Explorer base URL for transaction links | Aptos explorer |
//! | `CHAIN_NETWORK` | Network name used in explorer links | `testnet` |
//! | `MEMORY_MODULE` | `<address>::<module>` with the memory functions | `0x1::memory_vault` |
//! | `COIN_STORE_TYPE` | Coin store resource read for balances | `0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>` |
//! | `RELAYER_PRIVATE_KEY` | Hex Ed25519 key of the sponsoring account | Generated under `DATA_DIR/relayer/` |
//! | `AUTH_TOKEN_SECRET` | HS256 secret for session tokens | Random per process |
//! | `AUTH_TOKEN_TTL_SECS` | Session lifetime | `86400` |
//! | `CHALLENGE_TTL_SECS` | Challenge freshness window | `300` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;

use zeroize::Zeroizing;

use crate::auth::challenge::DEFAULT_APP_NAME;
use crate::auth::token::DEFAULT_TOKEN_TTL_SECS;
use crate::auth::verifier::DEFAULT_CHALLENGE_TTL_MS;
use crate::chain::NetworkConfig;
use crate::storage::paths::DATA_ROOT;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Root of all persisted server state.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const APP_NAME_ENV: &str = "APP_NAME";
pub const CHAIN_NODE_URL_ENV: &str = "CHAIN_NODE_URL";
pub const CHAIN_EXPLORER_URL_ENV: &str = "CHAIN_EXPLORER_URL";
pub const CHAIN_NETWORK_ENV: &str = "CHAIN_NETWORK";
pub const MEMORY_MODULE_ENV: &str = "MEMORY_MODULE";
pub const COIN_STORE_TYPE_ENV: &str = "COIN_STORE_TYPE";

/// Hex private key for the account that pays gas on relays.
///
/// When unset, a key is generated on first start and kept sealed in the
/// data directory. Either way the account must be funded before relaying.
pub const RELAYER_PRIVATE_KEY_ENV: &str = "RELAYER_PRIVATE_KEY";

/// Shared secret for session tokens.
///
/// When unset, a random secret is generated at startup and sessions do not
/// survive a restart.
pub const AUTH_TOKEN_SECRET_ENV: &str = "AUTH_TOKEN_SECRET";

pub const AUTH_TOKEN_TTL_SECS_ENV: &str = "AUTH_TOKEN_TTL_SECS";
pub const CHALLENGE_TTL_SECS_ENV: &str = "CHALLENGE_TTL_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value: {value}")]
    Invalid { var: &'static str, value: String },

    #[error("Invalid bind address: {0}")]
    BindAddress(String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Everything the server reads from its environment.
#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub app_name: String,
    pub network: NetworkConfig,
    pub relayer_private_key: Option<Zeroizing<String>>,
    pub token_secret: Option<Zeroizing<String>>,
    pub token_ttl_secs: i64,
    pub challenge_ttl_ms: i64,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("data_dir", &self.data_dir)
            .field("app_name", &self.app_name)
            .field("network", &self.network)
            .field("relayer_private_key", &self.relayer_private_key.as_ref().map(|_| "[REDACTED]"))
            .field("token_secret", &self.token_secret.as_ref().map(|_| "[REDACTED]"))
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("challenge_ttl_ms", &self.challenge_ttl_ms)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DATA_ROOT),
            app_name: DEFAULT_APP_NAME.to_string(),
            network: NetworkConfig::default(),
            relayer_private_key: None,
            token_secret: None,
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            challenge_ttl_ms: DEFAULT_CHALLENGE_TTL_MS,
            log_format: LogFormat::default(),
        }
    }
}

fn parse_positive<T>(var: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(ConfigError::Invalid { var, value: raw }),
    }
}

impl ServerConfig {
    /// Read from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get(PORT_ENV) {
            Some(raw) => parse_positive::<u16>(PORT_ENV, raw)?,
            None => defaults.port,
        };
        let token_ttl_secs = match get(AUTH_TOKEN_TTL_SECS_ENV) {
            Some(raw) => parse_positive::<i64>(AUTH_TOKEN_TTL_SECS_ENV, raw)?,
            None => defaults.token_ttl_secs,
        };
        let challenge_ttl_ms = match get(CHALLENGE_TTL_SECS_ENV) {
            Some(raw) => parse_positive::<i64>(CHALLENGE_TTL_SECS_ENV, raw.clone())?
                .checked_mul(1000)
                .ok_or(ConfigError::Invalid {
                    var: CHALLENGE_TTL_SECS_ENV,
                    value: raw,
                })?,
            None => defaults.challenge_ttl_ms,
        };

        let node_url = get(CHAIN_NODE_URL_ENV).unwrap_or(defaults.network.node_url);
        url::Url::parse(&node_url).map_err(|_| ConfigError::Invalid {
            var: CHAIN_NODE_URL_ENV,
            value: node_url.clone(),
        })?;

        let network = NetworkConfig {
            network: get(CHAIN_NETWORK_ENV).unwrap_or(defaults.network.network),
            node_url,
            explorer_url: get(CHAIN_EXPLORER_URL_ENV).unwrap_or(defaults.network.explorer_url),
            memory_module: get(MEMORY_MODULE_ENV).unwrap_or(defaults.network.memory_module),
            coin_store_type: get(COIN_STORE_TYPE_ENV).unwrap_or(defaults.network.coin_store_type),
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or(defaults.host),
            port,
            data_dir: get(DATA_DIR_ENV).map(PathBuf::from).unwrap_or(defaults.data_dir),
            app_name: get(APP_NAME_ENV).unwrap_or(defaults.app_name),
            network,
            relayer_private_key: get(RELAYER_PRIVATE_KEY_ENV).map(Zeroizing::new),
            token_secret: get(AUTH_TOKEN_SECRET_ENV).map(Zeroizing::new),
            token_ttl_secs,
            challenge_ttl_ms,
            log_format,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::BindAddress(format!("{}:{}", self.host, self.port)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.app_name, "Memory Relay");
        assert_eq!(config.challenge_ttl_ms, 300_000);
        assert_eq!(config.token_ttl_secs, 86_400);
        assert_eq!(config.network.network, "testnet");
        assert!(config.relayer_private_key.is_none());
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.bind_addr().unwrap().port(), 8080);
    }

    #[test]
    fn reads_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("DATA_DIR", "/var/lib/relay"),
            ("APP_NAME", "Keepsake"),
            ("CHAIN_NODE_URL", "http://127.0.0.1:8080/v1"),
            ("CHAIN_NETWORK", "devnet"),
            ("MEMORY_MODULE", "0xcafe::vault"),
            ("CHALLENGE_TTL_SECS", "60"),
            ("AUTH_TOKEN_SECRET", "s3cret"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/relay"));
        assert_eq!(config.app_name, "Keepsake");
        assert_eq!(config.network.node_url, "http://127.0.0.1:8080/v1");
        assert_eq!(config.network.network, "devnet");
        assert_eq!(config.network.memory_module, "0xcafe::vault");
        assert_eq!(config.challenge_ttl_ms, 60_000);
        assert_eq!(config.token_secret.as_deref().map(String::as_str), Some("s3cret"));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_bad_numbers_and_urls() {
        assert!(ServerConfig::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("CHALLENGE_TTL_SECS", "0")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("CHAIN_NODE_URL", "not a url")])).is_err());
    }

    #[test]
    fn challenge_ttl_that_overflows_millis_is_rejected() {
        let huge = (i64::MAX / 1000 + 1).to_string();
        let err = ServerConfig::from_lookup(lookup(&[("CHALLENGE_TTL_SECS", huge.as_str())])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "CHALLENGE_TTL_SECS", .. }));

        let edge = (i64::MAX / 1000).to_string();
        let config = ServerConfig::from_lookup(lookup(&[("CHALLENGE_TTL_SECS", edge.as_str())])).unwrap();
        assert_eq!(config.challenge_ttl_ms, i64::MAX / 1000 * 1000);
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = ServerConfig::from_lookup(lookup(&[("PORT", " "), ("APP_NAME", "")])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.app_name, "Memory Relay");
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("AUTH_TOKEN_SECRET", "s3cret"),
            ("RELAYER_PRIVATE_KEY", "deadbeef"),
        ]))
        .unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("deadbeef"));
    }
}
