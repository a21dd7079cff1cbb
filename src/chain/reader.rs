// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-only chain queries.
//!
//! Reads never fail outward: a missing account or an unreachable node is a
//! zero balance or an empty list. Text fields the chain returns as
//! `0x`-prefixed hex bytes are decoded to UTF-8; anything else passes
//! through unchanged.

use std::sync::Arc;

use serde_json::{json, Value};

use super::cache::MemoryCache;
use super::client::{parse_u64_field, ChainError, NodeClient};
use super::types::ChainMemoryRecord;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexDecodeError {
    #[error("missing 0x prefix")]
    MissingPrefix,

    #[error("odd number of hex digits")]
    OddLength,

    #[error("invalid hex digit at position {0}")]
    InvalidDigit(usize),

    #[error("decoded bytes are not UTF-8")]
    InvalidUtf8,
}

/// Decode `0x`-prefixed hex into UTF-8 text, two digits per byte.
pub fn decode_hex_text(input: &str) -> Result<String, HexDecodeError> {
    let digits = input.strip_prefix("0x").ok_or(HexDecodeError::MissingPrefix)?;
    if digits.len() % 2 != 0 {
        return Err(HexDecodeError::OddLength);
    }

    let bytes = hex::decode(digits).map_err(|e| match e {
        hex::FromHexError::InvalidHexCharacter { index, .. } => HexDecodeError::InvalidDigit(index),
        hex::FromHexError::OddLength => HexDecodeError::OddLength,
        hex::FromHexError::InvalidStringLength => HexDecodeError::OddLength,
    })?;

    String::from_utf8(bytes).map_err(|_| HexDecodeError::InvalidUtf8)
}

/// Hex-decode a field when it looks like hex text, otherwise keep it.
pub fn decode_field(raw: &str) -> String {
    if raw.starts_with("0x") {
        decode_hex_text(raw).unwrap_or_else(|_| raw.to_string())
    } else {
        raw.to_string()
    }
}

fn text_field(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(decode_field)
}

fn decode_record(item: &Value, synthetic_id: String) -> Option<ChainMemoryRecord> {
    let (title, content_hash, category) = match item {
        Value::Object(map) => (
            text_field(map.get("title")),
            text_field(map.get("content_hash").or_else(|| map.get("contentHash"))),
            text_field(map.get("category")),
        ),
        Value::Array(fields) => (
            text_field(fields.first()),
            text_field(fields.get(1)),
            text_field(fields.get(2)),
        ),
        _ => return None,
    };

    Some(ChainMemoryRecord {
        synthetic_id,
        title: title?,
        content_hash: content_hash?,
        category: category.filter(|c| !c.is_empty()),
    })
}

/// Decode a `get_memories` view result.
///
/// `[]`, `[[]]`, `[null]` and non-array shapes all mean "no records".
/// Ids are `<now_ms>-<index>`.
pub fn parse_memories(view_result: &Value, now_ms: i64) -> Vec<ChainMemoryRecord> {
    let Some(inner) = view_result
        .as_array()
        .and_then(|outer| outer.first())
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    inner
        .iter()
        .enumerate()
        .filter_map(|(index, item)| decode_record(item, format!("{now_ms}-{index}")))
        .collect()
}

/// Extract `data.coin.value` from a coin store resource.
pub fn parse_coin_balance(resource: &Value) -> u64 {
    resource
        .pointer("/data/coin/value")
        .and_then(parse_u64_field)
        .unwrap_or(0)
}

/// Stateless reader over a [`NodeClient`], with an optional list cache.
#[derive(Clone)]
pub struct ChainStateReader {
    node: NodeClient,
    cache: Option<Arc<MemoryCache>>,
}

impl ChainStateReader {
    pub fn new(node: NodeClient) -> Self {
        Self { node, cache: None }
    }

    pub fn with_cache(mut self, cache: Arc<MemoryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn node(&self) -> &NodeClient {
        &self.node
    }

    /// Smallest-unit balance of the native coin. Absent or unreadable is `0`.
    pub async fn get_balance(&self, address: &str) -> u64 {
        let path = format!(
            "/accounts/{}/resource/{}",
            address,
            self.node.network().coin_store_type
        );
        match self.node.get(&path).await {
            Ok(resource) => parse_coin_balance(&resource),
            Err(e) => {
                tracing::debug!(address = %address, error = %e, "Balance read degraded to zero");
                0
            }
        }
    }

    /// Records stored for `address`. Errors degrade to an empty list.
    pub async fn fetch_memories(&self, address: &str) -> Vec<ChainMemoryRecord> {
        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(address)) {
            return cached;
        }

        match self.query_memories(address).await {
            Ok(records) => {
                if let Some(cache) = &self.cache {
                    cache.put(address, records.clone());
                }
                records
            }
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "Memory read degraded to empty");
                Vec::new()
            }
        }
    }

    async fn query_memories(&self, address: &str) -> Result<Vec<ChainMemoryRecord>, ChainError> {
        let body = json!({
            "function": self.node.network().view_function(),
            "type_arguments": [],
            "arguments": [address],
        });
        let result = self.node.post("/view", &body).await?;
        Ok(parse_memories(&result, chrono::Utc::now().timestamp_millis()))
    }

    /// Drop any cached list for `address`.
    pub fn invalidate(&self, address: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate(address);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::types::NetworkConfig;
    use crate::testing::spawn_stub;
    use axum::{
        extract::Path,
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn decode_hex_text_examples() {
        assert_eq!(decode_hex_text("0x74657374").unwrap(), "test");
        assert_eq!(decode_hex_text("0x48656c6c6f").unwrap(), "Hello");
        assert_eq!(decode_hex_text("0x").unwrap(), "");
    }

    #[test]
    fn decode_hex_text_errors() {
        assert_eq!(decode_hex_text("7465"), Err(HexDecodeError::MissingPrefix));
        assert_eq!(decode_hex_text("0x746"), Err(HexDecodeError::OddLength));
        assert!(matches!(
            decode_hex_text("0x74zz"),
            Err(HexDecodeError::InvalidDigit(_))
        ));
        assert_eq!(decode_hex_text("0xff"), Err(HexDecodeError::InvalidUtf8));
    }

    #[test]
    fn decode_field_passes_through_non_hex() {
        assert_eq!(decode_field("plain title"), "plain title");
        assert_eq!(decode_field("0x74657374"), "test");
        assert_eq!(decode_field("0xnothex"), "0xnothex");
    }

    #[test]
    fn empty_shapes_are_empty_lists() {
        for shape in [json!([]), json!([[]]), json!([null]), json!({}), json!(null)] {
            assert!(parse_memories(&shape, 1).is_empty(), "shape {shape}");
        }
    }

    #[test]
    fn parse_memories_decodes_objects_and_assigns_ids() {
        let view = json!([[
            {"title": "0x74657374", "content_hash": "0x62616679", "category": "0x70686f746f"},
            {"title": "Plain", "content_hash": "QmHash"}
        ]]);
        let records = parse_memories(&view, 1_000);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].title, "test");
        assert_eq!(records[0].content_hash, "bafy");
        assert_eq!(records[0].category.as_deref(), Some("photo"));
        assert_eq!(records[0].synthetic_id, "1000-0");

        assert_eq!(records[1].title, "Plain");
        assert_eq!(records[1].content_hash, "QmHash");
        assert_eq!(records[1].category, None);
        assert_eq!(records[1].synthetic_id, "1000-1");
    }

    #[test]
    fn parse_memories_accepts_tuple_records() {
        let view = json!([[["0x48656c6c6f", "hash"]]]);
        let records = parse_memories(&view, 5);
        assert_eq!(records[0].title, "Hello");
        assert_eq!(records[0].content_hash, "hash");
    }

    #[test]
    fn coin_balance_parsing() {
        assert_eq!(
            parse_coin_balance(&json!({"data": {"coin": {"value": "12345"}}})),
            12345
        );
        assert_eq!(parse_coin_balance(&json!({"data": {}})), 0);
    }

    fn reader_for(node_url: String) -> ChainStateReader {
        let network = NetworkConfig {
            node_url,
            ..NetworkConfig::default()
        };
        ChainStateReader::new(NodeClient::new(network).unwrap())
    }

    #[tokio::test]
    async fn balance_reads_resource_and_defaults_to_zero() {
        let router = Router::new().route(
            "/v1/accounts/{address}/resource/{resource}",
            get(|Path((address, resource)): Path<(String, String)>| async move {
                assert!(resource.starts_with("0x1::coin::CoinStore"));
                if address == "0xfunded" {
                    (
                        StatusCode::OK,
                        Json(json!({"type": resource, "data": {"coin": {"value": "500"}}})),
                    )
                } else {
                    (
                        StatusCode::NOT_FOUND,
                        Json(json!({"message": "Resource not found", "error_code": "resource_not_found"})),
                    )
                }
            }),
        );
        let reader = reader_for(spawn_stub(router).await);

        assert_eq!(reader.get_balance("0xfunded").await, 500);
        assert_eq!(reader.get_balance("0xempty").await, 0);
    }

    #[tokio::test]
    async fn balance_is_zero_when_node_unreachable() {
        let reader = reader_for("http://127.0.0.1:9/v1".to_string());
        assert_eq!(reader.get_balance("0xabc").await, 0);
        assert!(reader.fetch_memories("0xabc").await.is_empty());
    }

    #[tokio::test]
    async fn fetch_memories_posts_view_call() {
        let router = Router::new().route(
            "/v1/view",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["function"], "0x1::memory_vault::get_memories");
                assert_eq!(body["type_arguments"], json!([]));
                assert_eq!(body["arguments"], json!(["0xowner"]));
                Json(json!([[{"title": "0x74657374", "content_hash": "h1"}]]))
            }),
        );
        let reader = reader_for(spawn_stub(router).await);

        let records = reader.fetch_memories("0xowner").await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "test");
    }

    #[tokio::test]
    async fn fetch_memories_empty_state() {
        let router = Router::new().route("/v1/view", post(|| async { Json(json!([[]])) }));
        let reader = reader_for(spawn_stub(router).await);
        assert!(reader.fetch_memories("0xowner").await.is_empty());
    }

    #[tokio::test]
    async fn cached_reads_skip_the_node_until_invalidated() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/v1/view",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!([[{"title": "t", "content_hash": "h"}]]))
                }
            }),
        );
        let reader = reader_for(spawn_stub(router).await).with_cache(Arc::new(MemoryCache::default()));

        reader.fetch_memories("0xowner").await;
        reader.fetch_memories("0xowner").await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        reader.invalidate("0xowner");
        reader.fetch_memories("0xowner").await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
