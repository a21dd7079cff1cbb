// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-only account endpoints.
//!
//! Both reads are best effort: an unfunded account is a zero balance and an
//! unreachable node is an empty list, never an error.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    custody::keys::{is_valid_address, normalize_address},
    error::ApiError,
    models::{ApiResponse, BalanceData, MemoriesData},
    state::AppState,
};

fn parse_address(raw: &str) -> Result<String, ApiError> {
    let address = normalize_address(raw);
    if is_valid_address(&address) {
        Ok(address)
    } else {
        Err(ApiError::bad_request(
            "address must be 0x followed by 64 hex characters",
        ))
    }
}

/// Native coin balance of an address, in the smallest unit.
#[utoipa::path(
    get,
    path = "/v1/accounts/{address}/balance",
    tag = "Accounts",
    params(
        ("address" = String, Path, description = "Wallet address")
    ),
    responses(
        (status = 200, description = "Balance (0 when the account holds no coin store)", body = ApiResponse<BalanceData>),
        (status = 400, description = "Invalid address", body = crate::error::ErrorBody)
    )
)]
pub async fn get_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<BalanceData>>, ApiError> {
    let address = parse_address(&address)?;
    let balance = state.reader.get_balance(&address).await;
    Ok(Json(ApiResponse::ok(BalanceData { address, balance })))
}

/// Memories recorded on chain for an address.
#[utoipa::path(
    get,
    path = "/v1/accounts/{address}/memories",
    tag = "Accounts",
    params(
        ("address" = String, Path, description = "Wallet address")
    ),
    responses(
        (status = 200, description = "Decoded memory records", body = ApiResponse<MemoriesData>),
        (status = 400, description = "Invalid address", body = crate::error::ErrorBody)
    )
)]
pub async fn get_memories(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<MemoriesData>>, ApiError> {
    let address = parse_address(&address)?;
    let memories = state.reader.fetch_memories(&address).await;
    let total = memories.len();
    Ok(Json(ApiResponse::ok(MemoriesData {
        address,
        memories,
        total,
    })))
}
