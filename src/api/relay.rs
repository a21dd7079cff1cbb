// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sponsored memory relay endpoints.

use axum::{extract::State, Json};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{ApiResponse, RelayData, RelayListData},
    relay::RelayPayload,
    state::AppState,
};

/// Relay a signed memory descriptor as a gas-sponsored transaction.
///
/// The signature must come from the session's wallet. A repeat of an
/// already relayed `contentHash` returns the recorded transaction instead
/// of submitting again.
#[utoipa::path(
    post,
    path = "/v1/memories/relay",
    tag = "Relay",
    security(("bearer_auth" = [])),
    request_body = RelayPayload,
    responses(
        (status = 200, description = "Memory recorded on chain", body = ApiResponse<RelayData>),
        (status = 401, description = "Unauthorized or signature not from the session wallet", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid descriptor fields", body = crate::error::ErrorBody),
        (status = 502, description = "Chain submission failed", body = crate::error::ErrorBody)
    )
)]
pub async fn relay_memory(
    Auth(session): Auth,
    State(state): State<AppState>,
    Json(payload): Json<RelayPayload>,
) -> Result<Json<ApiResponse<RelayData>>, ApiError> {
    let outcome = state.coordinator.relay(&session, payload).await?;

    let message = if outcome.deduplicated {
        "Memory already relayed"
    } else {
        "Memory relayed"
    };
    Ok(Json(ApiResponse::with_message(
        message,
        RelayData::from(outcome.record),
    )))
}

/// List memories relayed for the authenticated wallet.
#[utoipa::path(
    get,
    path = "/v1/memories/relays",
    tag = "Relay",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Relays for the session wallet", body = ApiResponse<RelayListData>),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody)
    )
)]
pub async fn list_relays(
    Auth(session): Auth,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<RelayListData>>, ApiError> {
    let relays = state.coordinator.list_relays(&session.subject_address)?;
    let total = relays.len();
    Ok(Json(ApiResponse::ok(RelayListData { relays, total })))
}
