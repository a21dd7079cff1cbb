// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet challenge-response endpoints.
//!
//! The client fetches a challenge, signs its message with the wallet key
//! and posts the signature back. `verify` opens a session; `link` proves a
//! second wallet for an existing session.

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::json;

use crate::{
    audit_log,
    auth::{
        challenge::{build_challenge, now_ms},
        Auth, Challenge, ChallengeMode, Verified, VerifyRequest,
    },
    custody::keys::{is_valid_address, normalize_address},
    error::ApiError,
    models::{ApiResponse, ChallengeQuery, LinkData, TokenData},
    state::AppState,
    storage::{AuditEvent, AuditEventType},
};

/// Run the verifier and audit the outcome.
fn verify_and_audit(state: &AppState, request: &VerifyRequest) -> Result<Verified, ApiError> {
    let address = normalize_address(&request.address);
    match state.authenticator.verify(request, now_ms()) {
        Ok(verified) => Ok(verified),
        Err(e) => {
            tracing::warn!(address = %address, reason = %e, "Challenge verification failed");
            audit_log!(
                state.storage(),
                AuditEvent::new(AuditEventType::AuthFailure)
                    .with_address(&address)
                    .with_resource("nonce", request.nonce.trim())
                    .failed(e.error_code())
            );
            Err(e.into())
        }
    }
}

/// Issue a one-time challenge for a wallet address.
///
/// Clients may also build the challenge themselves from the fixed template;
/// the server only checks the template, the timestamp and the nonce.
#[utoipa::path(
    get,
    path = "/v1/auth/challenge",
    tag = "Auth",
    params(ChallengeQuery),
    responses(
        (status = 200, description = "Challenge to sign", body = ApiResponse<Challenge>),
        (status = 400, description = "Invalid address", body = crate::error::ErrorBody)
    )
)]
pub async fn get_challenge(
    State(state): State<AppState>,
    Query(query): Query<ChallengeQuery>,
) -> Result<Json<ApiResponse<Challenge>>, ApiError> {
    let address = normalize_address(&query.address);
    if !is_valid_address(&address) {
        return Err(ApiError::bad_request(
            "address must be 0x followed by 64 hex characters",
        ));
    }

    let challenge = build_challenge(
        state.authenticator.app_name(),
        &address,
        query.mode,
        now_ms(),
    );

    audit_log!(
        state.storage(),
        AuditEvent::new(AuditEventType::ChallengeIssued)
            .with_address(&address)
            .with_resource("nonce", &challenge.nonce)
            .with_details(json!({ "mode": query.mode }))
    );

    Ok(Json(ApiResponse::ok(challenge)))
}

/// Verify a signed challenge and open a session.
#[utoipa::path(
    post,
    path = "/v1/auth/verify",
    tag = "Auth",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Session issued", body = ApiResponse<TokenData>),
        (status = 400, description = "Malformed challenge", body = crate::error::ErrorBody),
        (status = 401, description = "Address mismatch, bad signature or expired", body = crate::error::ErrorBody),
        (status = 409, description = "Nonce already used", body = crate::error::ErrorBody)
    )
)]
pub async fn verify(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<ApiResponse<TokenData>>, ApiError> {
    let Verified { token, session } = verify_and_audit(&state, &request)?;

    tracing::info!(address = %session.subject_address, "Wallet authenticated");
    audit_log!(
        state.storage(),
        AuditEventType::AuthSuccess,
        &session.subject_address,
        "nonce",
        request.nonce.trim()
    );

    Ok(Json(ApiResponse::ok(TokenData {
        token,
        address: session.subject_address,
        expires_at: session.expires_at,
    })))
}

/// Prove ownership of another wallet and link it to the session's account.
///
/// Uses the same verification path as `/v1/auth/verify`; the session token
/// produced by that path is discarded.
#[utoipa::path(
    post,
    path = "/v1/auth/link",
    tag = "Auth",
    security(("bearer_auth" = [])),
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Wallet linked", body = ApiResponse<LinkData>),
        (status = 400, description = "Malformed challenge or self-link", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized or invalid signature", body = crate::error::ErrorBody),
        (status = 409, description = "Nonce already used", body = crate::error::ErrorBody)
    )
)]
pub async fn link(
    Auth(account): Auth,
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<ApiResponse<LinkData>>, ApiError> {
    if normalize_address(&request.address) == account.subject_address {
        return Err(ApiError::bad_request("wallet is already the session's address"));
    }

    let Verified { session: linked, .. } = verify_and_audit(&state, &request)?;

    tracing::info!(
        account = %account.subject_address,
        linked = %linked.subject_address,
        "Wallet linked"
    );
    audit_log!(
        state.storage(),
        AuditEvent::new(AuditEventType::AccountLinked)
            .with_address(&account.subject_address)
            .with_resource("address", &linked.subject_address)
            .with_details(json!({ "mode": ChallengeMode::Link }))
    );

    Ok(Json(ApiResponse::with_message(
        "Wallet linked",
        LinkData {
            account: account.subject_address,
            linked_address: linked.subject_address,
        },
    )))
}
