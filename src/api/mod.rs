// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{AuthToken, Challenge, ChallengeMode, VerifyRequest},
    chain::ChainMemoryRecord,
    error::ErrorBody,
    models::{BalanceData, LinkData, MemoriesData, RelayData, RelayListData, TokenData, TxInfo},
    relay::{MemoryDescriptor, RelayPayload},
    state::AppState,
    storage::RelayRecord,
};

pub mod accounts;
pub mod auth;
pub mod health;
pub mod relay;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/auth/challenge", get(auth::get_challenge))
        .route("/auth/verify", post(auth::verify))
        .route("/auth/link", post(auth::link))
        .route("/memories/relay", post(relay::relay_memory))
        .route("/memories/relays", get(relay::list_relays))
        .route("/accounts/{address}/balance", get(accounts::get_balance))
        .route("/accounts/{address}/memories", get(accounts::get_memories));

    Router::new()
        .nest("/v1", v1_routes)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::get_challenge,
        auth::verify,
        auth::link,
        relay::relay_memory,
        relay::list_relays,
        accounts::get_balance,
        accounts::get_memories,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            Challenge,
            ChallengeMode,
            VerifyRequest,
            AuthToken,
            TokenData,
            LinkData,
            MemoryDescriptor,
            RelayPayload,
            RelayRecord,
            RelayData,
            RelayListData,
            TxInfo,
            BalanceData,
            MemoriesData,
            ChainMemoryRecord,
            ErrorBody
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Wallet challenge-response authentication"),
        (name = "Relay", description = "Gas-sponsored memory relay"),
        (name = "Accounts", description = "Chain balance and memory reads"),
        (name = "Health", description = "Liveness and readiness checks")
    )
)]
pub struct ApiDoc;
