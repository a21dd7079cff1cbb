// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Data directory and sealing key availability.
    pub data_dir: String,
    /// Relay ledger readability.
    pub ledger: String,
    /// Chain node reachability. Reads degrade without it; relays fail.
    pub node: String,
}

/// Liveness response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

fn status_of<E>(result: Result<(), E>) -> String {
    match result {
        Ok(()) => "ok",
        Err(_) => "unavailable",
    }
    .to_string()
}

/// Health check endpoint handler.
///
/// Returns 200 if all checks pass, 503 if any check fails.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Service is unhealthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let checks = HealthChecks {
        service: "ok".to_string(),
        data_dir: status_of(state.storage().health_check()),
        ledger: status_of(state.ledger.health_check()),
        node: status_of(state.reader.node().health_check().await),
    };

    let all_ok = [&checks.data_dir, &checks.ledger, &checks.node]
        .iter()
        .all(|s| s.as_str() == "ok");

    let response = ReadyResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks,
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness handler.
///
/// Always returns 200 if the process is running.
/// Does not check dependencies - use readiness for that.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness handler.
///
/// Returns 200 only if all dependencies are available.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{spawn_stub, TestApp};
    use axum::{routing::get, Router};

    #[tokio::test]
    async fn healthy_with_reachable_node() {
        let node = spawn_stub(Router::new().route(
            "/v1/",
            get(|| async { Json(serde_json::json!({"chain_id": 2})) }),
        ))
        .await;
        let app = TestApp::with_node_url(&node).await;

        let (status, Json(body)) = health(State(app.state.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.checks.ledger, "ok");
    }

    #[tokio::test]
    async fn node_without_chain_id_is_unavailable() {
        let node = spawn_stub(Router::new().route(
            "/v1/",
            get(|| async { Json(serde_json::json!({"ledger_version": "9"})) }),
        ))
        .await;
        let app = TestApp::with_node_url(&node).await;

        let (status, Json(body)) = readiness(State(app.state.clone())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.checks.node, "unavailable");
    }

    #[tokio::test]
    async fn degraded_without_node() {
        let app = TestApp::new().await;
        let (status, Json(body)) = readiness(State(app.state.clone())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "degraded");
        assert_eq!(body.checks.node, "unavailable");
        assert_eq!(body.checks.data_dir, "ok");
    }

    #[tokio::test]
    async fn liveness_is_always_ok() {
        assert_eq!(liveness().await.0.status, "ok");
    }
}
