// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! [`AuthError`] covers bearer-token extraction; [`ChallengeError`] covers
//! challenge verification. Both render as
//! `{"success": false, "message": ..., "error_code": ...}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Bearer token failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingAuthHeader,

    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,

    #[error("Token is malformed")]
    MalformedToken,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Internal authentication error: {0}")]
    InternalError(String),
}

/// Challenge verification failures, in the order the checks run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChallengeError {
    /// Input could not be checked at all. Nothing was recorded.
    #[error("Malformed challenge: {0}")]
    MalformedChallenge(String),

    #[error("Public key does not belong to the claimed address")]
    AddressMismatch,

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Challenge has expired")]
    Expired,

    #[error("Challenge nonce has already been used")]
    ReplayDetected,

    #[error("Could not issue session: {0}")]
    TokenIssue(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    success: bool,
    message: String,
    error_code: String,
}

fn error_response(status: StatusCode, message: String, error_code: &str) -> Response {
    let body = Json(AuthErrorBody {
        success: false,
        message,
        error_code: error_code.to_string(),
    });
    (status, body).into_response()
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl ChallengeError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ChallengeError::MalformedChallenge(_) => "malformed_challenge",
            ChallengeError::AddressMismatch => "address_mismatch",
            ChallengeError::SignatureInvalid => "signature_invalid",
            ChallengeError::Expired => "expired",
            ChallengeError::ReplayDetected => "replay_detected",
            ChallengeError::TokenIssue(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ChallengeError::MalformedChallenge(_) => StatusCode::BAD_REQUEST,
            ChallengeError::ReplayDetected => StatusCode::CONFLICT,
            ChallengeError::TokenIssue(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        error_response(self.status_code(), self.to_string(), self.error_code())
    }
}

impl IntoResponse for ChallengeError {
    fn into_response(self) -> Response {
        error_response(self.status_code(), self.to_string(), self.error_code())
    }
}
