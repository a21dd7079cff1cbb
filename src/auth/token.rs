// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session tokens issued after a verified challenge.
//!
//! Tokens are HS256 JWTs. The subject is the authenticated wallet address;
//! the `pk` claim carries the public key the address was proven with so the
//! relay path can verify payload signatures without trusting the request.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AuthError;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Default session lifetime.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    pk: String,
    iat: i64,
    exp: i64,
}

/// An authenticated session, carried forward to relay requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    /// Lowercase `0x` address proven by the challenge signature.
    pub subject_address: String,
    /// Hex Ed25519 public key that produced the signature.
    pub public_key_hex: String,
    /// Unix seconds.
    pub issued_at: i64,
    /// Unix seconds.
    pub expires_at: i64,
}

/// Signs and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Issue a token for `address` at `now_secs`.
    pub fn issue(
        &self,
        address: &str,
        public_key_hex: &str,
        now_secs: i64,
    ) -> Result<(String, AuthToken), AuthError> {
        let exp = now_secs
            .checked_add(self.ttl_secs)
            .ok_or_else(|| AuthError::InternalError("token expiry overflows".into()))?;
        let claims = SessionClaims {
            sub: address.to_string(),
            pk: public_key_hex.to_string(),
            iat: now_secs,
            exp,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;

        Ok((
            token,
            AuthToken {
                subject_address: claims.sub,
                public_key_hex: claims.pk,
                issued_at: claims.iat,
                expires_at: claims.exp,
            },
        ))
    }

    /// Verify signature and expiry, returning the session.
    pub fn verify(&self, token: &str) -> Result<AuthToken, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<SessionClaims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            }
        })?;

        let claims = data.claims;
        Ok(AuthToken {
            subject_address: claims.sub,
            public_key_hex: claims.pk,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}
