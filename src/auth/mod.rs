// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Wallet challenge-response authentication.
//!
//! ## Auth Flow
//!
//! 1. Client asks for (or builds) a challenge for its address
//! 2. Client signs the challenge text with its Ed25519 key
//! 3. Server:
//!    - rebuilds the template and checks the message matches
//!    - recomputes the address from the public key
//!    - verifies the signature and the timestamp window
//!    - claims the nonce exactly once
//!    - issues a session token bound to the address and public key
//! 4. Client sends `Authorization: Bearer <token>` on relay requests
//!
//! ## Security
//!
//! - The private key never leaves the client
//! - Nonces are single-use, including nonces of failed attempts
//! - Session tokens are HS256 JWTs with a 60 second clock skew leeway

pub mod challenge;
pub mod error;
pub mod extractor;
pub mod nonce;
pub mod token;
pub mod verifier;

pub use challenge::{build_challenge, challenge_message, Challenge, ChallengeMode};
pub use error::{AuthError, ChallengeError};
pub use extractor::Auth;
pub use nonce::NonceRegistry;
pub use token::{AuthToken, TokenIssuer};
pub use verifier::{ChallengeAuthenticator, Verified, VerifyRequest};
