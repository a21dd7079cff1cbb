// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! BIP-39 mnemonic handling.
//!
//! Import runs in two independent steps: [`normalize_phrase`] (a pure text
//! transform) and [`validate_phrase`] (word count + wordlist + checksum).

use bip39::Mnemonic;
use rand::{rngs::OsRng, RngCore};
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, Zeroizing};

/// Entropy for a 24-word phrase.
const ENTROPY_BYTES: usize = 32;

/// Word counts accepted on import.
pub const ACCEPTED_WORD_COUNTS: [usize; 2] = [12, 24];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MnemonicError {
    #[error("expected 12 or 24 words, got {0}")]
    WrongWordCount(usize),

    #[error("word #{0} is not in the BIP-39 wordlist")]
    UnknownWord(usize),

    #[error("checksum does not match")]
    ChecksumFailed,

    #[error("{0}")]
    Other(String),
}

impl From<bip39::Error> for MnemonicError {
    fn from(e: bip39::Error) -> Self {
        match e {
            bip39::Error::BadWordCount(n) => MnemonicError::WrongWordCount(n),
            bip39::Error::UnknownWord(idx) => MnemonicError::UnknownWord(idx + 1),
            bip39::Error::InvalidChecksum => MnemonicError::ChecksumFailed,
            other => MnemonicError::Other(other.to_string()),
        }
    }
}

/// Trim, NFKD-normalize, lowercase and collapse internal whitespace.
pub fn normalize_phrase(raw: &str) -> Zeroizing<String> {
    let mut decomposed: String = raw.nfkd().collect();
    let mut lowered = decomposed.to_lowercase();
    decomposed.zeroize();
    let joined = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    lowered.zeroize();
    Zeroizing::new(joined)
}

/// Validate an already-normalized phrase: 12 or 24 words and a valid checksum.
pub fn validate_phrase(normalized: &str) -> Result<Mnemonic, MnemonicError> {
    let count = normalized.split(' ').filter(|w| !w.is_empty()).count();
    if !ACCEPTED_WORD_COUNTS.contains(&count) {
        return Err(MnemonicError::WrongWordCount(count));
    }
    Ok(Mnemonic::parse_normalized(normalized)?)
}

/// Generate a fresh 24-word mnemonic from the OS CSPRNG.
pub fn generate_mnemonic() -> Result<Mnemonic, MnemonicError> {
    let mut entropy = Zeroizing::new([0u8; ENTROPY_BYTES]);
    OsRng.fill_bytes(entropy.as_mut());
    Ok(Mnemonic::from_entropy(entropy.as_ref())?)
}

/// 512-bit BIP-39 seed with an empty passphrase.
pub fn mnemonic_to_seed(mnemonic: &Mnemonic) -> Zeroizing<[u8; 64]> {
    Zeroizing::new(mnemonic.to_seed_normalized(""))
}
