// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local custody of a single wallet identity.
//!
//! The secret record is sealed on disk by [`EncryptedStorage`]. Access goes
//! through a `tokio::sync::RwLock`: create/import/logout take the write lock,
//! signing and blob encryption take read locks. Guards are moved into the
//! worker pool so derivation and file I/O never block the runtime.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::envelope::{self, EncryptedBlob, EnvelopeError, EnvelopeKey};
use super::keys::WalletIdentity;
use super::mnemonic::{generate_mnemonic, normalize_phrase, validate_phrase, MnemonicError};
use crate::client::pool::{PoolError, WorkerPool};
use crate::storage::{EncryptedStorage, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum CustodyError {
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(#[from] MnemonicError),

    #[error("no wallet on this device")]
    NoWallet,

    /// Blob decryption failed: tampered data or a different wallet's key.
    #[error("authentication failure")]
    AuthenticationFailure,

    #[error("wallet store is corrupted: {0}")]
    Corrupted(String),

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error(transparent)]
    Worker(#[from] PoolError),
}

impl From<StorageError> for CustodyError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::IntegrityViolation(msg) => CustodyError::Corrupted(msg),
            StorageError::Json(e) => CustodyError::Corrupted(e.to_string()),
            other => CustodyError::Storage(other),
        }
    }
}

/// Public view of the held wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletPublic {
    pub address: String,
    pub public_key_hex: String,
}

/// Sealed on-disk record. Zeroized when dropped.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct StoredWallet {
    private_key: String,
    public_key: String,
    address: String,
    mnemonic: String,
    envelope_key: String,
    #[zeroize(skip)]
    created_at: DateTime<Utc>,
}

impl StoredWallet {
    fn from_identity(identity: &WalletIdentity, envelope_key: &EnvelopeKey) -> Self {
        Self {
            private_key: hex::encode(&identity.private_key_bytes()[..]),
            public_key: identity.public_key_hex(),
            address: identity.address().to_string(),
            mnemonic: identity.mnemonic().to_string(),
            envelope_key: envelope_key.to_hex().to_string(),
            created_at: Utc::now(),
        }
    }

    fn signing_key(&self) -> Result<SigningKey, CustodyError> {
        let raw = Zeroizing::new(
            hex::decode(&self.private_key).map_err(|e| CustodyError::Corrupted(e.to_string()))?,
        );
        let bytes: [u8; 32] = raw
            .as_slice()
            .try_into()
            .map_err(|_| CustodyError::Corrupted("private key length".to_string()))?;
        let bytes = Zeroizing::new(bytes);
        Ok(SigningKey::from_bytes(&bytes))
    }

    fn envelope_key(&self) -> Result<EnvelopeKey, CustodyError> {
        EnvelopeKey::from_hex(&self.envelope_key).map_err(|e| CustodyError::Corrupted(e.to_string()))
    }

    fn public(&self) -> WalletPublic {
        WalletPublic {
            address: self.address.clone(),
            public_key_hex: self.public_key.clone(),
        }
    }
}

fn load(storage: &EncryptedStorage) -> Result<StoredWallet, CustodyError> {
    let path = storage.paths().wallet_secret();
    if !storage.exists(&path) {
        return Err(CustodyError::NoWallet);
    }
    match storage.read_json(&path) {
        Ok(wallet) => Ok(wallet),
        Err(StorageError::NotFound(_)) => Err(CustodyError::NoWallet),
        Err(e) => Err(e.into()),
    }
}

fn persist(
    storage: &EncryptedStorage,
    identity: &WalletIdentity,
    envelope_key: &EnvelopeKey,
) -> Result<(), CustodyError> {
    let record = StoredWallet::from_identity(identity, envelope_key);
    storage.write_json(storage.paths().wallet_secret(), &record)?;
    Ok(())
}

/// Holds one wallet identity in a sealed local store.
pub struct KeyCustody {
    store: Arc<RwLock<EncryptedStorage>>,
    pool: WorkerPool,
}

impl KeyCustody {
    /// Wrap an already-initialized store.
    pub fn new(storage: EncryptedStorage, pool: WorkerPool) -> Self {
        Self {
            store: Arc::new(RwLock::new(storage)),
            pool,
        }
    }

    /// Initialize `storage` on the pool and wrap it.
    pub async fn open(mut storage: EncryptedStorage, pool: WorkerPool) -> Result<Self, CustodyError> {
        let storage = pool
            .run(move || storage.initialize().map(|_| storage))
            .await??;
        Ok(Self::new(storage, pool))
    }

    /// Generate a fresh 24-word wallet and persist it, replacing any held one.
    pub async fn create_wallet(&self) -> Result<WalletIdentity, CustodyError> {
        let guard = self.store.clone().write_owned().await;
        let identity = self
            .pool
            .run(move || -> Result<WalletIdentity, CustodyError> {
                let mnemonic = generate_mnemonic()?;
                let identity = WalletIdentity::from_mnemonic(&mnemonic);
                persist(&guard, &identity, &EnvelopeKey::generate())?;
                Ok(identity)
            })
            .await??;

        tracing::info!(address = %identity.address(), "Created wallet");
        Ok(identity)
    }

    /// Import from a user-supplied phrase, overwriting any held wallet.
    ///
    /// A rejected phrase leaves the store untouched.
    pub async fn import_wallet(&self, raw_phrase: &str) -> Result<WalletIdentity, CustodyError> {
        let normalized = normalize_phrase(raw_phrase);
        let mnemonic = validate_phrase(&normalized)?;

        let guard = self.store.clone().write_owned().await;
        let identity = self
            .pool
            .run(move || -> Result<WalletIdentity, CustodyError> {
                let identity = WalletIdentity::from_mnemonic(&mnemonic);
                persist(&guard, &identity, &EnvelopeKey::generate())?;
                Ok(identity)
            })
            .await??;

        tracing::info!(address = %identity.address(), "Imported wallet");
        Ok(identity)
    }

    /// Sign raw bytes with the held key. Never creates a wallet.
    pub async fn sign(&self, payload: &[u8]) -> Result<Signature, CustodyError> {
        let guard = self.store.clone().read_owned().await;
        let payload = payload.to_vec();
        self.pool
            .run(move || -> Result<Signature, CustodyError> {
                let wallet = load(&guard)?;
                Ok(wallet.signing_key()?.sign(&payload))
            })
            .await?
    }

    /// [`Self::sign`] rendered as lowercase hex.
    pub async fn sign_hex(&self, payload: &[u8]) -> Result<String, CustodyError> {
        Ok(hex::encode(self.sign(payload).await?.to_bytes()))
    }

    /// Address and public key of the held wallet.
    pub async fn identity(&self) -> Result<WalletPublic, CustodyError> {
        let guard = self.store.clone().read_owned().await;
        self.pool
            .run(move || load(&guard).map(|w| w.public()))
            .await?
    }

    pub async fn has_wallet(&self) -> bool {
        let store = self.store.read().await;
        store.exists(store.paths().wallet_secret())
    }

    /// Remove the held wallet. Later calls to `sign` fail with `NoWallet`.
    pub async fn logout(&self) -> Result<(), CustodyError> {
        let guard = self.store.clone().write_owned().await;
        self.pool
            .run(move || guard.delete(guard.paths().wallet_secret()))
            .await??;
        tracing::info!("Wallet removed from device");
        Ok(())
    }

    /// Encrypt an opaque blob with the wallet's envelope key.
    pub async fn encrypt_blob(&self, plaintext: &[u8]) -> Result<EncryptedBlob, CustodyError> {
        let guard = self.store.clone().read_owned().await;
        let plaintext = Zeroizing::new(plaintext.to_vec());
        self.pool
            .run(move || -> Result<EncryptedBlob, CustodyError> {
                let key = load(&guard)?.envelope_key()?;
                envelope::encrypt(&key, &plaintext)
                    .map_err(|e| CustodyError::Corrupted(e.to_string()))
            })
            .await?
    }

    /// Decrypt a blob produced by [`Self::encrypt_blob`].
    pub async fn decrypt_blob(&self, blob: &EncryptedBlob) -> Result<Vec<u8>, CustodyError> {
        let guard = self.store.clone().read_owned().await;
        let blob = blob.clone();
        self.pool
            .run(move || -> Result<Vec<u8>, CustodyError> {
                let key = load(&guard)?.envelope_key()?;
                envelope::decrypt(&key, &blob).map_err(|e| match e {
                    EnvelopeError::AuthenticationFailure | EnvelopeError::MalformedBlob(_) => {
                        CustodyError::AuthenticationFailure
                    }
                    other => CustodyError::Corrupted(other.to_string()),
                })
            })
            .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::keys::{derive_address, is_valid_address, parse_public_key, verify_signature};
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    const PHRASE_12: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    async fn custody() -> (TempDir, KeyCustody) {
        let temp = TempDir::new().unwrap();
        let storage = EncryptedStorage::new(StoragePaths::new(temp.path()));
        let custody = KeyCustody::open(storage, WorkerPool::new(2)).await.unwrap();
        (temp, custody)
    }

    #[tokio::test]
    async fn sign_without_wallet_is_no_wallet() {
        let (_temp, custody) = custody().await;
        assert!(matches!(custody.sign(b"x").await, Err(CustodyError::NoWallet)));
        // Still nothing created.
        assert!(!custody.has_wallet().await);
        assert!(matches!(custody.identity().await, Err(CustodyError::NoWallet)));
    }

    #[tokio::test]
    async fn create_wallet_persists_and_signs() {
        let (_temp, custody) = custody().await;
        let identity = custody.create_wallet().await.unwrap();
        assert_eq!(identity.mnemonic().split(' ').count(), 24);
        assert!(is_valid_address(identity.address()));

        let public = custody.identity().await.unwrap();
        assert_eq!(public.address, identity.address());

        let sig = custody.sign(b"payload").await.unwrap();
        let pk = parse_public_key(&public.public_key_hex).unwrap();
        assert!(verify_signature(&pk, b"payload", &sig).is_ok());
    }

    #[tokio::test]
    async fn import_is_deterministic_across_devices() {
        let (_a_dir, a) = custody().await;
        let (_b_dir, b) = custody().await;

        let one = a.import_wallet(PHRASE_12).await.unwrap();
        let two = b
            .import_wallet("  ABANDON abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon   About ")
            .await
            .unwrap();

        assert_eq!(one.address(), two.address());
        assert_eq!(
            a.sign_hex(b"same").await.unwrap(),
            b.sign_hex(b"same").await.unwrap()
        );
    }

    #[tokio::test]
    async fn import_overwrites_existing_wallet() {
        let (_temp, custody) = custody().await;
        let created = custody.create_wallet().await.unwrap();
        let imported = custody.import_wallet(PHRASE_12).await.unwrap();

        assert_ne!(created.address(), imported.address());
        assert_eq!(custody.identity().await.unwrap().address, imported.address());
    }

    #[tokio::test]
    async fn rejected_phrase_leaves_store_untouched() {
        let (_temp, custody) = custody().await;
        let held = custody.create_wallet().await.unwrap();

        let bad = vec!["abandon"; 12].join(" ");
        assert!(matches!(
            custody.import_wallet(&bad).await,
            Err(CustodyError::InvalidMnemonic(MnemonicError::ChecksumFailed))
        ));
        assert!(matches!(
            custody.import_wallet("only three words").await,
            Err(CustodyError::InvalidMnemonic(MnemonicError::WrongWordCount(3)))
        ));
        assert_eq!(custody.identity().await.unwrap().address, held.address());
    }

    #[tokio::test]
    async fn blob_roundtrip_and_tamper_rejection() {
        let (_temp, custody) = custody().await;
        custody.create_wallet().await.unwrap();

        let blob = custody.encrypt_blob(b"private memory").await.unwrap();
        assert_eq!(custody.decrypt_blob(&blob).await.unwrap(), b"private memory");

        let mut tampered = blob.clone();
        tampered.ciphertext[0] ^= 0x80;
        assert!(matches!(
            custody.decrypt_blob(&tampered).await,
            Err(CustodyError::AuthenticationFailure)
        ));
    }

    #[tokio::test]
    async fn blob_from_other_wallet_fails_authentication() {
        let (_temp, custody) = custody().await;
        custody.create_wallet().await.unwrap();
        let blob = custody.encrypt_blob(b"old key").await.unwrap();

        custody.import_wallet(PHRASE_12).await.unwrap();
        assert!(matches!(
            custody.decrypt_blob(&blob).await,
            Err(CustodyError::AuthenticationFailure)
        ));
    }

    #[tokio::test]
    async fn logout_wipes_wallet() {
        let (_temp, custody) = custody().await;
        custody.import_wallet(PHRASE_12).await.unwrap();
        assert!(custody.has_wallet().await);

        custody.logout().await.unwrap();
        assert!(!custody.has_wallet().await);
        assert!(matches!(custody.sign(b"x").await, Err(CustodyError::NoWallet)));
    }

    #[tokio::test]
    async fn secrets_are_not_plaintext_on_disk() {
        let (temp, custody) = custody().await;
        let identity = custody.import_wallet(PHRASE_12).await.unwrap();

        let sealed = std::fs::read(StoragePaths::new(temp.path()).wallet_secret()).unwrap();
        let text = String::from_utf8_lossy(&sealed);
        assert!(!text.contains("abandon"));
        assert!(!text.contains(&identity.address()[2..]));
    }

    /// The held wallet decrypts its own blobs and its key matches its address.
    async fn assert_consistent(custody: &KeyCustody) -> WalletPublic {
        let public = custody.identity().await.unwrap();
        let pk = parse_public_key(&public.public_key_hex).unwrap();
        let sig = custody.sign(b"check").await.unwrap();
        assert!(verify_signature(&pk, b"check", &sig).is_ok());
        assert_eq!(derive_address(&pk.to_bytes()), public.address);

        let blob = custody.encrypt_blob(b"check").await.unwrap();
        assert_eq!(custody.decrypt_blob(&blob).await.unwrap(), b"check");
        public
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_create_and_import_leave_one_identity() {
        let (_temp, custody) = custody().await;

        let (created, imported) = tokio::join!(custody.create_wallet(), custody.import_wallet(PHRASE_12));
        let created = created.unwrap();
        let imported = imported.unwrap();

        let held = assert_consistent(&custody).await;
        assert!(held.address == created.address() || held.address == imported.address());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn aborted_writes_never_leave_a_partial_store() {
        let (_temp, custody) = custody().await;
        let custody = Arc::new(custody);
        custody.import_wallet(PHRASE_12).await.unwrap();

        for yields in 0..8 {
            let writer = custody.clone();
            let task = tokio::spawn(async move { writer.create_wallet().await });
            for _ in 0..yields {
                tokio::task::yield_now().await;
            }
            task.abort();
            let _ = task.await;

            // Either the old wallet or a complete new one; never a torn file.
            assert_consistent(&custody).await;
        }
    }

    #[tokio::test]
    async fn interrupted_write_before_rename_is_ignored() {
        let (temp, custody) = custody().await;
        let held = custody.import_wallet(PHRASE_12).await.unwrap();

        // What a crash between the temp write and the rename leaves behind.
        let secret = StoragePaths::new(temp.path()).wallet_secret();
        std::fs::write(secret.with_extension("tmp"), b"half-written").unwrap();

        assert_eq!(assert_consistent(&custody).await.address, held.address());
    }
}
