use crate::errors::CoreError;
use crate::store::{MemoryStore, StoreSnapshot};

use super::encryption::{self, KdfParams};
use super::format::{self, SnapshotHeader};

/// Saves and restores `MemoryStore` contents as portable encrypted snapshots.
pub struct StorageManager;

impl StorageManager {
    /// Encrypt a snapshot with default KDF costs.
    ///
    /// Flow: snapshot → JSON → AES-256-GCM(Argon2id(password)) → FNTR bytes
    pub fn save_to_bytes(snapshot: &StoreSnapshot, password: &str) -> Result<Vec<u8>, CoreError> {
        Self::save_with_params(snapshot, password, KdfParams::default())
    }

    /// Encrypt a snapshot with explicit KDF costs. A fresh salt and nonce
    /// are drawn on every save.
    pub fn save_with_params(
        snapshot: &StoreSnapshot,
        password: &str,
        kdf_params: KdfParams,
    ) -> Result<Vec<u8>, CoreError> {
        let plaintext = serde_json::to_vec(snapshot)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize snapshot: {e}")))?;

        let salt = encryption::random_bytes()?;
        let nonce = encryption::random_bytes()?;
        let key = encryption::derive_key(password, &salt, &kdf_params)?;
        let ciphertext = encryption::encrypt(&plaintext, &key, &nonce)?;

        let header = SnapshotHeader {
            version: format::CURRENT_VERSION,
            kdf_params,
            salt,
            nonce,
            ciphertext_len: ciphertext.len() as u64,
        };

        tracing::debug!(
            documents = snapshot.document_count(),
            bytes = ciphertext.len(),
            "encrypted snapshot"
        );
        Ok(format::encode(&header, &ciphertext))
    }

    /// Decrypt a snapshot.
    ///
    /// Flow: FNTR bytes → header → Argon2id(password, salt) → AES-256-GCM → JSON → snapshot
    pub fn load_from_bytes(data: &[u8], password: &str) -> Result<StoreSnapshot, CoreError> {
        let (header, ciphertext) = format::decode(data)?;
        let key = encryption::derive_key(password, &header.salt, &header.kdf_params)?;
        let plaintext = encryption::decrypt(ciphertext, &key, &header.nonce)?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize snapshot: {e}")))
    }

    /// Snapshot a store and encrypt it.
    pub fn save_store(store: &MemoryStore, password: &str) -> Result<Vec<u8>, CoreError> {
        Self::save_to_bytes(&store.snapshot()?, password)
    }

    /// Decrypt a snapshot into a fresh store.
    pub fn load_store(data: &[u8], password: &str) -> Result<MemoryStore, CoreError> {
        Ok(MemoryStore::from_snapshot(Self::load_from_bytes(data, password)?))
    }

    /// Write an encrypted snapshot of `store` to disk (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_file(store: &MemoryStore, path: &str, password: &str) -> Result<(), CoreError> {
        let bytes = Self::save_store(store, password)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Read an encrypted snapshot from disk into a fresh store (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_file(path: &str, password: &str) -> Result<MemoryStore, CoreError> {
        let bytes = std::fs::read(path)?;
        Self::load_store(&bytes, password)
    }
}
