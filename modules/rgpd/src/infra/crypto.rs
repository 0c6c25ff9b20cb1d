//! Export bundle sealing and email fingerprints.
//!
//! Each bundle gets a fresh AES-256-GCM key; the key lives on the bundle
//! row and the ciphertext in the blob store, so deleting both is a
//! crypto-shred: the plaintext becomes unrecoverable without a backup.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use anyhow::{anyhow, Context};
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;

/// One sealing key. Pure computation; no storage handles.
pub struct ExportCipher {
    key: Vec<u8>,
}

impl ExportCipher {
    /// Fresh random 256-bit key.
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(&mut OsRng);
        Self {
            key: key.as_slice().to_vec(),
        }
    }

    pub fn from_hex(key_hex: &str) -> anyhow::Result<Self> {
        let key = hex::decode(key_hex).context("bundle key is not valid hex")?;
        if key.len() != 32 {
            return Err(anyhow!("bundle key has wrong length"));
        }
        Ok(Self { key })
    }

    pub fn key_hex(&self) -> String {
        hex::encode(&self.key)
    }

    /// Seal plaintext into `nonce || ciphertext`.
    pub fn seal(&self, plaintext: &[u8]) -> anyhow::Result<Vec<u8>> {
        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|_| anyhow!("invalid key length"))?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| anyhow!("bundle encryption failed"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(nonce.as_slice());
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    pub fn open(&self, sealed: &[u8]) -> anyhow::Result<Vec<u8>> {
        if sealed.len() < NONCE_LEN {
            return Err(anyhow!("sealed artifact is truncated"));
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|_| anyhow!("invalid key length"))?;
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| anyhow!("bundle decryption failed"))
    }
}

/// Stable fingerprint of an email address: SHA-256 hex over the trimmed,
/// lowercased form. The raw address is never persisted in this core.
pub fn email_fingerprint(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.trim().to_lowercase().as_bytes());
    hex::encode(hasher.finalize())
}
