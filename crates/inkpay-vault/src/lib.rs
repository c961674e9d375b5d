//! Inkpay Card Vault
//!
//! Reversible, authenticated encryption for stored card numbers, plus the
//! masked display projections (brand, last four).
//!
//! # Security Invariants
//!
//! 1. PANs are never logged, stored in plaintext, or returned to callers
//!    except as the last-four/brand projection.
//! 2. Encryption uses a fresh random nonce per call, so identical PANs
//!    produce different blobs.
//! 3. Decryption **fails closed**: malformed blobs, tampered ciphertext and
//!    key mismatches return an error, never the input or garbage.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use inkpay_types::CardBrand;
use thiserror::Error;

/// AES-GCM nonce length in bytes
const NONCE_LEN: usize = 12;

/// Card vault errors
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("malformed ciphertext blob")]
    MalformedBlob,

    #[error("encryption failed")]
    EncryptFailed,

    #[error("decryption failed: ciphertext tampered or key mismatch")]
    DecryptFailed,

    #[error("decrypted data is not valid UTF-8")]
    InvalidPlaintext,
}

pub type VaultResult<T> = Result<T, VaultError>;

/// Vault for card numbers
///
/// Holds the AEAD cipher for the platform card-encryption key. The key is
/// supplied by the deployment (KMS, env secret); the vault never exposes it.
pub struct CardVault {
    cipher: Aes256Gcm,
}

impl CardVault {
    /// Create a vault from a 32-byte key
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    /// Create a vault from a hex-encoded 32-byte key
    pub fn from_hex_key(hex_key: &str) -> VaultResult<Self> {
        let bytes = hex::decode(hex_key).map_err(|e| VaultError::InvalidKey(e.to_string()))?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| VaultError::InvalidKey("key must be 32 bytes".to_string()))?;
        Ok(Self::new(&key))
    }

    /// Encrypt a PAN into a hex blob of `nonce || ciphertext`.
    ///
    /// A fresh random nonce is drawn per call, so two encryptions of the
    /// same PAN never compare equal.
    pub fn encrypt(&self, pan: &str) -> VaultResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, pan.as_bytes())
            .map_err(|_| VaultError::EncryptFailed)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(nonce.as_slice());
        blob.extend_from_slice(&ciphertext);
        Ok(hex::encode(blob))
    }

    /// Decrypt a blob produced by [`encrypt`](Self::encrypt).
    ///
    /// Fails closed on malformed input or authentication failure.
    pub fn decrypt(&self, blob: &str) -> VaultResult<String> {
        let bytes = hex::decode(blob).map_err(|_| VaultError::MalformedBlob)?;
        if bytes.len() <= NONCE_LEN {
            return Err(VaultError::MalformedBlob);
        }

        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| VaultError::DecryptFailed)?;

        String::from_utf8(plaintext).map_err(|_| VaultError::InvalidPlaintext)
    }
}

/// Classify a PAN by its leading digit (IIN prefix heuristic)
pub fn classify(pan: &str) -> CardBrand {
    match pan.chars().next() {
        Some('4') => CardBrand::Visa,
        Some('5') => CardBrand::MasterCard,
        Some('3') => CardBrand::AmericanExpress,
        Some('6') => CardBrand::Discover,
        _ => CardBrand::Other,
    }
}

/// Last four characters of a PAN; shorter inputs come back whole
pub fn last_four(pan: &str) -> &str {
    let chars = pan.chars().count();
    match pan.char_indices().nth(chars.saturating_sub(4)) {
        Some((idx, _)) => &pan[idx..],
        None => pan,
    }
}
