//! Crypto backends
//!
//! Two interchangeable implementations share the [`CryptoBackend`] contract:
//!
//! - [`AeadBackend`]: PBKDF2-HMAC-SHA256 key derivation with a fresh random
//!   salt per call, AES-256-GCM with a fresh random IV, envelope
//!   `base64(salt[16] || iv[12] || ciphertext)`.
//! - [`Base64Backend`]: plain base64 of the UTF-8 plaintext. Offers no
//!   confidentiality and exists so the pipeline keeps the same shape on
//!   platforms without a usable random source.

use crate::crypto::constants::{ENVELOPE_HEADER_SIZE, IV_SIZE, SALT_SIZE};
use crate::crypto::kdf::derive_key;
use crate::error::{CryptoError, CryptoResult};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::RngCore;
use std::fmt;
use std::num::NonZeroU32;
use zeroize::Zeroizing;

/// Strategy interface for envelope encryption
pub trait CryptoBackend: Send + Sync + fmt::Debug {
    /// Short backend name used in logs
    fn name(&self) -> &'static str;

    /// Whether the backend provides confidentiality
    fn is_authenticated(&self) -> bool;

    /// Seal a plaintext into an envelope string
    fn seal(&self, plaintext: &str) -> CryptoResult<String>;

    /// Open an envelope string back into plaintext
    fn open(&self, envelope: &str) -> CryptoResult<String>;
}

/// Plain base64 encoding, used when authenticated encryption is unavailable
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Backend;

impl Base64Backend {
    /// Encode a string as base64
    pub fn encode(plaintext: &str) -> String {
        STANDARD.encode(plaintext.as_bytes())
    }

    /// Decode a base64 string into UTF-8 text
    pub fn decode(encoded: &str) -> CryptoResult<String> {
        let bytes = STANDARD.decode(encoded.trim())?;
        Ok(String::from_utf8(bytes)?)
    }
}

impl CryptoBackend for Base64Backend {
    fn name(&self) -> &'static str {
        "base64"
    }

    fn is_authenticated(&self) -> bool {
        false
    }

    fn seal(&self, plaintext: &str) -> CryptoResult<String> {
        Ok(Self::encode(plaintext))
    }

    fn open(&self, envelope: &str) -> CryptoResult<String> {
        Self::decode(envelope)
    }
}

/// AES-256-GCM with PBKDF2-derived keys
#[derive(Clone)]
pub struct AeadBackend {
    passphrase: Zeroizing<String>,
    iterations: NonZeroU32,
}

impl fmt::Debug for AeadBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AeadBackend")
            .field("passphrase", &"[redacted]")
            .field("iterations", &self.iterations)
            .finish()
    }
}

impl AeadBackend {
    /// Create a backend for the given passphrase and PBKDF2 iteration count
    pub fn new(passphrase: impl Into<String>, iterations: NonZeroU32) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.into()),
            iterations,
        }
    }

    fn cipher_for(&self, salt: &[u8]) -> CryptoResult<Aes256Gcm> {
        let key = derive_key(&self.passphrase, salt, self.iterations.get())?;
        Aes256Gcm::new_from_slice(&key[..]).map_err(|e| CryptoError::KeyDerivationFailed {
            reason: format!("derived key rejected by cipher: {}", e),
        })
    }

    /// Seal with caller-provided salt and IV
    pub fn seal_with(
        &self,
        plaintext: &str,
        salt: &[u8; SALT_SIZE],
        iv: &[u8; IV_SIZE],
    ) -> CryptoResult<String> {
        let cipher = self.cipher_for(salt)?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(iv), plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed {
                reason: format!("AES-GCM encryption failed: {}", e),
            })?;

        let mut buffer = Vec::with_capacity(ENVELOPE_HEADER_SIZE + ciphertext.len());
        buffer.extend_from_slice(salt);
        buffer.extend_from_slice(iv);
        buffer.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(buffer))
    }
}

impl CryptoBackend for AeadBackend {
    fn name(&self) -> &'static str {
        "aes-256-gcm"
    }

    fn is_authenticated(&self) -> bool {
        true
    }

    fn seal(&self, plaintext: &str) -> CryptoResult<String> {
        let mut rng = rand::rng();
        let mut salt = [0u8; SALT_SIZE];
        let mut iv = [0u8; IV_SIZE];
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut iv);
        self.seal_with(plaintext, &salt, &iv)
    }

    fn open(&self, envelope: &str) -> CryptoResult<String> {
        let buffer = STANDARD.decode(envelope.trim())?;
        if buffer.len() < ENVELOPE_HEADER_SIZE {
            return Err(CryptoError::MalformedEnvelope {
                expected: ENVELOPE_HEADER_SIZE,
                actual: buffer.len(),
            });
        }

        let (salt, rest) = buffer.split_at(SALT_SIZE);
        let (iv, ciphertext) = rest.split_at(IV_SIZE);

        let cipher = self.cipher_for(salt)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(iv), ciphertext)
            .map_err(|e| CryptoError::DecryptionFailed {
                reason: format!("AES-GCM decryption failed: {}", e),
            })?;

        Ok(String::from_utf8(plaintext)?)
    }
}

/// Check whether the OS random source can be read
pub fn probe_random_source() -> CryptoResult<()> {
    let mut probe = [0u8; 16];
    getrandom::fill(&mut probe).map_err(|e| CryptoError::RandomUnavailable {
        reason: e.to_string(),
    })
}
