//! Encryption service
//!
//! Wraps one [`CryptoBackend`] chosen at construction time and applies the
//! degradation chain:
//!
//! - `encrypt` never fails. If the backend errors, the plaintext is base64
//!   encoded instead and a warning is logged.
//! - `decrypt` tries the backend, then plain base64, then hands the input
//!   back unchanged. Each step down is logged as a warning.
//!
//! Key derivation and AEAD are CPU-bound, so they run on the blocking pool
//! when a tokio runtime is present.

use crate::config::CryptoMode;
use crate::crypto::backend::{probe_random_source, AeadBackend, Base64Backend, CryptoBackend};
use crate::error::{CryptoError, CryptoResult};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, warn};

/// Envelope encryption with a silent fallback chain
#[derive(Debug, Clone)]
pub struct EncryptionService {
    backend: Arc<dyn CryptoBackend>,
}

impl EncryptionService {
    /// Select a backend for `mode`, probing the platform once for `Auto`
    pub fn new(passphrase: impl Into<String>, iterations: NonZeroU32, mode: CryptoMode) -> Self {
        let backend: Arc<dyn CryptoBackend> = match mode {
            CryptoMode::Authenticated => Arc::new(AeadBackend::new(passphrase, iterations)),
            CryptoMode::Fallback => {
                warn!("crypto backend forced to base64 fallback, values are not confidential");
                Arc::new(Base64Backend)
            }
            CryptoMode::Auto => match probe_random_source() {
                Ok(()) => Arc::new(AeadBackend::new(passphrase, iterations)),
                Err(e) => {
                    warn!(error = %e, "authenticated encryption unavailable, using base64 fallback");
                    Arc::new(Base64Backend)
                }
            },
        };

        debug!(backend = backend.name(), "encryption service ready");
        Self { backend }
    }

    /// Use an explicit backend
    pub fn with_backend(backend: Arc<dyn CryptoBackend>) -> Self {
        Self { backend }
    }

    /// Whether the selected backend provides confidentiality
    pub fn is_authenticated(&self) -> bool {
        self.backend.is_authenticated()
    }

    /// Encrypt `plaintext` into an envelope string
    pub async fn encrypt(&self, plaintext: &str) -> String {
        let backend = Arc::clone(&self.backend);
        let input = plaintext.to_string();

        match run_blocking(move || backend.seal(&input)).await {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(
                    backend = self.backend.name(),
                    error = %e,
                    "encryption failed, storing base64-encoded plaintext"
                );
                Base64Backend::encode(plaintext)
            }
        }
    }

    /// Decrypt an envelope string.
    ///
    /// Only fails when the crypto task itself could not run; every other
    /// problem degrades through the fallback chain.
    pub async fn decrypt(&self, envelope: &str) -> CryptoResult<String> {
        let backend = Arc::clone(&self.backend);
        let input = envelope.to_string();

        let primary = match run_blocking(move || backend.open(&input)).await {
            Ok(plaintext) => return Ok(plaintext),
            Err(e @ CryptoError::TaskAborted { .. }) => return Err(e),
            Err(e) => e,
        };

        if self.backend.is_authenticated() {
            warn!(error = %primary, "authenticated decryption failed, trying base64");
            match Base64Backend::decode(envelope) {
                Ok(plaintext) => return Ok(plaintext),
                Err(e) => warn!(error = %e, "base64 decoding failed, returning input unchanged"),
            }
        } else {
            warn!(error = %primary, "base64 decoding failed, returning input unchanged");
        }

        Ok(envelope.to_string())
    }
}

async fn run_blocking<T, F>(task: F) -> CryptoResult<T>
where
    F: FnOnce() -> CryptoResult<T> + Send + 'static,
    T: Send + 'static,
{
    if tokio::runtime::Handle::try_current().is_err() {
        return task();
    }

    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| CryptoError::TaskAborted {
            reason: e.to_string(),
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    const ITERATIONS: NonZeroU32 = match NonZeroU32::new(1_000) {
        Some(n) => n,
        None => unreachable!(),
    };

    fn service() -> EncryptionService {
        EncryptionService::new("service passphrase", ITERATIONS, CryptoMode::Authenticated)
    }

    #[derive(Debug)]
    struct BrokenBackend;

    impl CryptoBackend for BrokenBackend {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn is_authenticated(&self) -> bool {
            true
        }

        fn seal(&self, _plaintext: &str) -> CryptoResult<String> {
            Err(CryptoError::EncryptionFailed {
                reason: "simulated".to_string(),
            })
        }

        fn open(&self, _envelope: &str) -> CryptoResult<String> {
            Err(CryptoError::DecryptionFailed {
                reason: "simulated".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_encrypt_decrypt() {
        let service = service();
        let envelope = service.encrypt("session-token-value").await;
        assert_ne!(envelope, "session-token-value");
        assert_eq!(service.decrypt(&envelope).await.unwrap(), "session-token-value");
    }

    #[tokio::test]
    async fn test_envelope_minimum_length() {
        let envelope = service().encrypt("").await;
        let bytes = STANDARD.decode(envelope).unwrap();
        assert!(bytes.len() >= 28);
    }

    #[tokio::test]
    async fn test_encrypt_failure_falls_back_to_base64() {
        let service = EncryptionService::with_backend(Arc::new(BrokenBackend));
        let envelope = service.encrypt("hello").await;
        assert_eq!(envelope, STANDARD.encode("hello"));
    }

    #[tokio::test]
    async fn test_decrypt_falls_back_to_base64() {
        let service = service();
        let plain = STANDARD.encode("written by fallback");
        assert_eq!(service.decrypt(&plain).await.unwrap(), "written by fallback");
    }

    #[tokio::test]
    async fn test_decrypt_returns_input_as_last_resort() {
        let service = service();
        assert_eq!(service.decrypt("not base64 at all!").await.unwrap(), "not base64 at all!");
    }

    #[tokio::test]
    async fn test_fallback_mode() {
        let service = EncryptionService::new("ignored", ITERATIONS, CryptoMode::Fallback);
        assert!(!service.is_authenticated());
        assert_eq!(service.encrypt("abc").await, "YWJj");
        assert_eq!(service.decrypt("YWJj").await.unwrap(), "abc");
    }

    #[test]
    fn test_auto_mode_selects_aead() {
        let service = EncryptionService::new("pass", ITERATIONS, CryptoMode::Auto);
        assert!(service.is_authenticated());
    }

    #[test]
    fn test_runs_without_runtime() {
        let service = service();
        let envelope = futures::executor::block_on(service.encrypt("no runtime"));
        let decrypted = futures::executor::block_on(service.decrypt(&envelope)).unwrap();
        assert_eq!(decrypted, "no runtime");
    }
}
