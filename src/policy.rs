//! Encryption policy
//!
//! Decides, per key, whether a value is encrypted before it reaches the
//! physical store, how expensive key derivation is, and whether decoded
//! values are cached.

use crate::crypto::constants::{BALANCED_ITERATIONS, SECURE_ITERATIONS};
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

/// Predicate deciding whether a key's value should be encrypted
pub type KeyPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Key fragments treated as sensitive by the default policy
pub const DEFAULT_SENSITIVE_PATTERNS: &[&str] = &[
    "token",
    "password",
    "secret",
    "auth",
    "user",
    "email",
    "profile",
    "session",
    "credential",
];

/// Key fragments treated as sensitive by the balanced preset
pub const BALANCED_SENSITIVE_PATTERNS: &[&str] = &["token", "password", "secret", "auth"];

/// Build a case-insensitive substring predicate
pub fn substring_predicate(patterns: &[&str]) -> KeyPredicate {
    let patterns: Vec<String> = patterns.iter().map(|p| p.to_ascii_lowercase()).collect();
    Arc::new(move |key: &str| {
        let key = key.to_ascii_lowercase();
        patterns.iter().any(|p| key.contains(p.as_str()))
    })
}

/// Predicate that encrypts every key
pub fn always() -> KeyPredicate {
    Arc::new(|_: &str| true)
}

/// Encryption settings applied by the storage pipeline
#[derive(Clone)]
pub struct EncryptionPolicy {
    /// Master switch; when off the predicate is never consulted
    pub enabled: bool,
    /// PBKDF2 iteration count, never zero
    pub iterations: NonZeroU32,
    /// Which keys get encrypted
    pub should_encrypt_key: KeyPredicate,
    /// Cache decoded values per adapter
    pub cache_decrypted: bool,
    /// Upper bound on cached entries, `None` for unbounded
    pub cache_capacity: Option<usize>,
    /// Passphrase override; the deployment setting is used when absent
    pub passphrase: Option<String>,
}

impl fmt::Debug for EncryptionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionPolicy")
            .field("enabled", &self.enabled)
            .field("iterations", &self.iterations)
            .field("cache_decrypted", &self.cache_decrypted)
            .field("cache_capacity", &self.cache_capacity)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[redacted]"))
            .finish_non_exhaustive()
    }
}

impl Default for EncryptionPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            iterations: SECURE_ITERATIONS,
            should_encrypt_key: substring_predicate(DEFAULT_SENSITIVE_PATTERNS),
            cache_decrypted: true,
            cache_capacity: None,
            passphrase: None,
        }
    }
}

impl EncryptionPolicy {
    /// Never encrypt
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Encrypt every key with the expensive iteration count
    pub fn secure() -> Self {
        Self {
            enabled: true,
            iterations: SECURE_ITERATIONS,
            should_encrypt_key: always(),
            ..Self::default()
        }
    }

    /// Encrypt only obviously sensitive keys with a cheaper iteration count
    pub fn balanced() -> Self {
        Self {
            enabled: true,
            iterations: BALANCED_ITERATIONS,
            should_encrypt_key: substring_predicate(BALANCED_SENSITIVE_PATTERNS),
            ..Self::default()
        }
    }

    /// Decide whether `key` is encrypted.
    ///
    /// An explicit `force` wins outright. Otherwise a disabled policy never
    /// encrypts and an enabled one defers to the predicate.
    pub fn should_encrypt(&self, key: &str, force: Option<bool>) -> bool {
        match force {
            Some(force) => force,
            None if !self.enabled => false,
            None => (self.should_encrypt_key)(key),
        }
    }

    /// Apply overrides on top of this policy
    pub fn with_overrides(mut self, overrides: PolicyOverrides) -> Self {
        if let Some(enabled) = overrides.enabled {
            self.enabled = enabled;
        }
        if let Some(iterations) = overrides.iterations {
            self.iterations = iterations;
        }
        if let Some(predicate) = overrides.should_encrypt_key {
            self.should_encrypt_key = predicate;
        }
        if let Some(cache) = overrides.cache_decrypted {
            self.cache_decrypted = cache;
        }
        if let Some(capacity) = overrides.cache_capacity {
            self.cache_capacity = Some(capacity);
        }
        if let Some(passphrase) = overrides.passphrase {
            self.passphrase = Some(passphrase);
        }
        self
    }
}

/// Partial policy merged over a preset by the factory
#[derive(Clone, Default)]
pub struct PolicyOverrides {
    /// Override `enabled`
    pub enabled: Option<bool>,
    /// Override `iterations`
    pub iterations: Option<NonZeroU32>,
    /// Override the key predicate
    pub should_encrypt_key: Option<KeyPredicate>,
    /// Override `cache_decrypted`
    pub cache_decrypted: Option<bool>,
    /// Bound the decoded-value cache
    pub cache_capacity: Option<usize>,
    /// Override the passphrase
    pub passphrase: Option<String>,
}

impl fmt::Debug for PolicyOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyOverrides")
            .field("enabled", &self.enabled)
            .field("iterations", &self.iterations)
            .field("should_encrypt_key", &self.should_encrypt_key.is_some())
            .field("cache_decrypted", &self.cache_decrypted)
            .field("cache_capacity", &self.cache_capacity)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl PolicyOverrides {
    /// Set `enabled`
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Set `iterations`
    pub fn iterations(mut self, iterations: NonZeroU32) -> Self {
        self.iterations = Some(iterations);
        self
    }

    /// Set the key predicate
    pub fn predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.should_encrypt_key = Some(Arc::new(predicate));
        self
    }

    /// Set `cache_decrypted`
    pub fn cache_decrypted(mut self, cache: bool) -> Self {
        self.cache_decrypted = Some(cache);
        self
    }

    /// Bound the decoded-value cache
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    /// Set the passphrase
    pub fn passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_disabled_never_consults_predicate() {
        let consulted = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&consulted);
        let policy = EncryptionPolicy::disabled().with_overrides(PolicyOverrides::default().predicate(
            move |_| {
                flag.store(true, Ordering::SeqCst);
                true
            },
        ));

        assert!(!policy.should_encrypt("nextapp_auth_token", None));
        assert!(!consulted.load(Ordering::SeqCst));
    }

    #[test]
    fn test_force_flag_wins() {
        let disabled = EncryptionPolicy::disabled();
        assert!(disabled.should_encrypt("nextapp_theme", Some(true)));

        let secure = EncryptionPolicy::secure();
        assert!(!secure.should_encrypt("nextapp_auth_token", Some(false)));
    }

    #[test]
    fn test_secure_encrypts_everything() {
        let policy = EncryptionPolicy::secure();
        assert!(policy.should_encrypt("nextapp_theme", None));
        assert!(policy.should_encrypt("", None));
        assert_eq!(policy.iterations.get(), 100_000);
    }

    #[test]
    fn test_balanced_patterns() {
        let policy = EncryptionPolicy::balanced();
        assert_eq!(policy.iterations.get(), 10_000);
        assert!(policy.should_encrypt("nextapp_AUTH_token", None));
        assert!(policy.should_encrypt("nextapp_password", None));
        assert!(!policy.should_encrypt("nextapp_theme", None));
        assert!(!policy.should_encrypt("nextapp_user_email", None));
    }

    #[test]
    fn test_default_patterns_when_enabled() {
        let policy = EncryptionPolicy::default().with_overrides(PolicyOverrides::default().enabled(true));
        assert!(policy.should_encrypt("nextapp_user_profile", None));
        assert!(policy.should_encrypt("nextapp_Email", None));
        assert!(!policy.should_encrypt("nextapp_theme", None));
    }

    #[test]
    fn test_overrides_merge() {
        let policy = EncryptionPolicy::balanced().with_overrides(
            PolicyOverrides::default()
                .iterations(NonZeroU32::new(5_000).unwrap())
                .cache_decrypted(false)
                .cache_capacity(64)
                .passphrase("override"),
        );
        assert!(policy.enabled);
        assert_eq!(policy.iterations.get(), 5_000);
        assert!(!policy.cache_decrypted);
        assert_eq!(policy.cache_capacity, Some(64));
        assert_eq!(policy.passphrase.as_deref(), Some("override"));
    }

    #[test]
    fn test_iteration_override_is_never_zero() {
        assert!(NonZeroU32::new(0).is_none());

        let policy = EncryptionPolicy::secure().with_overrides(PolicyOverrides::default().iterations(NonZeroU32::MIN));
        assert_eq!(policy.iterations.get(), 1);
    }

    #[test]
    fn test_debug_redacts_passphrase() {
        let policy = EncryptionPolicy::secure()
            .with_overrides(PolicyOverrides::default().passphrase("hidden-passphrase"));
        assert!(!format!("{:?}", policy).contains("hidden-passphrase"));
    }
}
