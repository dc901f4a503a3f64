//! Deployment configuration
//!
//! The storage layer consumes three values from its environment: the
//! passphrase used for key derivation, the deployment mode (which toggles
//! the default `Secure` cookie attribute and error-log verbosity) and the
//! crypto backend selection.

use crate::error::{ConfigError, ConfigResult};
use std::fmt;
use std::str::FromStr;

/// Environment variable holding the key-derivation passphrase
pub const PASSPHRASE_VAR: &str = "SEALED_STORAGE_PASSPHRASE";

/// Environment variable holding the deployment mode
pub const MODE_VAR: &str = "SEALED_STORAGE_ENV";

/// Environment variable holding the crypto backend selection
pub const CRYPTO_VAR: &str = "SEALED_STORAGE_CRYPTO";

/// Passphrase used when none is configured.
///
/// This is a weak, publicly known default. It is not a secret and only
/// keeps values from being readable at a glance.
pub const DEFAULT_PASSPHRASE: &str = "sealed-storage-default-passphrase";

/// Deployment mode of the hosting application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeploymentMode {
    /// Local development: verbose error logging, insecure cookies allowed
    #[default]
    Development,
    /// Production: `Secure` cookies by default, quiet error logging
    Production,
    /// Test runs
    Test,
}

impl DeploymentMode {
    /// Whether cookies default to the `Secure` attribute
    pub fn is_production(&self) -> bool {
        matches!(self, DeploymentMode::Production)
    }

    /// Whether failed operations are logged at error level
    pub fn is_development(&self) -> bool {
        matches!(self, DeploymentMode::Development)
    }
}

impl FromStr for DeploymentMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            _ => Err(ConfigError::InvalidValue {
                variable: MODE_VAR.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        };
        f.write_str(name)
    }
}

/// Which crypto backend the encryption service should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CryptoMode {
    /// Probe the platform once and pick the best available backend
    #[default]
    Auto,
    /// Always use AES-256-GCM with PBKDF2 key derivation
    Authenticated,
    /// Always use the plain base64 fallback (insecure)
    Fallback,
}

impl FromStr for CryptoMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "authenticated" | "aead" => Ok(Self::Authenticated),
            "fallback" | "base64" => Ok(Self::Fallback),
            _ => Err(ConfigError::InvalidValue {
                variable: CRYPTO_VAR.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Settings consumed from the deployment environment
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    /// Passphrase for key derivation
    pub passphrase: String,
    /// Deployment mode
    pub mode: DeploymentMode,
    /// Crypto backend selection
    pub crypto: CryptoMode,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("passphrase", &"[redacted]")
            .field("mode", &self.mode)
            .field("crypto", &self.crypto)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            passphrase: DEFAULT_PASSPHRASE.to_string(),
            mode: DeploymentMode::default(),
            crypto: CryptoMode::default(),
        }
    }
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load a `.env` file if one exists, then read the process environment
    pub fn load() -> ConfigResult<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "failed to load .env file");
            }
        }
        Self::from_env()
    }

    /// Build settings from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let passphrase = match lookup(PASSPHRASE_VAR).filter(|p| !p.is_empty()) {
            Some(passphrase) => passphrase,
            None => {
                tracing::warn!(
                    variable = PASSPHRASE_VAR,
                    "no passphrase configured, using the built-in default"
                );
                DEFAULT_PASSPHRASE.to_string()
            }
        };

        let mode = match lookup(MODE_VAR) {
            Some(value) => value.parse()?,
            None => DeploymentMode::default(),
        };

        let crypto = match lookup(CRYPTO_VAR) {
            Some(value) => value.parse()?,
            None => CryptoMode::default(),
        };

        Ok(Self {
            passphrase,
            mode,
            crypto,
        })
    }

    /// Settings for production deployments with the given passphrase
    pub fn production(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
            mode: DeploymentMode::Production,
            crypto: CryptoMode::Auto,
        }
    }

    /// Whether the passphrase is the built-in weak default
    pub fn uses_default_passphrase(&self) -> bool {
        self.passphrase == DEFAULT_PASSPHRASE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert!(settings.uses_default_passphrase());
        assert_eq!(settings.mode, DeploymentMode::Development);
        assert_eq!(settings.crypto, CryptoMode::Auto);
    }

    #[test]
    fn test_settings_from_lookup() {
        let settings = Settings::from_lookup(lookup_from(&[
            (PASSPHRASE_VAR, "hunter2-but-longer"),
            (MODE_VAR, "production"),
            (CRYPTO_VAR, "fallback"),
        ]))
        .unwrap();

        assert_eq!(settings.passphrase, "hunter2-but-longer");
        assert!(settings.mode.is_production());
        assert_eq!(settings.crypto, CryptoMode::Fallback);
    }

    #[test]
    fn test_empty_passphrase_falls_back() {
        let settings = Settings::from_lookup(lookup_from(&[(PASSPHRASE_VAR, "")])).unwrap();
        assert!(settings.uses_default_passphrase());
    }

    #[test]
    fn test_invalid_mode_rejected() {
        let result = Settings::from_lookup(lookup_from(&[(MODE_VAR, "staging")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_debug_redacts_passphrase() {
        let settings = Settings::production("super-secret-value");
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("super-secret-value"));
        assert!(debug.contains("redacted"));
    }
}
