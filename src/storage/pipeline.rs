//! Shared adapter pipeline
//!
//! Write path: value → JSON (strings verbatim) → encrypt if the policy says
//! so → string handed to the physical store.
//!
//! Read path: cached value if present, otherwise decrypt if the policy says
//! so, then JSON-parse, falling back to the literal string. Parse failures
//! never surface as errors.

use crate::config::{DeploymentMode, Settings};
use crate::crypto::EncryptionService;
use crate::error::{Result, SerializerError, SerializerResult};
use crate::policy::EncryptionPolicy;
use crate::storage::cache::{CachedValue, DecryptedValueCache};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use tracing::{debug, error};

/// Serialization, encryption and caching shared by every adapter
#[derive(Debug)]
pub struct Pipeline {
    adapter: &'static str,
    policy: EncryptionPolicy,
    crypto: EncryptionService,
    cache: DecryptedValueCache,
    mode: DeploymentMode,
}

impl Pipeline {
    /// Build the pipeline for one adapter instance
    pub fn new(adapter: &'static str, policy: EncryptionPolicy, settings: &Settings) -> Self {
        let passphrase = policy
            .passphrase
            .clone()
            .unwrap_or_else(|| settings.passphrase.clone());
        let crypto = EncryptionService::new(passphrase, policy.iterations, settings.crypto);
        Self::with_service(adapter, policy, crypto, settings.mode)
    }

    /// Build the pipeline around an existing encryption service
    pub fn with_service(
        adapter: &'static str,
        policy: EncryptionPolicy,
        crypto: EncryptionService,
        mode: DeploymentMode,
    ) -> Self {
        let cache = match policy.cache_capacity {
            Some(capacity) => DecryptedValueCache::with_capacity(capacity),
            None => DecryptedValueCache::new(),
        };

        Self {
            adapter,
            policy,
            crypto,
            cache,
            mode,
        }
    }

    /// The active policy
    pub fn policy(&self) -> &EncryptionPolicy {
        &self.policy
    }

    /// The decoded-value cache
    pub fn cache(&self) -> &DecryptedValueCache {
        &self.cache
    }

    /// Deployment mode the adapter runs under
    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    /// Produce the string to persist for already-serialized `text`
    pub async fn process_for_storage(&self, key: &str, text: &str, force: Option<bool>) -> String {
        if self.policy.should_encrypt(key, force) {
            debug!(adapter = self.adapter, key, "encrypting value");
            self.crypto.encrypt(text).await
        } else {
            text.to_string()
        }
    }

    /// Resolve a persisted string back into a value
    pub async fn process_from_storage(&self, key: &str, raw: &str, force: Option<bool>) -> CachedValue {
        if self.policy.cache_decrypted {
            if let Some(cached) = self.cache.get(key) {
                debug!(adapter = self.adapter, key, "cache hit");
                return cached;
            }
        }

        let decoded = if self.policy.should_encrypt(key, force) {
            match self.crypto.decrypt(raw).await {
                Ok(plaintext) => decode(plaintext),
                Err(e) => {
                    debug!(adapter = self.adapter, key, error = %e, "decryption unavailable, reading raw value");
                    decode(raw.to_string())
                }
            }
        } else {
            decode(raw.to_string())
        };

        self.remember(key, &decoded);
        decoded
    }

    /// Record a freshly written value in the cache
    pub fn remember(&self, key: &str, value: &CachedValue) {
        if self.policy.cache_decrypted {
            self.cache.insert(key, value.clone());
        }
    }

    /// Drop a key from the cache
    pub fn forget(&self, key: &str) {
        self.cache.remove(key);
    }

    /// Drop every cached value
    pub fn forget_all(&self) {
        self.cache.clear();
    }

    /// Run one public operation, logging its failure.
    ///
    /// Errors are logged at `error` level in development and at `debug`
    /// level otherwise; the error itself is always returned to the caller.
    pub async fn execute<T, F>(&self, operation: &'static str, key: Option<&str>, body: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let result = body.await;
        if let Err(e) = &result {
            if self.mode.is_development() {
                error!(adapter = self.adapter, operation, key, error = %e, "storage operation failed");
            } else {
                debug!(adapter = self.adapter, operation, key, error = %e, "storage operation failed");
            }
        }
        result
    }
}

/// JSON-parse `text`, or keep it as a string literal.
///
/// Strings are written verbatim, so text that parses as a JSON string is
/// kept as written rather than unquoted.
pub fn decode(text: String) -> CachedValue {
    let value = match serde_json::from_str::<Value>(&text) {
        Ok(value) if !value.is_string() => value,
        _ => Value::String(text.clone()),
    };
    CachedValue { value, text }
}

/// Serialize a caller value; strings are kept verbatim, everything else is JSON
pub fn encode<T: Serialize + ?Sized>(value: &T) -> SerializerResult<CachedValue> {
    let value = serde_json::to_value(value).map_err(|e| SerializerError::SerializationFailed {
        reason: e.to_string(),
    })?;
    let text = match &value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Ok(CachedValue { value, text })
}

/// Deserialize a resolved value into the caller's type.
///
/// When the JSON reading does not fit `T` the other reading of the stored
/// text is tried: the verbatim text for parsed values, so `"1.50"` is still
/// `"1.50"` as a `String`, and the parsed text for string values.
pub fn into_typed<T: DeserializeOwned>(entry: CachedValue) -> SerializerResult<T> {
    let CachedValue { value, text } = entry;
    let is_string = value.is_string();

    match serde_json::from_value::<T>(value) {
        Ok(typed) => Ok(typed),
        Err(first) => {
            let alternate = if is_string {
                serde_json::from_str::<Value>(&text).ok()
            } else {
                Some(Value::String(text))
            };
            alternate
                .and_then(|value| serde_json::from_value::<T>(value).ok())
                .ok_or_else(|| SerializerError::DeserializationFailed {
                    reason: first.to_string(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CryptoMode;
    use crate::policy::PolicyOverrides;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde_json::json;
    use std::num::NonZeroU32;

    const ITERATIONS: NonZeroU32 = match NonZeroU32::new(1_000) {
        Some(n) => n,
        None => unreachable!(),
    };

    fn pipeline(policy: EncryptionPolicy) -> Pipeline {
        let crypto = EncryptionService::new("pipeline passphrase", ITERATIONS, CryptoMode::Authenticated);
        Pipeline::with_service("test", policy, crypto, DeploymentMode::Test)
    }

    fn secure() -> EncryptionPolicy {
        EncryptionPolicy::secure().with_overrides(PolicyOverrides::default().iterations(ITERATIONS))
    }

    #[test]
    fn test_strings_encoded_verbatim() {
        assert_eq!(encode("light").unwrap().text, "light");
        assert_eq!(encode("1.50").unwrap().text, "1.50");
    }

    #[test]
    fn test_objects_encoded_as_json() {
        assert_eq!(encode(&json!({"lang": "en"})).unwrap().text, r#"{"lang":"en"}"#);
    }

    #[tokio::test]
    async fn test_plain_text_passes_through() {
        let pipeline = pipeline(EncryptionPolicy::disabled());
        assert_eq!(pipeline.process_for_storage("nextapp_theme", "light", None).await, "light");
    }

    #[tokio::test]
    async fn test_encrypted_round_trip() {
        let writer = pipeline(secure());
        let entry = encode(&json!({"id": 42, "roles": ["admin"]})).unwrap();
        let stored = writer.process_for_storage("nextapp_user", &entry.text, None).await;
        assert!(!stored.contains("admin"));
        assert!(STANDARD.decode(&stored).unwrap().len() >= 28);

        // fresh pipeline so the cache cannot answer
        let reader = pipeline(secure());
        assert_eq!(reader.process_from_storage("nextapp_user", &stored, None).await, entry);
    }

    #[tokio::test]
    async fn test_force_flag_on_read() {
        let pipeline = pipeline(EncryptionPolicy::disabled());
        let stored = pipeline.process_for_storage("k", "abc123", Some(true)).await;
        assert_ne!(stored, "abc123");

        let reader = self::pipeline(EncryptionPolicy::disabled());
        let read = reader.process_from_storage("k", &stored, Some(true)).await;
        assert_eq!(read.value, json!("abc123"));
    }

    #[tokio::test]
    async fn test_plain_value_under_encrypting_policy() {
        let pipeline = pipeline(secure());
        // written before encryption was switched on
        let read = pipeline.process_from_storage("a", "light", None).await;
        assert_eq!(read.value, json!("light"));
    }

    #[tokio::test]
    async fn test_cache_hit_bypasses_store() {
        let pipeline = pipeline(EncryptionPolicy::disabled());
        pipeline.remember("k", &decode("cached".to_string()));
        assert_eq!(pipeline.process_from_storage("k", "physical", None).await.text, "cached");

        pipeline.forget("k");
        assert_eq!(pipeline.process_from_storage("k", "physical", None).await.text, "physical");
    }

    #[tokio::test]
    async fn test_cache_disabled() {
        let policy = EncryptionPolicy::disabled().with_overrides(PolicyOverrides::default().cache_decrypted(false));
        let pipeline = pipeline(policy);
        pipeline.remember("k", &decode("cached".to_string()));
        assert!(pipeline.cache().is_empty());
        assert_eq!(pipeline.process_from_storage("k", "physical", None).await.text, "physical");
    }

    #[tokio::test]
    async fn test_numeric_looking_strings_survive_reload() {
        let writer = pipeline(secure());
        for text in ["1.50", "1e2", "-0", " 42", "{ \"a\": 1 }", "100000000000000000000", "\"quoted\""] {
            let stored = writer.process_for_storage("nextapp_value", text, None).await;

            let reader = pipeline(secure());
            let read = reader.process_from_storage("nextapp_value", &stored, None).await;
            assert_eq!(into_typed::<String>(read).unwrap(), text);
        }
    }

    #[tokio::test]
    async fn test_execute_passes_errors_through() {
        let pipeline = pipeline(EncryptionPolicy::disabled());
        let result: Result<()> = pipeline
            .execute("get", Some("k"), async {
                Err::<(), _>(crate::Error::from(crate::error::StorageError::QuotaExceeded))
            })
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode("42".to_string()).value, json!(42));
        assert_eq!(decode(r#"{"a":true}"#.to_string()).value, json!({"a": true}));
        assert_eq!(decode("dark".to_string()).value, json!("dark"));
        assert_eq!(decode(String::new()).value, json!(""));
        assert_eq!(decode(r#""quoted""#.to_string()).value, json!(r#""quoted""#));
    }

    #[test]
    fn test_into_typed_falls_back_to_other_reading() {
        assert_eq!(into_typed::<String>(decode("123".to_string())).unwrap(), "123");
        assert_eq!(into_typed::<u32>(decode("123".to_string())).unwrap(), 123);
        assert_eq!(into_typed::<String>(decode("1.50".to_string())).unwrap(), "1.50");

        // a string written this session, read back as a number
        assert_eq!(into_typed::<f64>(encode("1.50").unwrap()).unwrap(), 1.5);

        assert!(into_typed::<u32>(decode("not a number".to_string())).is_err());
    }
}
