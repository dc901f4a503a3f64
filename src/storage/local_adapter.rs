//! Local store adapter
//!
//! Only usable in an interactive client that has a [`LocalStore`]. Every
//! operation first probes the store with a disposable write and delete;
//! a store that exists but refuses writes (quota, private mode) is treated
//! as unavailable.

use crate::config::Settings;
use crate::error::{Result, StorageError, StorageResult};
use crate::policy::EncryptionPolicy;
use crate::storage::adapter::StorageAdapter;
use crate::storage::context::{ClientEnvironment, ExecutionContext};
use crate::storage::keys::validate_key;
use crate::storage::local_store::LocalStore;
use crate::storage::pipeline::{encode, into_typed, Pipeline};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Key written and deleted by the availability probe
pub const PROBE_KEY: &str = "__storage_test__";

/// Adapter over the device-local store
#[derive(Debug)]
pub struct LocalAdapter {
    pipeline: Pipeline,
    execution: ExecutionContext,
}

impl LocalAdapter {
    /// Create an adapter for the given execution context
    pub fn new(execution: ExecutionContext, policy: EncryptionPolicy, settings: &Settings) -> Self {
        Self::with_pipeline(execution, Pipeline::new("local", policy, settings))
    }

    /// Create an adapter around an existing pipeline
    pub fn with_pipeline(execution: ExecutionContext, pipeline: Pipeline) -> Self {
        Self { pipeline, execution }
    }

    /// Interactive adapter over a client environment
    pub fn interactive(environment: ClientEnvironment, policy: EncryptionPolicy, settings: &Settings) -> Self {
        Self::new(ExecutionContext::Interactive(environment), policy, settings)
    }

    /// The shared pipeline
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Whether the store is reachable and accepts writes right now
    pub fn is_available(&self) -> bool {
        self.store().is_ok()
    }

    fn store(&self) -> StorageResult<Arc<dyn LocalStore>> {
        let store = match &self.execution {
            ExecutionContext::Interactive(environment) => environment.local_store(),
            ExecutionContext::Server => None,
        };
        let store = store.ok_or_else(|| StorageError::Unavailable {
            backend: "local".to_string(),
            reason: format!("no local store in {} mode", self.execution.name()),
        })?;

        store
            .set_item(PROBE_KEY, PROBE_KEY)
            .and_then(|()| store.remove_item(PROBE_KEY))
            .map_err(|e| StorageError::Unavailable {
                backend: "local".to_string(),
                reason: e.to_string(),
            })?;

        Ok(store)
    }

    async fn read<T>(&self, key: &str, force_decrypt: Option<bool>) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        validate_key(key)?;
        let store = self.store()?;

        let raw = match store.get_item(key)? {
            Some(raw) => raw,
            None => {
                self.pipeline.forget(key);
                return Ok(None);
            }
        };

        let entry = self.pipeline.process_from_storage(key, &raw, force_decrypt).await;
        Ok(Some(into_typed(entry)?))
    }

    async fn write<T>(&self, key: &str, value: &T, force_encrypt: Option<bool>) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        validate_key(key)?;
        let store = self.store()?;

        let entry = encode(value)?;
        let raw = self.pipeline.process_for_storage(key, &entry.text, force_encrypt).await;
        store.set_item(key, &raw)?;
        self.pipeline.remember(key, &entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.store()?.remove_item(key)?;
        self.pipeline.forget(key);
        Ok(())
    }

    fn wipe(&self) -> Result<()> {
        let store = self.store()?;
        let count = store.len().unwrap_or(0);
        warn!(items = count, "clearing the entire local store, including keys not written here");
        store.clear()?;
        self.pipeline.forget_all();
        debug!("local store cleared");
        Ok(())
    }
}

impl StorageAdapter for LocalAdapter {
    type Options = ();

    async fn get_with<T>(&self, key: &str, force_decrypt: Option<bool>) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        self.pipeline
            .execute("get", Some(key), self.read(key, force_decrypt))
            .await
    }

    async fn set<T>(&self, key: &str, value: &T, _options: Option<&()>, force_encrypt: Option<bool>) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        self.pipeline
            .execute("set", Some(key), self.write(key, value, force_encrypt))
            .await
    }

    async fn remove(&self, key: &str, _options: Option<&()>) -> Result<()> {
        self.pipeline
            .execute("remove", Some(key), async { self.delete(key) })
            .await
    }

    async fn clear(&self) -> Result<()> {
        self.pipeline
            .execute("clear", None, async { self.wipe() })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CryptoMode, DeploymentMode};
    use crate::policy::PolicyOverrides;
    use crate::storage::local_store::MemoryLocalStore;
    use crate::Error;
    use serde::Deserialize;
    use serde_json::json;
    use std::num::NonZeroU32;

    fn settings() -> Settings {
        Settings {
            passphrase: "local test passphrase".to_string(),
            mode: DeploymentMode::Test,
            crypto: CryptoMode::Authenticated,
        }
    }

    fn adapter(policy: EncryptionPolicy) -> (LocalAdapter, Arc<MemoryLocalStore>) {
        let store = Arc::new(MemoryLocalStore::new());
        let environment = ClientEnvironment::new().with_local_store(store.clone());
        (LocalAdapter::interactive(environment, policy, &settings()), store)
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        email: String,
    }

    #[tokio::test]
    async fn test_round_trip_plain() {
        let (adapter, store) = adapter(EncryptionPolicy::disabled());
        adapter.set("nextapp_count", &42, None, None).await.unwrap();

        assert_eq!(store.get_item("nextapp_count").unwrap().as_deref(), Some("42"));
        let count: Option<u32> = adapter.get("nextapp_count").await.unwrap();
        assert_eq!(count, Some(42));
    }

    #[tokio::test]
    async fn test_round_trip_encrypted() {
        let policy = EncryptionPolicy::secure().with_overrides(PolicyOverrides::default().iterations(NonZeroU32::new(1_000).unwrap()));
        let (adapter, store) = adapter(policy);
        let profile = Profile {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        };

        adapter.set("nextapp_user_profile", &profile, None, None).await.unwrap();
        let raw = store.get_item("nextapp_user_profile").unwrap().unwrap();
        assert!(!raw.contains("ada@example.com"));

        adapter.pipeline().forget_all();
        let read: Option<Profile> = adapter.get("nextapp_user_profile").await.unwrap();
        assert_eq!(read, Some(profile));
    }

    #[tokio::test]
    async fn test_non_json_raw_value_read_as_string() {
        let (adapter, store) = adapter(EncryptionPolicy::disabled());
        store.set_item("legacy", "not json {").unwrap();

        let value: Option<serde_json::Value> = adapter.get("legacy").await.unwrap();
        assert_eq!(value, Some(json!("not json {")));
    }

    #[tokio::test]
    async fn test_strings_unchanged_after_reload() {
        let store = Arc::new(MemoryLocalStore::new());
        let environment = ClientEnvironment::new().with_local_store(store);
        let writer = LocalAdapter::interactive(environment.clone(), EncryptionPolicy::disabled(), &settings());

        for text in ["1.50", "1e2", "-0", " 42", "{ \"a\": 1 }", "100000000000000000000", "\"quoted\""] {
            writer.set("nextapp_value", text, None, None).await.unwrap();

            let reader = LocalAdapter::interactive(environment.clone(), EncryptionPolicy::disabled(), &settings());
            let read: Option<String> = reader.get("nextapp_value").await.unwrap();
            assert_eq!(read.as_deref(), Some(text));
        }
    }

    #[tokio::test]
    async fn test_missing_key() {
        let (adapter, _) = adapter(EncryptionPolicy::disabled());
        let value: Option<String> = adapter.get("nope").await.unwrap();
        assert!(value.is_none());
        adapter.remove("nope", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_probe_key_not_left_behind() {
        let (adapter, store) = adapter(EncryptionPolicy::disabled());
        adapter.set("k", "v", None, None).await.unwrap();
        assert_eq!(store.keys().unwrap(), vec!["k".to_string()]);
    }

    #[tokio::test]
    async fn test_clear_wipes_foreign_keys() {
        let (adapter, store) = adapter(EncryptionPolicy::disabled());
        store.set_item("other_app", "x").unwrap();
        adapter.set("ours", "y", None, None).await.unwrap();

        adapter.clear().await.unwrap();
        assert!(store.keys().unwrap().is_empty());
        assert!(adapter.pipeline().cache().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_in_server_mode() {
        let adapter = LocalAdapter::new(ExecutionContext::Server, EncryptionPolicy::disabled(), &settings());
        assert!(!adapter.is_available());

        let result: Result<Option<String>> = adapter.get("k").await;
        assert!(matches!(result, Err(Error::Storage(StorageError::Unavailable { .. }))));
        assert!(adapter.set("k", "v", None, None).await.is_err());
        assert!(adapter.clear().await.is_err());
    }

    #[tokio::test]
    async fn test_unavailable_when_store_refuses_writes() {
        let (adapter, store) = adapter(EncryptionPolicy::disabled());
        store.set_disabled(true);
        assert!(!adapter.is_available());

        let result = adapter.set("k", "v", None, None).await;
        assert!(matches!(result, Err(Error::Storage(StorageError::Unavailable { .. }))));
    }

    #[tokio::test]
    async fn test_quota_exceeded_on_write() {
        let store = Arc::new(MemoryLocalStore::with_quota(64));
        let environment = ClientEnvironment::new().with_local_store(store);
        let adapter = LocalAdapter::interactive(environment, EncryptionPolicy::disabled(), &settings());

        let result = adapter.set("k", &"x".repeat(100), None, None).await;
        assert!(matches!(result, Err(Error::Storage(StorageError::QuotaExceeded))));
    }
}
