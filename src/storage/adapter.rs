//! Storage adapter contract

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;

/// Uniform contract shared by the cookie and local adapters.
///
/// Every method returns an `Err` instead of panicking. A read of a key that
/// holds nothing is `Ok(None)`.
pub trait StorageAdapter: Send + Sync {
    /// Per-write options (cookie attributes, or `()` where none apply)
    type Options: Send + Sync;

    /// Read a value, overriding the policy's decryption decision when
    /// `force_decrypt` is set
    fn get_with<T>(
        &self,
        key: &str,
        force_decrypt: Option<bool>,
    ) -> impl Future<Output = Result<Option<T>>> + Send
    where
        T: DeserializeOwned + Send;

    /// Read a value
    fn get<T>(&self, key: &str) -> impl Future<Output = Result<Option<T>>> + Send
    where
        T: DeserializeOwned + Send,
    {
        self.get_with(key, None)
    }

    /// Write a value. `force_encrypt` overrides the policy in both directions.
    fn set<T>(
        &self,
        key: &str,
        value: &T,
        options: Option<&Self::Options>,
        force_encrypt: Option<bool>,
    ) -> impl Future<Output = Result<()>> + Send
    where
        T: Serialize + Sync + ?Sized;

    /// Delete a value; deleting a missing key succeeds
    fn remove(&self, key: &str, options: Option<&Self::Options>) -> impl Future<Output = Result<()>> + Send;

    /// Delete everything this adapter can reach and empty its cache
    fn clear(&self) -> impl Future<Output = Result<()>> + Send;
}
