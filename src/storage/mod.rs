//! Storage adapters and the primitives they sit on
//!
//! This module provides two adapters sharing one contract ([`StorageAdapter`]):
//! - **Cookie adapter** - cookies in an interactive client, or request/response
//!   headers on a server
//! - **Local adapter** - the device-local key/value store of an interactive client
//!
//! Both run values through the same [`Pipeline`]: JSON serialization,
//! policy-driven encryption and a decrypted-value cache.
//!
//! # Physical stores
//!
//! - [`MemoryCookieJar`] - in-process cookie jar with expiry handling
//! - [`MemoryLocalStore`] - in-process local store, optionally quota-bounded
//! - [`FileLocalStore`] - one file per key on disk (requires `file-store` feature)
//!
//! # Examples
//!
//! ## Local adapter
//!
//! ```rust
//! use sealed_storage::config::Settings;
//! use sealed_storage::policy::EncryptionPolicy;
//! use sealed_storage::storage::{ClientEnvironment, LocalAdapter, StorageAdapter};
//!
//! # async fn run() -> sealed_storage::Result<()> {
//! let adapter = LocalAdapter::interactive(
//!     ClientEnvironment::in_memory(),
//!     EncryptionPolicy::secure(),
//!     &Settings::default(),
//! );
//!
//! adapter.set("nextapp_auth_token", "abc123", None, None).await?;
//! let token: Option<String> = adapter.get("nextapp_auth_token").await?;
//! assert_eq!(token.as_deref(), Some("abc123"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Cookie adapter on a server
//!
//! ```rust
//! use std::sync::Arc;
//! use sealed_storage::config::Settings;
//! use sealed_storage::policy::EncryptionPolicy;
//! use sealed_storage::storage::{CookieAdapter, RequestContext, ResponseHeaders, StorageAdapter};
//!
//! # async fn run() -> sealed_storage::Result<()> {
//! let response = Arc::new(ResponseHeaders::new());
//! let request = RequestContext::from_cookie_header("nextapp_theme=dark").with_response(response.clone());
//! let cookies = CookieAdapter::server(Some(request), EncryptionPolicy::disabled(), &Settings::default());
//!
//! let theme: Option<String> = cookies.get("nextapp_theme").await?;
//! assert_eq!(theme.as_deref(), Some("dark"));
//!
//! cookies.set("nextapp_lang", "en", None, None).await?;
//! assert_eq!(response.set_cookies().len(), 1);
//! # Ok(())
//! # }
//! ```

// Adapter contract and shared pipeline
pub mod adapter;
pub mod cache;
pub mod keys;
pub mod pipeline;

// Physical stores and execution contexts
pub mod context;
pub mod cookies;
pub mod local_store;

#[cfg(feature = "file-store")]
pub mod storage_local;

// Adapters
pub mod cookie_adapter;
pub mod local_adapter;

pub use adapter::StorageAdapter;
pub use cache::{CachedValue, DecryptedValueCache};
pub use context::{ClientEnvironment, ExecutionContext, RequestContext, ResponseHeaders, SET_COOKIE};
pub use cookie_adapter::CookieAdapter;
pub use cookies::{CookieJar, CookieOptions, Expiry, MemoryCookieJar, ResolvedCookieOptions, SameSite};
pub use local_adapter::LocalAdapter;
pub use local_store::{LocalStore, MemoryLocalStore};
pub use pipeline::Pipeline;

#[cfg(feature = "file-store")]
pub use storage_local::{FileLocalStore, FileStoreConfig};

pub use crate::error::{StorageError, StorageResult};

/// Storage constants
pub mod constants {
    //! Constants used throughout the storage module

    pub use super::cookies::{DEFAULT_MAX_AGE_SECONDS, MAX_COOKIE_BYTES};
    pub use super::keys::MAX_KEY_LENGTH;
    pub use super::local_adapter::PROBE_KEY;
}
