//! # Sealed Storage
//!
//! Encrypted key/value storage over cookies and a device-local store, with
//! one adapter contract for interactive clients and servers alike.
//!
//! ## Features
//!
//! - **Crypto Module**: PBKDF2-HMAC-SHA256 key derivation and an AES-256-GCM
//!   envelope (`base64(salt || iv || ciphertext)`), with a base64 fallback
//! - **Policy Module**: per-key encryption decisions and the disabled,
//!   secure and balanced presets
//! - **Storage Module**: the cookie and local adapters, their shared
//!   serialization/encryption/caching pipeline, and in-memory and file
//!   backed physical stores
//! - **Factory**: one call to get both adapters for a context
//!
//! ## Optional Features
//!
//! - `file-store`: filesystem-backed local store (enabled by default)
//!
//! ## Example
//!
//! ```rust
//! use sealed_storage::prelude::*;
//!
//! # async fn run() -> sealed_storage::Result<()> {
//! let settings = Settings::default();
//! let execution = ExecutionContext::Interactive(ClientEnvironment::in_memory());
//! let storage = create_balanced_storage(&execution, None, &settings, PolicyOverrides::default());
//!
//! storage.cookies.set("nextapp_auth_token", "abc123", None, None).await?;
//! storage.local.set("nextapp_theme", "dark", None, None).await?;
//!
//! let token: Option<String> = storage.cookies.get("nextapp_auth_token").await?;
//! assert_eq!(token.as_deref(), Some("abc123"));
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core error types
pub use error::{Error, Result};

// Core modules
pub mod config;
pub mod crypto;
pub mod error;
pub mod factory;
pub mod logging;
pub mod policy;
pub mod storage;

pub use factory::{create_balanced_storage, create_secure_storage, create_storage, Storage};

// Re-export commonly used types
pub mod prelude {
    //! Common types and traits for convenient importing

    pub use crate::config::{CryptoMode, DeploymentMode, Settings};
    pub use crate::crypto::EncryptionService;
    pub use crate::error::{Error, Result, StorageError};
    pub use crate::factory::{create_balanced_storage, create_secure_storage, create_storage, Storage};
    pub use crate::policy::{EncryptionPolicy, PolicyOverrides};
    pub use crate::storage::{
        ClientEnvironment, CookieAdapter, CookieOptions, ExecutionContext, LocalAdapter, RequestContext,
        ResponseHeaders, StorageAdapter,
    };
}

// Version information
/// The version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
