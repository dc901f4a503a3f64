//! Storage factory
//!
//! Each constructor wires one policy preset, with caller overrides merged on
//! top, into a cookie adapter and a local adapter for the same context.

use crate::config::Settings;
use crate::policy::{EncryptionPolicy, PolicyOverrides};
use crate::storage::{CookieAdapter, ExecutionContext, LocalAdapter, RequestContext};
use tracing::{debug, warn};

/// The pair of adapters handed out by the factory
#[derive(Debug)]
pub struct Storage {
    /// Cookie-backed adapter
    pub cookies: CookieAdapter,
    /// Local-store-backed adapter
    pub local: LocalAdapter,
}

impl Storage {
    /// Build both adapters from one policy
    pub fn with_policy(
        execution: &ExecutionContext,
        request: Option<RequestContext>,
        settings: &Settings,
        policy: EncryptionPolicy,
    ) -> Self {
        debug!(
            mode = execution.name(),
            encryption = policy.enabled,
            iterations = policy.iterations.get(),
            "creating storage"
        );

        if policy.enabled && policy.passphrase.is_none() && settings.uses_default_passphrase() {
            warn!("encryption enabled with the built-in default passphrase");
        }

        Self {
            cookies: CookieAdapter::new(execution.clone(), request, policy.clone(), settings),
            local: LocalAdapter::new(execution.clone(), policy, settings),
        }
    }
}

/// Storage with encryption disabled unless the overrides turn it on
pub fn create_storage(
    execution: &ExecutionContext,
    request: Option<RequestContext>,
    settings: &Settings,
    overrides: PolicyOverrides,
) -> Storage {
    let policy = EncryptionPolicy::default().with_overrides(overrides);
    Storage::with_policy(execution, request, settings, policy)
}

/// Storage that encrypts every key at 100 000 PBKDF2 iterations
pub fn create_secure_storage(
    execution: &ExecutionContext,
    request: Option<RequestContext>,
    settings: &Settings,
    overrides: PolicyOverrides,
) -> Storage {
    let policy = EncryptionPolicy::secure().with_overrides(overrides);
    Storage::with_policy(execution, request, settings, policy)
}

/// Storage that encrypts only token, password, secret and auth keys at
/// 10 000 iterations
pub fn create_balanced_storage(
    execution: &ExecutionContext,
    request: Option<RequestContext>,
    settings: &Settings,
    overrides: PolicyOverrides,
) -> Storage {
    let policy = EncryptionPolicy::balanced().with_overrides(overrides);
    Storage::with_policy(execution, request, settings, policy)
}
