//! Cookie adapter
//!
//! Interactive mode talks to the installed [`CookieJar`]. Server mode reads
//! the inbound `Cookie` header of its [`RequestContext`] and writes by
//! appending `Set-Cookie` entries to the response, leaving entries for
//! other cookies in place. `clear` has no server-mode equivalent.

use crate::config::Settings;
use crate::error::{Result, StorageError, StorageResult};
use crate::policy::EncryptionPolicy;
use crate::storage::adapter::StorageAdapter;
use crate::storage::context::{ClientEnvironment, ExecutionContext, RequestContext, ResponseHeaders, SET_COOKIE};
use crate::storage::cookies::{
    find_cookie, format_set_cookie, parse_set_cookie, CookieJar, CookieOptions, ResolvedCookieOptions,
    MAX_COOKIE_BYTES,
};
use crate::storage::keys::validate_cookie_name;
use crate::storage::pipeline::{encode, into_typed, Pipeline};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Adapter over the cookie store
#[derive(Debug)]
pub struct CookieAdapter {
    pipeline: Pipeline,
    execution: ExecutionContext,
    request: Option<RequestContext>,
}

impl CookieAdapter {
    /// Create an adapter for the given execution context
    pub fn new(
        execution: ExecutionContext,
        request: Option<RequestContext>,
        policy: EncryptionPolicy,
        settings: &Settings,
    ) -> Self {
        Self::with_pipeline(execution, request, Pipeline::new("cookies", policy, settings))
    }

    /// Create an adapter around an existing pipeline
    pub fn with_pipeline(execution: ExecutionContext, request: Option<RequestContext>, pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            execution,
            request,
        }
    }

    /// Interactive adapter over a client environment
    pub fn interactive(environment: ClientEnvironment, policy: EncryptionPolicy, settings: &Settings) -> Self {
        Self::new(ExecutionContext::Interactive(environment), None, policy, settings)
    }

    /// Server adapter for one request
    pub fn server(request: Option<RequestContext>, policy: EncryptionPolicy, settings: &Settings) -> Self {
        Self::new(ExecutionContext::Server, request, policy, settings)
    }

    /// The shared pipeline
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Where this adapter runs
    pub fn execution(&self) -> &ExecutionContext {
        &self.execution
    }

    fn jar(environment: &ClientEnvironment) -> StorageResult<Arc<dyn CookieJar>> {
        environment
            .cookie_jar()
            .ok_or_else(|| StorageError::DependencyUnavailable {
                dependency: "cookie jar".to_string(),
            })
    }

    fn request(&self, operation: &str) -> StorageResult<&RequestContext> {
        self.request.as_ref().ok_or_else(|| StorageError::MissingContext {
            operation: operation.to_string(),
        })
    }

    fn response(&self, operation: &str) -> StorageResult<&Arc<ResponseHeaders>> {
        self.request(operation)?
            .response()
            .ok_or_else(|| StorageError::MissingResponse {
                operation: operation.to_string(),
            })
    }

    fn read_raw(&self, key: &str) -> StorageResult<Option<String>> {
        match &self.execution {
            ExecutionContext::Interactive(environment) => Ok(Self::jar(environment)?.get(key)),
            ExecutionContext::Server => {
                let request = self.request("get")?;

                // cookies already written during this request shadow the inbound header
                if let Some(response) = request.response() {
                    let now = Utc::now();
                    let pending = response
                        .set_cookies()
                        .iter()
                        .rev()
                        .filter_map(|header| parse_set_cookie(header))
                        .find(|cookie| cookie.name == key);
                    if let Some(cookie) = pending {
                        return Ok((!cookie.is_removal(now)).then_some(cookie.value));
                    }
                }

                Ok(request.cookie_header().and_then(|header| find_cookie(header, key)))
            }
        }
    }

    fn write_raw(&self, operation: &str, key: &str, raw: &str, options: &ResolvedCookieOptions) -> StorageResult<()> {
        match &self.execution {
            ExecutionContext::Interactive(environment) => Self::jar(environment)?.set(key, raw, options),
            ExecutionContext::Server => {
                let response = self.response(operation)?;
                response.append(SET_COOKIE, format_set_cookie(key, raw, options));
                Ok(())
            }
        }
    }

    fn resolve(&self, options: Option<&CookieOptions>) -> ResolvedCookieOptions {
        options
            .cloned()
            .unwrap_or_default()
            .resolve(self.pipeline.mode())
    }

    async fn read<T>(&self, key: &str, force_decrypt: Option<bool>) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        validate_cookie_name(key)?;

        let raw = match self.read_raw(key)? {
            Some(raw) => raw,
            None => {
                self.pipeline.forget(key);
                return Ok(None);
            }
        };

        let entry = self.pipeline.process_from_storage(key, &raw, force_decrypt).await;
        Ok(Some(into_typed(entry)?))
    }

    async fn write<T>(
        &self,
        key: &str,
        value: &T,
        options: Option<&CookieOptions>,
        force_encrypt: Option<bool>,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        validate_cookie_name(key)?;

        let entry = encode(value)?;
        let raw = self.pipeline.process_for_storage(key, &entry.text, force_encrypt).await;
        let resolved = self.resolve(options);

        let encoded_len = key.len() + urlencoding::encode(&raw).len() + 1;
        if encoded_len > MAX_COOKIE_BYTES {
            warn!(key, bytes = encoded_len, "cookie exceeds 4096 bytes and may be dropped");
        }

        self.write_raw("set", key, &raw, &resolved)?;
        self.pipeline.remember(key, &entry);
        debug!(key, mode = self.execution.name(), "cookie written");
        Ok(())
    }

    fn expire(&self, key: &str, options: Option<&CookieOptions>) -> Result<()> {
        validate_cookie_name(key)?;

        let resolved = self.resolve(options).expired();
        self.write_raw("remove", key, "", &resolved)?;
        self.pipeline.forget(key);
        Ok(())
    }

    fn expire_all(&self) -> Result<()> {
        let environment = match &self.execution {
            ExecutionContext::Interactive(environment) => environment,
            ExecutionContext::Server => {
                return Err(StorageError::Unsupported {
                    operation: "clear".to_string(),
                    mode: self.execution.name().to_string(),
                }
                .into());
            }
        };

        let jar = Self::jar(environment)?;
        let expired = self.resolve(None).expired();
        for name in jar.names() {
            jar.set(&name, "", &expired)?;
        }
        self.pipeline.forget_all();
        Ok(())
    }
}

impl StorageAdapter for CookieAdapter {
    type Options = CookieOptions;

    async fn get_with<T>(&self, key: &str, force_decrypt: Option<bool>) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        self.pipeline
            .execute("get", Some(key), self.read(key, force_decrypt))
            .await
    }

    async fn set<T>(
        &self,
        key: &str,
        value: &T,
        options: Option<&CookieOptions>,
        force_encrypt: Option<bool>,
    ) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        self.pipeline
            .execute("set", Some(key), self.write(key, value, options, force_encrypt))
            .await
    }

    async fn remove(&self, key: &str, options: Option<&CookieOptions>) -> Result<()> {
        self.pipeline
            .execute("remove", Some(key), async { self.expire(key, options) })
            .await
    }

    async fn clear(&self) -> Result<()> {
        self.pipeline
            .execute("clear", None, async { self.expire_all() })
            .await
    }
}
