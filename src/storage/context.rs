//! Execution contexts
//!
//! An adapter runs either inside an interactive client, where a cookie jar
//! and a local store are reachable, or on a server handling one request,
//! where cookies arrive in the `Cookie` header and leave through
//! `Set-Cookie` response headers.

use crate::storage::cookies::{CookieJar, MemoryCookieJar};
use crate::storage::local_store::{LocalStore, MemoryLocalStore};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// `Set-Cookie` header name
pub const SET_COOKIE: &str = "Set-Cookie";

/// Multi-valued response header collection.
///
/// `append` never replaces an existing entry, so several cookies can be set
/// on one response.
#[derive(Debug, Default)]
pub struct ResponseHeaders {
    entries: Mutex<Vec<(String, String)>>,
}

impl ResponseHeaders {
    /// Create an empty header collection
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(String, String)>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add one header entry after any existing ones
    pub fn append(&self, name: &str, value: impl Into<String>) {
        self.lock().push((name.to_string(), value.into()));
    }

    /// All `Set-Cookie` values in insertion order, matched case-insensitively
    pub fn set_cookies(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(SET_COOKIE))
            .map(|(_, value)| value.clone())
            .collect()
    }
}

/// Handle on one inbound request and its outbound response
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cookie_header: Option<String>,
    response: Option<Arc<ResponseHeaders>>,
}

impl RequestContext {
    /// Build a context from its parts
    pub fn new(cookie_header: Option<String>, response: Option<Arc<ResponseHeaders>>) -> Self {
        Self {
            cookie_header,
            response,
        }
    }

    /// Read-only context for a request carrying `cookie_header`
    pub fn from_cookie_header(cookie_header: impl Into<String>) -> Self {
        Self::new(Some(cookie_header.into()), None)
    }

    /// Attach a response handle for writes
    pub fn with_response(mut self, response: Arc<ResponseHeaders>) -> Self {
        self.response = Some(response);
        self
    }

    /// Inbound `Cookie` header, if any
    pub fn cookie_header(&self) -> Option<&str> {
        self.cookie_header.as_deref()
    }

    /// Outbound response handle, if any
    pub fn response(&self) -> Option<&Arc<ResponseHeaders>> {
        self.response.as_ref()
    }
}

/// Primitives reachable from an interactive client.
///
/// The cookie jar may be installed after construction; until then cookie
/// operations report the dependency as unavailable.
#[derive(Debug, Clone, Default)]
pub struct ClientEnvironment {
    cookie_jar: Arc<RwLock<Option<Arc<dyn CookieJar>>>>,
    local_store: Option<Arc<dyn LocalStore>>,
}

impl ClientEnvironment {
    /// Environment with nothing installed
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment backed by an in-memory jar and local store
    pub fn in_memory() -> Self {
        Self::new()
            .with_cookie_jar(Arc::new(MemoryCookieJar::new()))
            .with_local_store(Arc::new(MemoryLocalStore::new()))
    }

    /// Install the cookie jar up front
    pub fn with_cookie_jar(self, jar: Arc<dyn CookieJar>) -> Self {
        self.install_cookie_jar(jar);
        self
    }

    /// Attach the local store
    pub fn with_local_store(mut self, store: Arc<dyn LocalStore>) -> Self {
        self.local_store = Some(store);
        self
    }

    /// Install (or replace) the cookie jar; visible to every clone
    pub fn install_cookie_jar(&self, jar: Arc<dyn CookieJar>) {
        let mut slot = self.cookie_jar.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(jar);
    }

    /// The cookie jar, once installed
    pub fn cookie_jar(&self) -> Option<Arc<dyn CookieJar>> {
        self.cookie_jar
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The local store, if this client has one
    pub fn local_store(&self) -> Option<Arc<dyn LocalStore>> {
        self.local_store.clone()
    }
}

/// Where an adapter is running
#[derive(Debug, Clone)]
pub enum ExecutionContext {
    /// Interactive client with direct access to cookie jar and local store
    Interactive(ClientEnvironment),
    /// Server handling requests; cookies travel through headers
    Server,
}

impl ExecutionContext {
    /// Short mode name used in errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionContext::Interactive(_) => "interactive",
            ExecutionContext::Server => "server",
        }
    }
}
