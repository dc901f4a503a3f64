//! Cookie options, header codecs and the interactive cookie jar
//!
//! Cookies have no delete primitive: a cookie is removed by writing it again
//! with an expiry in the past. Names and values are percent-encoded on the
//! wire and decoded on read.

use crate::config::DeploymentMode;
use crate::error::StorageResult;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Default cookie lifetime in seconds (7 days)
pub const DEFAULT_MAX_AGE_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Size above which browsers may silently drop a cookie
pub const MAX_COOKIE_BYTES: usize = 4096;

/// `SameSite` cookie attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    /// `SameSite=Strict`
    Strict,
    /// `SameSite=Lax`
    #[default]
    Lax,
    /// `SameSite=None`
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        };
        f.write_str(value)
    }
}

/// Cookie lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Absolute expiry (`Expires=`)
    At(DateTime<Utc>),
    /// Relative lifetime in seconds (`Max-Age=`)
    MaxAge(i64),
}

impl Expiry {
    /// An expiry that has already passed
    pub fn expired() -> Self {
        Expiry::At(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Absolute expiry instant relative to `now`
    pub fn deadline(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Expiry::At(at) => *at,
            Expiry::MaxAge(seconds) => Duration::try_seconds(*seconds)
                .and_then(|lifetime| now.checked_add_signed(lifetime))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Whether the cookie is already gone at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self {
            Expiry::At(at) => *at <= now,
            Expiry::MaxAge(seconds) => *seconds <= 0,
        }
    }
}

/// Caller-supplied cookie attributes; unset fields take the defaults
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOptions {
    /// `Path=`
    pub path: Option<String>,
    /// `Domain=`
    pub domain: Option<String>,
    /// `Expires=` or `Max-Age=`
    pub expiry: Option<Expiry>,
    /// `Secure`
    pub secure: Option<bool>,
    /// `HttpOnly`
    pub http_only: Option<bool>,
    /// `SameSite=`
    pub same_site: Option<SameSite>,
}

impl CookieOptions {
    /// Merge over the defaults for `mode`:
    /// `Path=/`, `SameSite=Lax`, 7-day `Max-Age`, `Secure` only in production.
    pub fn resolve(&self, mode: DeploymentMode) -> ResolvedCookieOptions {
        ResolvedCookieOptions {
            path: self.path.clone().unwrap_or_else(|| "/".to_string()),
            domain: self.domain.clone(),
            expiry: self.expiry.unwrap_or(Expiry::MaxAge(DEFAULT_MAX_AGE_SECONDS)),
            secure: self.secure.unwrap_or_else(|| mode.is_production()),
            http_only: self.http_only.unwrap_or(false),
            same_site: self.same_site.unwrap_or_default(),
        }
    }
}

/// Fully merged cookie attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCookieOptions {
    /// `Path=`
    pub path: String,
    /// `Domain=`, omitted when unset
    pub domain: Option<String>,
    /// `Expires=` or `Max-Age=`
    pub expiry: Expiry,
    /// `Secure`
    pub secure: bool,
    /// `HttpOnly`
    pub http_only: bool,
    /// `SameSite=`
    pub same_site: SameSite,
}

impl ResolvedCookieOptions {
    /// Same attributes with an expiry in the past
    pub fn expired(mut self) -> Self {
        self.expiry = Expiry::expired();
        self
    }
}

/// Format an HTTP-date (`Thu, 01 Jan 1970 00:00:00 GMT`)
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Build a `Set-Cookie` header value
pub fn format_set_cookie(name: &str, value: &str, options: &ResolvedCookieOptions) -> String {
    let mut header = format!("{}={}", name, urlencoding::encode(value));

    header.push_str(&format!("; Path={}", options.path));
    if let Some(domain) = &options.domain {
        header.push_str(&format!("; Domain={}", domain));
    }
    match options.expiry {
        Expiry::At(at) => header.push_str(&format!("; Expires={}", http_date(at))),
        Expiry::MaxAge(seconds) => header.push_str(&format!("; Max-Age={}", seconds)),
    }
    if options.secure {
        header.push_str("; Secure");
    }
    if options.http_only {
        header.push_str("; HttpOnly");
    }
    header.push_str(&format!("; SameSite={}", options.same_site));

    header
}

/// A `Set-Cookie` header reduced to what a reader needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    /// Cookie name
    pub name: String,
    /// Decoded cookie value
    pub value: String,
    /// Lifetime, if one was given
    pub expiry: Option<Expiry>,
}

impl SetCookie {
    /// Whether this header deletes the cookie
    pub fn is_removal(&self, now: DateTime<Utc>) -> bool {
        self.expiry.map(|e| e.is_expired(now)).unwrap_or(false)
    }
}

/// Parse a `Set-Cookie` header value
pub fn parse_set_cookie(header: &str) -> Option<SetCookie> {
    let mut parts = header.split(';');
    let (name, value) = split_pair(parts.next()?)?;

    let mut expiry = None;
    for attribute in parts {
        let attribute = attribute.trim();
        let (attr_name, attr_value) = match attribute.split_once('=') {
            Some((n, v)) => (n.trim(), v.trim()),
            None => (attribute, ""),
        };

        if attr_name.eq_ignore_ascii_case("max-age") {
            if let Ok(seconds) = attr_value.parse::<i64>() {
                // Max-Age takes precedence over Expires
                expiry = Some(Expiry::MaxAge(seconds));
            }
        } else if attr_name.eq_ignore_ascii_case("expires") && !matches!(expiry, Some(Expiry::MaxAge(_))) {
            if let Ok(at) = DateTime::parse_from_rfc2822(attr_value) {
                expiry = Some(Expiry::At(at.with_timezone(&Utc)));
            }
        }
    }

    Some(SetCookie { name, value, expiry })
}

/// Parse a `Cookie` request header into decoded name/value pairs
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header.split(';').filter_map(split_pair).collect()
}

/// Look up one cookie in a `Cookie` request header
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
    parse_cookie_header(header)
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v)
}

fn split_pair(pair: &str) -> Option<(String, String)> {
    let (name, value) = pair.trim().split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let value = value.trim().trim_matches('"');
    let decoded = urlencoding::decode(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string());
    Some((name.to_string(), decoded))
}

/// Interactive cookie primitive (the document cookie store)
pub trait CookieJar: Send + Sync + fmt::Debug {
    /// Read one cookie by name
    fn get(&self, name: &str) -> Option<String>;

    /// Write one cookie; an expiry in the past deletes it
    fn set(&self, name: &str, value: &str, options: &ResolvedCookieOptions) -> StorageResult<()>;

    /// Names of every cookie visible to the current document
    fn names(&self) -> Vec<String>;
}

#[derive(Debug, Clone)]
struct StoredCookie {
    encoded: String,
    expires_at: DateTime<Utc>,
    options: ResolvedCookieOptions,
}

/// In-process cookie jar with browser-like expiry semantics
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    cookies: RwLock<BTreeMap<String, StoredCookie>>,
}

impl MemoryCookieJar {
    /// Create an empty jar
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, StoredCookie>> {
        self.cookies.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, StoredCookie>> {
        self.cookies.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The `document.cookie`-style header for all live cookies
    pub fn header(&self) -> String {
        let now = Utc::now();
        self.read()
            .iter()
            .filter(|(_, c)| c.expires_at > now)
            .map(|(name, c)| format!("{}={}", name, c.encoded))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Attributes a live cookie was written with
    pub fn options(&self, name: &str) -> Option<ResolvedCookieOptions> {
        let now = Utc::now();
        self.read()
            .get(name)
            .filter(|c| c.expires_at > now)
            .map(|c| c.options.clone())
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        let header = self.header();
        find_cookie(&header, name)
    }

    fn set(&self, name: &str, value: &str, options: &ResolvedCookieOptions) -> StorageResult<()> {
        let now = Utc::now();
        let mut cookies = self.write();

        if options.expiry.is_expired(now) {
            cookies.remove(name);
            return Ok(());
        }

        cookies.insert(
            name.to_string(),
            StoredCookie {
                encoded: urlencoding::encode(value).into_owned(),
                expires_at: options.expiry.deadline(now),
                options: options.clone(),
            },
        );
        Ok(())
    }

    fn names(&self) -> Vec<String> {
        let now = Utc::now();
        self.read()
            .iter()
            .filter(|(_, c)| c.expires_at > now)
            .map(|(name, _)| name.clone())
            .collect()
    }
}
