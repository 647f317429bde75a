use crate::util::{ensure_dir, unix_now};
use anyhow::{Context, Result};
use cookie::Cookie;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    #[serde(default)]
    pub host_only: bool,
    #[serde(default)]
    pub secure: bool,
    /// Unix seconds; `None` for session cookies.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl StoredCookie {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }

    fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let domain_ok = if self.host_only {
            host == self.domain
        } else {
            host == self.domain || host.ends_with(&format!(".{}", self.domain))
        };
        if !domain_ok {
            return false;
        }
        if self.secure && url.scheme() != "https" {
            return false;
        }
        path_matches(&self.path, url.path())
    }

    fn same_slot(&self, other: &StoredCookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }
}

fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

/// Cookie store shared by the HTTP client and persisted between runs.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: RwLock<Vec<StoredCookie>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cookies(cookies: Vec<StoredCookie>) -> Self {
        Self {
            cookies: RwLock::new(cookies),
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unexpired cookies, in insertion order.
    pub fn snapshot(&self) -> Vec<StoredCookie> {
        let now = unix_now();
        self.read()
            .iter()
            .filter(|c| !c.is_expired(now))
            .cloned()
            .collect()
    }

    pub fn insert(&self, cookie: StoredCookie) {
        let mut cookies = self.write();
        cookies.retain(|c| !c.same_slot(&cookie));
        if !cookie.is_expired(unix_now()) {
            cookies.push(cookie);
        }
    }

    /// Parses one `Set-Cookie` header value received from `url`.
    pub fn store_response_cookie(&self, raw: &str, url: &Url) {
        let parsed = match Cookie::parse(raw) {
            Ok(c) => c,
            Err(e) => {
                debug!("ignoring unparsable cookie from {url}: {e}");
                return;
            }
        };
        let Some(host) = url.host_str() else {
            return;
        };
        let host = host.to_ascii_lowercase();

        let (domain, host_only) = match parsed.domain() {
            Some(d) => {
                let d = d.trim_start_matches('.').to_ascii_lowercase();
                if host != d && !host.ends_with(&format!(".{d}")) {
                    debug!("rejecting cookie {} for foreign domain {d}", parsed.name());
                    return;
                }
                (d, false)
            }
            None => (host, true),
        };

        let path = match parsed.path() {
            Some(p) if p.starts_with('/') => p.to_string(),
            _ => default_path(url),
        };

        let expires_at = if let Some(max_age) = parsed.max_age() {
            Some(unix_now().saturating_add(max_age.whole_seconds()))
        } else {
            parsed.expires_datetime().map(|t| t.unix_timestamp())
        };

        self.insert(StoredCookie {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            domain,
            path,
            host_only,
            secure: parsed.secure().unwrap_or(false),
            expires_at,
        });
    }

    pub fn value_for(&self, url: &Url, name: &str) -> Option<String> {
        let now = unix_now();
        self.read()
            .iter()
            .filter(|c| c.name == name && !c.is_expired(now) && c.matches(url))
            .max_by_key(|c| c.path.len())
            .map(|c| c.value.clone())
    }

    pub fn header_for(&self, url: &Url) -> Option<String> {
        let now = unix_now();
        let cookies = self.read();
        let mut matching: Vec<&StoredCookie> = cookies
            .iter()
            .filter(|c| !c.is_expired(now) && c.matches(url))
            .collect();
        if matching.is_empty() {
            return None;
        }
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        Some(
            matching
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<StoredCookie>> {
        self.cookies.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<StoredCookie>> {
        self.cookies.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl reqwest::cookie::CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        for header in cookie_headers {
            if let Ok(raw) = header.to_str() {
                self.store_response_cookie(raw, url);
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.header_for(url)
            .and_then(|h| HeaderValue::from_str(&h).ok())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    saved_at: String,
    cookies: Vec<StoredCookie>,
}

/// Reads and writes the cookie jar at a fixed path.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: a missing or unreadable file starts a fresh session.
    pub fn load(&self) -> CookieJar {
        if !self.path.exists() {
            info!("no saved session at {}; starting fresh", self.path.display());
            return CookieJar::new();
        }
        match self.read_file() {
            Ok(cookies) => {
                info!(
                    "loaded {} cookies from {}",
                    cookies.len(),
                    self.path.display()
                );
                CookieJar::from_cookies(cookies)
            }
            Err(err) => {
                warn!("could not load saved session, starting fresh: {:#}", err);
                CookieJar::new()
            }
        }
    }

    pub fn save(&self, jar: &CookieJar) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_dir(parent)?;
            }
        }
        let file = SessionFile {
            saved_at: crate::util::now_rfc3339(),
            cookies: jar.snapshot(),
        };
        let raw = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("writing session: {}", self.path.display()))?;
        debug!(
            "saved {} cookies to {}",
            file.cookies.len(),
            self.path.display()
        );
        Ok(())
    }

    fn read_file(&self) -> Result<Vec<StoredCookie>> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading session: {}", self.path.display()))?;
        let file: SessionFile = serde_json::from_str(&raw).with_context(|| "parsing session JSON")?;
        Ok(file.cookies)
    }
}
