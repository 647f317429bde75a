use crate::{config::Config, cookies::CookieJar};
use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// The HTTP surface the sign-in jobs need. Implemented by [`HttpSession`]
/// for real runs and by scripted fakes in tests.
pub trait Transport {
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<Response>;
    fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<Response>;
    /// Value of a cookie the session would send to `url`.
    fn cookie(&self, url: &str, name: &str) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct Response {
    /// URL after all redirects were followed.
    pub url: String,
    pub redirected: bool,
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl Response {
    pub fn is_ok(&self) -> bool {
        self.status < 400
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }

    pub fn host(&self) -> Option<String> {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
    }
}

/// Blocking client sharing one cookie jar across every job of a run.
pub struct HttpSession {
    client: Client,
    jar: Arc<CookieJar>,
}

impl HttpSession {
    pub fn new(cfg: &Config, jar: Arc<CookieJar>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&cfg.http.user_agent).with_context(|| "http.user_agent")?,
        );

        let mut builder = Client::builder()
            .default_headers(headers)
            .cookie_provider(Arc::clone(&jar))
            .connect_timeout(Duration::from_secs(cfg.http.connect_timeout_seconds.max(1)));
        if cfg.http.timeout_seconds > 0 {
            builder = builder.timeout(Duration::from_secs(cfg.http.timeout_seconds));
        }
        if cfg.global.debug {
            // Lets an intercepting proxy sit in front of the site while debugging.
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().with_context(|| "building HTTP client")?;
        Ok(Self { client, jar })
    }

    pub fn jar(&self) -> &Arc<CookieJar> {
        &self.jar
    }

    fn send(&self, url: &str, req: RequestBuilder) -> Result<Response> {
        let resp = req.send().with_context(|| format!("request to {url}"))?;
        let final_url = resp.url().to_string();
        let status = resp.status();
        let body = resp
            .text()
            .with_context(|| format!("reading body from {final_url}"))?;
        let redirected = !same_location(url, &final_url);
        debug!("http {} -> {} status={}", url, final_url, status.as_u16());
        Ok(Response {
            url: final_url,
            redirected,
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            body,
        })
    }
}

impl Transport for HttpSession {
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<Response> {
        let mut req = self.client.get(url);
        if !query.is_empty() {
            req = req.query(query);
        }
        self.send(url, req)
    }

    fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<Response> {
        self.send(url, self.client.post(url).form(form))
    }

    fn cookie(&self, url: &str, name: &str) -> Option<String> {
        let url = Url::parse(url).ok()?;
        self.jar.value_for(&url, name)
    }
}

fn same_location(requested: &str, final_url: &str) -> bool {
    match (Url::parse(requested), Url::parse(final_url)) {
        (Ok(a), Ok(b)) => a.host_str() == b.host_str() && a.path() == b.path(),
        _ => requested == final_url,
    }
}
