use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use url::Url;

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

pub fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

/// First value of every query parameter in `raw`. Unparsable URLs yield nothing.
pub fn query_params(raw: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    if let Ok(url) = Url::parse(raw) {
        for (k, v) in url.query_pairs() {
            out.entry(k.into_owned()).or_insert_with(|| v.into_owned());
        }
    }
    out
}

pub fn host_in_domain(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let domain = domain.trim_start_matches('.').to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}
