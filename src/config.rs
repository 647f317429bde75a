use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub account: Account,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub site: Site,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// Decodes the obfuscated account fields. Failing here is fatal for the run.
    pub fn credentials(&self) -> Result<Credentials> {
        let account = decode_field("account.account", &self.account.account)?;
        let password = decode_field("account.password", &self.account.password)?;
        Ok(Credentials { account, password })
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub account: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Reversible text encoding for credentials kept in the config file.
/// This only keeps them from being readable at a glance.
pub fn obfuscate(plain: &str) -> String {
    STANDARD.encode(plain.as_bytes())
}

pub fn deobfuscate(encoded: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| anyhow!("invalid encoding: {e}"))?;
    String::from_utf8(bytes).map_err(|e| anyhow!("decoded value is not UTF-8: {e}"))
}

fn decode_field(name: &str, encoded: &str) -> Result<String> {
    if encoded.trim().is_empty() {
        return Err(anyhow!("missing {name} in config"));
    }
    let value = deobfuscate(encoded).with_context(|| format!("decoding {name}"))?;
    if value.is_empty() {
        return Err(anyhow!("{name} decodes to an empty value"));
    }
    Ok(value)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub debug: bool,
    pub jobs: Vec<String>,
    pub max_claim_retries: u32,
    pub print_summary: bool,
    pub summary_json: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            debug: false,
            jobs: vec!["web".into(), "app".into()],
            max_claim_retries: 1,
            print_summary: true,
            summary_json: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    pub account: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub session_file: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            session_file: "data/cookies.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Http {
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub user_agent: String,
}
impl Default for Http {
    fn default() -> Self {
        Self {
            timeout_seconds: 20,
            connect_timeout_seconds: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; WOW64; rv:50.0) Gecko/20100101 Firefox/50.0"
                .into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Site {
    pub local_domain: String,
    pub login_marker: String,
    pub authorize_url: String,
    pub quota_exceeded_code: String,
}
impl Default for Site {
    fn default() -> Self {
        Self {
            local_domain: "jd.com".into(),
            login_marker: "/login".into(),
            authorize_url: "https://graph.qq.com/oauth2.0/authorize".into(),
            quota_exceeded_code: "0003".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Provider {
    pub session_url: String,
    pub key_cookies: Vec<String>,
    pub skey: String,
}
impl Default for Provider {
    fn default() -> Self {
        Self {
            session_url: "https://graph.qq.com/".into(),
            key_cookies: vec!["p_skey".into(), "skey".into()],
            skey: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obfuscation_is_reversible() {
        let encoded = obfuscate("123456789");
        assert_ne!(encoded, "123456789");
        assert_eq!(deobfuscate(&encoded).unwrap(), "123456789");
    }

    #[test]
    fn empty_account_is_rejected() {
        let cfg = Config::default();
        assert!(cfg.credentials().is_err());
    }

    #[test]
    fn debug_output_hides_password() {
        let creds = Credentials {
            account: "10001".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("10001"));
        assert!(!rendered.contains("hunter2"));
    }
}
