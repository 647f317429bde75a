use crate::{config::Credentials, http::Transport};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no provider session for account {account}")]
    NoSession { account: String },
    /// Returned by providers that run the password handshake themselves.
    #[error("credentials rejected: {0}")]
    Rejected(String),
}

/// The identity provider's own login. Yields the session-scoped token the
/// authorize step expects.
pub trait IdentityProvider {
    fn login(
        &self,
        credentials: &Credentials,
        session: &dyn Transport,
    ) -> Result<String, ProviderError>;
}

/// Reuses a provider session already present in the shared cookie jar (or a
/// configured seed key) and derives the provider's anti-forgery token from it.
///
/// It never runs the password handshake, so the password is not read and a
/// missing session key is reported as [`ProviderError::NoSession`].
pub struct SessionKeyProvider {
    session_url: String,
    key_cookies: Vec<String>,
    seed_key: Option<String>,
}

impl SessionKeyProvider {
    pub fn new(cfg: &crate::config::Config) -> Self {
        let seed = cfg.provider.skey.trim();
        Self {
            session_url: cfg.provider.session_url.clone(),
            key_cookies: cfg.provider.key_cookies.clone(),
            seed_key: (!seed.is_empty()).then(|| seed.to_string()),
        }
    }

    fn session_key(&self, session: &dyn Transport) -> Option<String> {
        self.key_cookies
            .iter()
            .find_map(|name| {
                session
                    .cookie(&self.session_url, name)
                    .filter(|v| !v.is_empty())
            })
            .or_else(|| self.seed_key.clone())
    }
}

impl IdentityProvider for SessionKeyProvider {
    fn login(
        &self,
        credentials: &Credentials,
        session: &dyn Transport,
    ) -> Result<String, ProviderError> {
        let key = self
            .session_key(session)
            .ok_or_else(|| ProviderError::NoSession {
                account: credentials.account.clone(),
            })?;
        let token = g_tk(&key);
        debug!("provider token derived for account {}", credentials.account);
        Ok(token.to_string())
    }
}

/// Token the provider's authorize endpoint checks against the session key.
pub fn g_tk(key: &str) -> u32 {
    let mut hash: u64 = 5381;
    for c in key.chars() {
        hash = hash.wrapping_add((hash << 5).wrapping_add(c as u64));
    }
    (hash & 0x7fff_ffff) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn g_tk_of_empty_key_is_seed() {
        assert_eq!(g_tk(""), 5381);
    }

    #[test]
    fn g_tk_single_char() {
        // 5381 + (5381 << 5) + 'a'
        assert_eq!(g_tk("a"), 5381 + 5381 * 32 + 97);
    }

    #[test]
    fn g_tk_stays_in_31_bits() {
        assert!(g_tk("@AbCdEfGhIjKlMnOpQrStUvWxYz0123456789") <= 0x7fff_ffff);
    }
}
