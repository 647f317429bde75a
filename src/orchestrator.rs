use crate::{
    config::{Config, Credentials},
    error::{JobError, SchemaDrift},
    extract::{SignStatus, StatusExtractor},
    http::{Response, Transport},
    jobs::{JobConfig, SignMethod},
    provider::IdentityProvider,
    util::{host_in_domain, query_params, unix_now},
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use url::Url;

/// Site-wide knobs shared by every variant.
#[derive(Debug, Clone)]
pub struct Settings {
    pub local_domain: String,
    pub login_marker: String,
    pub authorize_url: String,
    pub quota_exceeded_code: String,
    pub max_claim_retries: u32,
}

impl Settings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            local_domain: cfg.site.local_domain.clone(),
            login_marker: cfg.site.login_marker.clone(),
            authorize_url: cfg.site.authorize_url.clone(),
            quota_exceeded_code: cfg.site.quota_exceeded_code.clone(),
            max_claim_retries: cfg.global.max_claim_retries,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Borrowed collaborators every job of a run uses.
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    pub session: &'a dyn Transport,
    pub provider: &'a dyn IdentityProvider,
    pub credentials: &'a Credentials,
    pub settings: &'a Settings,
}

/// Parameters carried from the provider's consent page into the authorize call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub client_id: String,
    pub redirect_uri: String,
    /// Some login variants omit it; empty is accepted.
    pub state: String,
    pub provider_token: String,
}

impl AuthContext {
    pub fn from_consent_url(url: &str) -> Result<Self, JobError> {
        let params = query_params(url);
        let required = |name: &str| -> Result<String, JobError> {
            params
                .get(name)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| {
                    JobError::LoginHandshake(format!("redirect to {url} is missing `{name}`"))
                })
        };
        Ok(Self {
            client_id: required("client_id")?,
            redirect_uri: required("redirect_uri")?,
            state: params.get("state").cloned().unwrap_or_default(),
            provider_token: String::new(),
        })
    }

    pub fn authorize_form(&self, auth_time: i64) -> Vec<(String, String)> {
        vec![
            ("response_type".into(), "code".into()),
            ("client_id".into(), self.client_id.clone()),
            ("redirect_uri".into(), self.redirect_uri.clone()),
            ("state".into(), self.state.clone()),
            ("src".into(), "1".into()),
            ("g_tk".into(), self.provider_token.clone()),
            ("auth_time".into(), auth_time.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCheck {
    Known(SignStatus),
    /// Page changed shape; treated as not signed so the check-in is still tried.
    Drifted(SchemaDrift),
    Unavailable { status: u16, reason: String },
}

impl StatusCheck {
    pub fn is_signed(&self) -> bool {
        matches!(self, StatusCheck::Known(s) if s.signed_today)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutcome {
    Signed { message: String },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub success: bool,
    pub message: String,
}

/// Where a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    AlreadySigned,
    Signed,
    Failed(String),
}

#[derive(Debug, Deserialize)]
struct ActionReply {
    success: bool,
    #[serde(rename = "resultCode", default)]
    result_code: String,
    #[serde(rename = "resultMessage", default)]
    result_message: String,
}

/// One check-in job: login handshake, status check and the check-in itself.
pub struct SignInJob<'a> {
    job: &'a JobConfig,
    ctx: RunContext<'a>,
    extractor: StatusExtractor,
    success: bool,
}

impl<'a> SignInJob<'a> {
    pub fn new(job: &'a JobConfig, ctx: RunContext<'a>) -> Result<Self, JobError> {
        let extractor = StatusExtractor::new(&job.extractor)?;
        Ok(Self {
            job,
            ctx,
            extractor,
            success: false,
        })
    }

    pub fn label(&self) -> &str {
        &self.job.label
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn run(&mut self) -> Result<JobState, JobError> {
        info!("job start: {}", self.job.label);

        let logged_in = self.is_login()?;
        info!("logged_in={}", logged_in);
        if !logged_in {
            info!("session expired, logging in");
            self.login()?;
            info!("login succeeded");
        }

        let state = if self.is_signed()?.is_signed() {
            JobState::AlreadySigned
        } else {
            match self.sign()? {
                SignOutcome::Signed { .. } => JobState::Signed,
                SignOutcome::Failed { message } => JobState::Failed(message),
            }
        };

        if matches!(state, JobState::AlreadySigned | JobState::Signed) {
            self.success = true;
        }
        info!("job end: {} state={:?}", self.job.label, state);
        Ok(state)
    }

    pub fn is_login(&self) -> Result<bool, JobError> {
        let resp = self.ctx.session.get(&self.job.status_url, &[])?;
        Ok(!(resp.redirected && self.is_login_page(&resp.url)))
    }

    fn is_login_page(&self, url: &str) -> bool {
        let marker = self.ctx.settings.login_marker.as_str();
        match Url::parse(url) {
            Ok(u) => u.path().contains(marker),
            Err(_) => url.contains(marker),
        }
    }

    pub fn login(&self) -> Result<(), JobError> {
        let resp = self
            .ctx
            .session
            .get(&self.job.login_url, &self.job.login_params)?;
        debug!("login redirect chain ended at {}", resp.url);
        if !resp.is_ok() {
            return Err(JobError::Transport {
                url: resp.url,
                status: resp.status,
                reason: resp.reason,
            });
        }

        let mut auth = AuthContext::from_consent_url(&resp.url)?;
        if auth.state.is_empty() {
            debug!("consent page carried no state token");
        }

        auth.provider_token = self
            .ctx
            .provider
            .login(self.ctx.credentials, self.ctx.session)?;

        let form = auth.authorize_form(unix_now());
        let resp = self
            .ctx
            .session
            .post_form(&self.ctx.settings.authorize_url, &form)?;

        let landed_home = resp
            .host()
            .is_some_and(|h| host_in_domain(&h, &self.ctx.settings.local_domain));
        if !landed_home {
            error!("authorize did not return to {}", self.ctx.settings.local_domain);
            error!("last page url: {}", resp.url);
            error!("last page content:\n{}", resp.body);
            return Err(JobError::LoginHandshake(format!(
                "authorize ended off-site at {}",
                resp.url
            )));
        }
        Ok(())
    }

    pub fn is_signed(&self) -> Result<StatusCheck, JobError> {
        let url = &self.job.index_url;
        let resp = self.ctx.session.get(url, &[])?;
        if !resp.is_ok() {
            warn!(
                "status page {} answered {} {}",
                url, resp.status, resp.reason
            );
            return Ok(StatusCheck::Unavailable {
                status: resp.status,
                reason: resp.reason,
            });
        }

        match self.extractor.extract(url, &resp.body) {
            Ok(status) => {
                info!(
                    "signed_today={} consecutive_days={}",
                    status.signed_today, status.consecutive_days
                );
                Ok(StatusCheck::Known(status))
            }
            Err(drift) => {
                warn!("status page format may have changed: {}", drift);
                Ok(StatusCheck::Drifted(drift))
            }
        }
    }

    pub fn sign(&self) -> Result<SignOutcome, JobError> {
        let mut claims = 0u32;
        loop {
            let resp = self.send_sign()?;
            if !resp.is_ok() {
                warn!(
                    "check-in failed: status={} reason={}",
                    resp.status, resp.reason
                );
                return Ok(SignOutcome::Failed {
                    message: format!("HTTP {} {}", resp.status, resp.reason),
                });
            }

            let reply: ActionReply = resp.json().map_err(|e| {
                warn!(
                    "check-in reply unreadable: status={} reason={} error={}",
                    resp.status, resp.reason, e
                );
                JobError::Malformed {
                    url: resp.url.clone(),
                    status: resp.status,
                    message: e.to_string(),
                }
            })?;

            if reply.success {
                info!("check-in succeeded: {}", reply.result_message);
                return Ok(SignOutcome::Signed {
                    message: reply.result_message,
                });
            }

            if reply.result_code != self.ctx.settings.quota_exceeded_code {
                warn!(
                    "check-in refused: code={} message={}",
                    reply.result_code, reply.result_message
                );
                return Ok(SignOutcome::Failed {
                    message: reply.result_message,
                });
            }

            if claims >= self.ctx.settings.max_claim_retries {
                warn!(
                    "check-in still over quota after {} claim(s): {}",
                    claims, reply.result_message
                );
                return Ok(SignOutcome::Failed {
                    message: reply.result_message,
                });
            }

            info!("check-in quota reached, claiming the prerequisite reward");
            claims += 1;
            let claim = self.pick_gb()?;
            if !claim.success {
                return Ok(SignOutcome::Failed {
                    message: format!("prerequisite claim not completed: {}", claim.message),
                });
            }
        }
    }

    fn send_sign(&self) -> Result<Response, JobError> {
        let url = &self.job.sign_url;
        let resp = match self.job.sign_method {
            SignMethod::Get => self.ctx.session.get(url, &[])?,
            SignMethod::Post => self.ctx.session.post_form(url, &[])?,
        };
        Ok(resp)
    }

    /// Claims the reward task that lifts the check-in quota.
    pub fn pick_gb(&self) -> Result<ClaimOutcome, JobError> {
        let resp = self
            .ctx
            .session
            .get(&self.job.claim_url, &self.job.claim_query())?;

        match resp.json::<ActionReply>() {
            Ok(reply) => {
                info!(
                    "claim success={} message={}",
                    reply.success, reply.result_message
                );
                Ok(ClaimOutcome {
                    success: reply.success,
                    message: reply.result_message,
                })
            }
            Err(e) => {
                error!(
                    "claim response from {} unreadable (status={}): {}",
                    resp.url, resp.status, e
                );
                Ok(ClaimOutcome {
                    success: false,
                    message: format!("unreadable claim response: {e}"),
                })
            }
        }
    }
}
