use crate::extract::ExtractorSpec;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Web,
    App,
}

impl JobKind {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "web" => Ok(JobKind::Web),
            "app" => Ok(JobKind::App),
            other => Err(anyhow!("unknown job variant: {other}")),
        }
    }

    pub fn config(self) -> JobConfig {
        match self {
            JobKind::Web => web(),
            JobKind::App => app(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignMethod {
    Get,
    Post,
}

/// Everything that differs between variants. Built once at startup.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub kind: JobKind,
    pub label: String,
    /// Page carrying the signed-today and day-count flags.
    pub index_url: String,
    pub login_url: String,
    pub sign_url: String,
    pub sign_method: SignMethod,
    /// Probed to tell whether the session is still logged in.
    pub status_url: String,
    pub claim_url: String,
    pub claim_task_id: u32,
    pub login_params: Vec<(String, String)>,
    pub extractor: ExtractorSpec,
}

impl JobConfig {
    pub fn claim_query(&self) -> Vec<(String, String)> {
        vec![("pcId".to_string(), self.claim_task_id.to_string())]
    }
}

const LOGIN_URL: &str = "https://plogin.m.jd.com/cgi-bin/m/qqlogin";
const CLAIM_URL: &str = "https://bk.jd.com/m/money/home/recDoJobMoney.html";
const CLAIM_TASK_ID: u32 = 82;

fn login_params(return_url: &str) -> Vec<(String, String)> {
    vec![
        ("appid".to_string(), "100".to_string()),
        ("returnurl".to_string(), return_url.to_string()),
    ]
}

pub fn web() -> JobConfig {
    let status_url = "https://bk.jd.com/m/money/home/getUserInfo.html";
    JobConfig {
        kind: JobKind::Web,
        label: "web coin check-in".into(),
        index_url: "https://bk.jd.com/m/money/index.html".into(),
        login_url: LOGIN_URL.into(),
        sign_url: "https://bk.jd.com/m/money/home/daka.html".into(),
        sign_method: SignMethod::Get,
        status_url: status_url.into(),
        claim_url: CLAIM_URL.into(),
        claim_task_id: CLAIM_TASK_ID,
        login_params: login_params(status_url),
        extractor: ExtractorSpec {
            signed_pattern: r"dakaed:\s*(\w+)".into(),
            days_pattern: r"dakaNum:\s*(\d+)".into(),
            signed_value: "true".into(),
        },
    }
}

pub fn app() -> JobConfig {
    let status_url = "https://bk.jd.com/m/jdapp/daka/dakDetail.html";
    JobConfig {
        kind: JobKind::App,
        label: "app coin check-in".into(),
        index_url: "https://bk.jd.com/m/jdapp/daka/index.html".into(),
        login_url: LOGIN_URL.into(),
        sign_url: "https://bk.jd.com/m/jdapp/daka/daka.html?dakaActType=JD_APP_V6".into(),
        sign_method: SignMethod::Get,
        status_url: status_url.into(),
        claim_url: CLAIM_URL.into(),
        claim_task_id: CLAIM_TASK_ID,
        login_params: login_params(status_url),
        extractor: ExtractorSpec {
            signed_pattern: r"dakaed:\s*(\w+)".into(),
            days_pattern: r"dakaNumber:\s*(\d+)".into(),
            signed_value: "true".into(),
        },
    }
}

/// Resolves configured variant names, keeping their order.
pub fn from_names(names: &[String]) -> Result<Vec<JobConfig>> {
    names
        .iter()
        .map(|n| JobKind::parse(n).map(JobKind::config))
        .collect()
}
