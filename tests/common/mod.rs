#![allow(dead_code)]

use anyhow::{anyhow, Result};
use daily_checkin::{
    config::Credentials,
    http::{Response, Transport},
    provider::{IdentityProvider, ProviderError},
};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone)]
pub struct Call {
    pub method: &'static str,
    pub url: String,
    pub params: Vec<(String, String)>,
}

/// Answers each URL from a queue of canned responses and records every call.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: RefCell<HashMap<String, VecDeque<Response>>>,
    calls: RefCell<Vec<Call>>,
    cookies: HashMap<String, String>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    pub fn on(&self, url: &str, resp: Response) -> &Self {
        self.routes
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back(resp);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.url == url).count()
    }

    fn answer(&self, method: &'static str, url: &str, params: &[(String, String)]) -> Result<Response> {
        self.calls.borrow_mut().push(Call {
            method,
            url: url.to_string(),
            params: params.to_vec(),
        });
        self.routes
            .borrow_mut()
            .get_mut(url)
            .and_then(|q| q.pop_front())
            .ok_or_else(|| anyhow!("connection refused: no scripted response for {method} {url}"))
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<Response> {
        self.answer("GET", url, query)
    }

    fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<Response> {
        self.answer("POST", url, form)
    }

    fn cookie(&self, _url: &str, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }
}

pub fn page(url: &str, body: &str) -> Response {
    Response {
        url: url.to_string(),
        redirected: false,
        status: 200,
        reason: "OK".into(),
        body: body.to_string(),
    }
}

pub fn redirected(url: &str, body: &str) -> Response {
    Response {
        redirected: true,
        ..page(url, body)
    }
}

pub fn http_status(url: &str, status: u16, reason: &str) -> Response {
    Response {
        status,
        reason: reason.to_string(),
        ..page(url, "")
    }
}

pub struct FixedProvider {
    pub token: Option<String>,
}

impl FixedProvider {
    pub fn accepting(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
        }
    }

    pub fn rejecting() -> Self {
        Self { token: None }
    }
}

impl IdentityProvider for FixedProvider {
    fn login(
        &self,
        _credentials: &Credentials,
        _session: &dyn Transport,
    ) -> Result<String, ProviderError> {
        self.token
            .clone()
            .ok_or_else(|| ProviderError::Rejected("wrong password".into()))
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        account: "10001".into(),
        password: "hunter2".into(),
    }
}

pub const CONSENT_URL: &str = "https://graph.qq.com/oauth/show?which=Login&display=pc&response_type=code&client_id=100273020&redirect_uri=https%3A%2F%2Fplogin.m.jd.com%2Fcgi-bin%2Fm%2Fqqcallback%3Fsid%3Dabc&state=sp6r8u0z";
pub const LOGIN_PAGE: &str = "https://plogin.m.jd.com/login/login?appid=100";
