use crate::error::SchemaDrift;
use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

/// Where a variant's status page keeps its flags.
#[derive(Debug, Clone)]
pub struct ExtractorSpec {
    pub signed_pattern: String,
    pub days_pattern: String,
    /// Captured text that means "signed today".
    pub signed_value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignStatus {
    pub signed_today: bool,
    pub consecutive_days: u32,
}

pub struct StatusExtractor {
    signed: Regex,
    days: Regex,
    signed_value: String,
}

impl StatusExtractor {
    pub fn new(spec: &ExtractorSpec) -> Result<Self> {
        let signed = Regex::new(&spec.signed_pattern)
            .with_context(|| format!("invalid signed pattern: {}", spec.signed_pattern))?;
        let days = Regex::new(&spec.days_pattern)
            .with_context(|| format!("invalid days pattern: {}", spec.days_pattern))?;
        Ok(Self {
            signed,
            days,
            signed_value: spec.signed_value.clone(),
        })
    }

    pub fn extract(&self, url: &str, body: &str) -> Result<SignStatus, SchemaDrift> {
        let flag = find_value(&self.signed, body).ok_or_else(|| drift(url, &self.signed))?;
        let days = find_value(&self.days, body)
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or_else(|| drift(url, &self.days))?;
        Ok(SignStatus {
            signed_today: flag == self.signed_value,
            consecutive_days: days,
        })
    }
}

fn drift(url: &str, re: &Regex) -> SchemaDrift {
    SchemaDrift {
        url: url.to_string(),
        pattern: re.as_str().to_string(),
    }
}

/// First capture group of the first match.
pub fn find_value<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}
