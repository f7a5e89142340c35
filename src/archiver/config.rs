use crate::archiver::job::DEFAULT_MAX_CONCURRENCY;
use crate::error::ArchiverError;
use anyhow::Result;
use std::env;
use std::ffi::OsString;
use std::time::Duration;

const ENV_PREFIX: &str = "LDPA_";
/// Every prefixed variable the archiver reads, including the logging and
/// `.env` lookups done outside this module.
const RECOGNISED_ENV: &[&str] = &[
    "LDPA_BASEURL",
    "LDPA_TOKEN",
    "LDPA_TAGS",
    "LDPA_BUNDLE_ID",
    "LDPA_SCAN_INTERVAL",
    "LDPA_MAX_CONCURRENCY",
    "LDPA_LOG_FORMAT",
    "LDPA_LOG_LEVEL",
    "LDPA_HOME",
];
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiverConfig {
    pub base_url: String,
    pub token: String,
    pub tags: Vec<String>,
    pub bundle_id: u64,
    pub scan_interval_secs: u64,
    pub max_concurrency: usize,
}

impl ArchiverConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}

/// Positive integers pass through; zero, negatives, junk and absence fall back.
fn positive_or(raw: Option<&str>, fallback: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map(|v| v as u64)
        .unwrap_or(fallback)
}

fn required(raw: Option<String>, var: &'static str) -> Result<String, ArchiverError> {
    match raw {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ArchiverError::MissingCredential(var)),
    }
}

pub fn parse_tags(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split_whitespace()
        .map(ToOwned::to_owned)
        .collect()
}

pub fn config_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<ArchiverConfig> {
    let base_url = required(lookup("LDPA_BASEURL"), "LDPA_BASEURL")?;
    let token = required(lookup("LDPA_TOKEN"), "LDPA_TOKEN")?;

    Ok(ArchiverConfig {
        base_url,
        token,
        tags: parse_tags(lookup("LDPA_TAGS").as_deref()),
        bundle_id: positive_or(lookup("LDPA_BUNDLE_ID").as_deref(), 0),
        scan_interval_secs: positive_or(
            lookup("LDPA_SCAN_INTERVAL").as_deref(),
            DEFAULT_SCAN_INTERVAL_SECS,
        ),
        max_concurrency: positive_or(
            lookup("LDPA_MAX_CONCURRENCY").as_deref(),
            DEFAULT_MAX_CONCURRENCY as u64,
        ) as usize,
    })
}

pub fn load_config() -> Result<ArchiverConfig> {
    config_from_lookup(|var| env::var(var).ok())
}

/// Prefixed variable names the archiver does not read, usually typos.
/// Keys that are not valid UTF-8 are ignored.
pub fn unknown_env_keys(present: impl IntoIterator<Item = OsString>) -> Vec<String> {
    let mut out = present
        .into_iter()
        .filter_map(|key| key.into_string().ok())
        .filter(|key| key.starts_with(ENV_PREFIX))
        .filter(|key| !RECOGNISED_ENV.contains(&key.as_str()))
        .collect::<Vec<_>>();
    out.sort();
    out
}
