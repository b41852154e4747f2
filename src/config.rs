//! Application configuration, read from the environment (and `.env`).

use figment::Figment;
use figment::providers::Env;
use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the platform API, without a trailing `/api`.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// JSON file backing the durable store. Unset keeps everything in memory.
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
    /// Oldest cached response served without refetching, e.g. `1h` or `90m`.
    #[serde(
        default = "default_cache_max_age",
        deserialize_with = "deserialize_duration"
    )]
    pub cache_max_age: Duration,
    /// Cache entries kept when the store runs out of space.
    #[serde(default = "default_cache_retention")]
    pub cache_retention: usize,
    #[serde(default = "default_cache_quota_bytes")]
    pub cache_quota_bytes: usize,
    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub request_timeout: Duration,
}

impl Config {
    /// Extract from process environment variables (`API_BASE_URL`, `CACHE_MAX_AGE`, ...).
    pub fn from_env() -> Result<Self, figment::Error> {
        Self::from_figment(Figment::new().merge(Env::raw()))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, figment::Error> {
        figment.extract()
    }
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_cache_max_age() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_cache_retention() -> usize {
    10
}

/// Roughly what browsers grant a single origin's local storage.
fn default_cache_quota_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Parse a human duration such as `30s`, `15m` or `1h`; bare numbers are seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let parser = DurationParser::with_time_units(&[
        TimeUnit::MilliSecond,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
    ]);
    let parsed = parser
        .parse(input.trim())
        .map_err(|e| format!("invalid duration '{input}': {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration '{input}': {e}"))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DurationInput {
    Seconds(u64),
    Text(String),
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match DurationInput::deserialize(deserializer)? {
        DurationInput::Seconds(secs) => Ok(Duration::from_secs(secs)),
        DurationInput::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}
