use std::{env, time::Duration};

use crate::error::ConfigError;

pub const DEFAULT_ENDPOINT: &str = "https://ra.co/graphql";
pub const DEFAULT_REFERER: &str = "https://ra.co/events/";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:106.0) Gecko/20100101 Firefox/106.0";

/// Pause between two consecutive pages.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// Where and how to reach the GraphQL endpoint.  Built once and handed to the
/// [`PageFetcher`](super::fetcher::PageFetcher), never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub endpoint: String,
    pub referer: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl ApiConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Start from the defaults and override with `RA_GRAPHQL_URL`, `RA_REFERER`,
    /// `RA_USER_AGENT` and `RA_TIMEOUT_SECS` when they are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(endpoint) = env::var("RA_GRAPHQL_URL") {
            config.endpoint = endpoint;
        }
        if let Ok(referer) = env::var("RA_REFERER") {
            config.referer = referer;
        }
        if let Ok(user_agent) = env::var("RA_USER_AGENT") {
            config.user_agent = user_agent;
        }
        if let Some(timeout) = secs_from_env("RA_TIMEOUT_SECS")? {
            config.timeout = timeout;
        }
        Ok(config)
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Page delay from `RA_DELAY_SECS`, or [`DEFAULT_DELAY`].
pub fn delay_from_env() -> Result<Duration, ConfigError> {
    Ok(secs_from_env("RA_DELAY_SECS")?.unwrap_or(DEFAULT_DELAY))
}

fn secs_from_env(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    match env::var(name) {
        Ok(value) => parse_secs(name, &value).map(Some),
        Err(_) => Ok(None),
    }
}

/// Parse a number of seconds, fractions allowed, e.g. `2.5`.
pub fn parse_secs(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| *secs >= 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| ConfigError::InvalidSetting {
            name,
            value: value.to_string(),
        })
}
