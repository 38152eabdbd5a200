use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration
/// Provides defaults with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub port: u16,
    pub judge0_url: String,
    pub judge0_api_key: Option<String>,
    pub judge0_host: String,
    pub judge0_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            redis_url: lookup("REDIS_URL")
                .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            port: parse_var(lookup("PORT")).unwrap_or(3000),
            judge0_url: lookup("JUDGE0_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "https://judge0-ce.p.rapidapi.com".to_string()),
            judge0_api_key: lookup("JUDGE0_API_KEY").filter(|k| !k.is_empty()),
            judge0_host: lookup("JUDGE0_HOST")
                .unwrap_or_else(|| "judge0-ce.p.rapidapi.com".to_string()),
            judge0_timeout_ms: parse_var(lookup("JUDGE0_TIMEOUT_MS")).unwrap_or(10_000),
            poll_interval_ms: parse_var(lookup("POLL_INTERVAL_MS")).unwrap_or(1000),
            poll_max_attempts: parse_var(lookup("POLL_MAX_ATTEMPTS")).unwrap_or(60),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn judge0_timeout(&self) -> Duration {
        Duration::from_millis(self.judge0_timeout_ms)
    }
}

fn parse_var<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
