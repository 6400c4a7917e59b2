use std::env;
use std::path::PathBuf;
use std::time::Duration;

use dotenv::dotenv;

use crate::error::{FeedError, Result};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_CACHE_DIR: &str = ".mbiufun-cache";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_token: Option<String>,
    pub page_size: u32,
    pub cache_dir: PathBuf,
    pub activity: Option<i64>,
    pub request_timeout: Duration,
}

impl Config {
    pub fn new(api_url: impl Into<String>) -> Self {
        Config {
            api_url: api_url.into(),
            api_token: None,
            page_size: DEFAULT_PAGE_SIZE,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            activity: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Loads a local `.env` file if there is one, then reads the `MBIUFUN_*` variables.
    pub fn load_env_config() -> Result<Self> {
        // A missing .env is fine, the variables may come from the environment.
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = lookup("MBIUFUN_API_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| FeedError::config("MBIUFUN_API_URL is not set"))?;

        let mut config = Config::new(api_url.trim_end_matches('/'));
        config.api_token = lookup("MBIUFUN_API_TOKEN").filter(|t| !t.is_empty());

        if let Some(size) = lookup("MBIUFUN_PAGE_SIZE") {
            config.page_size = match size.parse::<u32>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(FeedError::config(format!(
                        "MBIUFUN_PAGE_SIZE must be a positive integer, got {size:?}"
                    )))
                }
            };
        }
        if let Some(dir) = lookup("MBIUFUN_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Some(activity) = lookup("MBIUFUN_ACTIVITY_ID") {
            config.activity = Some(activity.parse().map_err(|_| {
                FeedError::config(format!("MBIUFUN_ACTIVITY_ID is not an id: {activity:?}"))
            })?);
        }
        if let Some(secs) = lookup("MBIUFUN_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(FeedError::config(format!(
                        "MBIUFUN_REQUEST_TIMEOUT_SECS must be a positive integer, got {secs:?}"
                    )))
                }
            };
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        let config = Config::from_lookup(lookup(&[("MBIUFUN_API_URL", "http://api.test/")])).unwrap();
        assert_eq!(config.api_url, "http://api.test");
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.cache_dir, PathBuf::from(DEFAULT_CACHE_DIR));
        assert_eq!(config.activity, None);
        assert_eq!(config.api_token, None);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn missing_url_is_a_config_error() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, FeedError::Config(_)));
    }

    #[test]
    fn rejects_zero_page_size() {
        let err = Config::from_lookup(lookup(&[
            ("MBIUFUN_API_URL", "http://api.test"),
            ("MBIUFUN_PAGE_SIZE", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, FeedError::Config(_)));
    }

    #[test]
    fn rejects_zero_request_timeout() {
        let err = Config::from_lookup(lookup(&[
            ("MBIUFUN_API_URL", "http://api.test"),
            ("MBIUFUN_REQUEST_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, FeedError::Config(_)));
    }

    #[test]
    fn reads_optional_values() {
        let config = Config::from_lookup(lookup(&[
            ("MBIUFUN_API_URL", "http://api.test"),
            ("MBIUFUN_API_TOKEN", "secret"),
            ("MBIUFUN_PAGE_SIZE", "5"),
            ("MBIUFUN_CACHE_DIR", "/tmp/feed"),
            ("MBIUFUN_ACTIVITY_ID", "12"),
            ("MBIUFUN_REQUEST_TIMEOUT_SECS", "4"),
        ]))
        .unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(4));
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.page_size, 5);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/feed"));
        assert_eq!(config.activity, Some(12));
    }
}
