//! Sync configuration
//!
//! Values come from, in increasing priority: defaults, a JSON file, and
//! `TETHER_*` environment variables. The environment is only read when
//! [`SyncConfig::from_env`] or [`SyncConfig::apply_env`] is called.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::error::{TetherError, TetherResult};
use crate::recovery::RetryConfig;
use crate::storage::CacheLayout;

pub const ENV_CACHE_DIR: &str = "TETHER_CACHE_DIR";
pub const ENV_POLL_INTERVAL_MS: &str = "TETHER_POLL_INTERVAL_MS";
pub const ENV_PAGE_SIZE: &str = "TETHER_PAGE_SIZE";
pub const ENV_CONCURRENCY: &str = "TETHER_CONCURRENCY";
pub const ENV_WARMUP_ATTEMPTS: &str = "TETHER_WARMUP_ATTEMPTS";

/// Settings for the local cache and the sync machinery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Cache root; `~/.tether/cache` when unset
    pub cache_dir: Option<PathBuf>,

    /// Sleep between live-mode activity polls
    #[serde(with = "humantime_serde")]
    pub polling_interval: Duration,

    /// Page size hint for activity listings
    pub page_size: u32,

    /// Worker count for batch session syncs
    pub concurrency: usize,

    /// Retry schedule while a new session is not visible yet
    pub warmup_retry: RetryConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            polling_interval: Duration::from_secs(5),
            page_size: 50,
            concurrency: 3,
            warmup_retry: RetryConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> TetherResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load a JSON config file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> TetherResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TetherError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| {
            TetherError::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        debug!("Loaded sync config from {}", path.display());
        Ok(config)
    }

    /// Override fields from `TETHER_*` environment variables
    pub fn apply_env(&mut self) -> TetherResult<()> {
        self.apply_env_from(|key| env::var(key).ok())
    }

    /// Override fields from any key lookup (the environment, a map in tests)
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> TetherResult<()> {
        if let Some(dir) = lookup(ENV_CACHE_DIR).filter(|d| !d.is_empty()) {
            self.cache_dir = Some(PathBuf::from(dir));
        }

        if let Some(ms) = parse_var::<u64>(&lookup, ENV_POLL_INTERVAL_MS)? {
            self.polling_interval = Duration::from_millis(ms);
        }

        if let Some(size) = parse_var(&lookup, ENV_PAGE_SIZE)? {
            self.page_size = size;
        }

        if let Some(concurrency) = parse_var(&lookup, ENV_CONCURRENCY)? {
            self.concurrency = concurrency;
        }

        if let Some(attempts) = parse_var(&lookup, ENV_WARMUP_ATTEMPTS)? {
            self.warmup_retry.max_attempts = attempts;
        }

        self.validate()
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_warmup_retry(mut self, retry: RetryConfig) -> Self {
        self.warmup_retry = retry;
        self
    }

    /// The configured cache root, or the default one
    pub fn cache_root(&self) -> TetherResult<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => CacheLayout::default_root(),
        }
    }

    pub fn layout(&self) -> TetherResult<CacheLayout> {
        Ok(CacheLayout::new(self.cache_root()?))
    }

    pub fn validate(&self) -> TetherResult<()> {
        if self.concurrency == 0 {
            return Err(TetherError::config("concurrency must be at least 1"));
        }
        if self.page_size == 0 {
            return Err(TetherError::config("page_size must be at least 1"));
        }
        if self.warmup_retry.max_attempts == 0 {
            return Err(TetherError::config(
                "warmup_retry.max_attempts must be at least 1",
            ));
        }
        let multiplier = self.warmup_retry.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(TetherError::config(format!(
                "warmup_retry.backoff_multiplier must be a finite number >= 1.0, got {}",
                multiplier
            )));
        }
        if self.warmup_retry.initial_delay > self.warmup_retry.max_delay {
            return Err(TetherError::config(
                "warmup_retry.initial_delay must not exceed warmup_retry.max_delay",
            ));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> TetherResult<Option<T>> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| TetherError::config(format!("Invalid {} value: {}", key, raw))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.polling_interval, Duration::from_secs(5));
        assert_eq!(config.page_size, 50);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.warmup_retry.max_attempts, 10);
        assert_eq!(config.warmup_retry.initial_delay, Duration::from_secs(1));
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SyncConfig::default();
        config
            .apply_env_from(lookup(&[
                (ENV_CACHE_DIR, "/tmp/tether-test"),
                (ENV_POLL_INTERVAL_MS, "250"),
                (ENV_PAGE_SIZE, "10"),
                (ENV_CONCURRENCY, "8"),
                (ENV_WARMUP_ATTEMPTS, "4"),
            ]))
            .unwrap();

        assert_eq!(config.cache_root().unwrap(), PathBuf::from("/tmp/tether-test"));
        assert_eq!(config.polling_interval, Duration::from_millis(250));
        assert_eq!(config.page_size, 10);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.warmup_retry.max_attempts, 4);
    }

    #[test]
    fn test_invalid_env_value_is_config_error() {
        let mut config = SyncConfig::default();
        let err = config
            .apply_env_from(lookup(&[(ENV_PAGE_SIZE, "lots")]))
            .unwrap_err();
        assert!(matches!(err, TetherError::Config { .. }));

        let err = config
            .apply_env_from(lookup(&[(ENV_CONCURRENCY, "0")]))
            .unwrap_err();
        assert!(matches!(err, TetherError::Config { .. }));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = SyncConfig::default();
        config
            .apply_env_from(lookup(&[(ENV_CACHE_DIR, ""), (ENV_PAGE_SIZE, " ")]))
            .unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn test_from_file_partial() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tether.json");
        std::fs::write(
            &path,
            r#"{"polling_interval": "2s", "warmup_retry": {"max_attempts": 3}}"#,
        )
        .unwrap();

        let config = SyncConfig::from_file(&path).unwrap();
        assert_eq!(config.polling_interval, Duration::from_secs(2));
        assert_eq!(config.warmup_retry.max_attempts, 3);
        assert_eq!(config.warmup_retry.max_delay, Duration::from_secs(30));
        assert_eq!(config.page_size, 50);
    }

    #[test]
    fn test_rejects_unusable_warmup_backoff() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tether.json");
        std::fs::write(&path, r#"{"warmup_retry": {"backoff_multiplier": -2.0}}"#).unwrap();
        let err = SyncConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, TetherError::Config { .. }));

        let nan = SyncConfig::default()
            .with_warmup_retry(RetryConfig::default().with_backoff_multiplier(f64::NAN));
        assert!(nan.validate().is_err());

        let inverted = SyncConfig::default().with_warmup_retry(
            RetryConfig::default()
                .with_initial_delay(Duration::from_secs(60))
                .with_max_delay(Duration::from_secs(30)),
        );
        assert!(inverted.validate().is_err());

        assert!(SyncConfig::default()
            .with_warmup_retry(RetryConfig::no_retry())
            .validate()
            .is_ok());
    }

    #[test]
    fn test_from_file_errors() {
        let temp = TempDir::new().unwrap();
        assert!(SyncConfig::from_file(temp.path().join("missing.json")).is_err());

        let path = temp.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = SyncConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, TetherError::Config { .. }));
    }
}
