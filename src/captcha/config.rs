//! Configuration for the solver and its download subsystem

use crate::matching::MatchConfig;
use std::time::Duration;

pub const ENV_RETRY_LIMIT: &str = "CAPTCHA_RETRY_LIMIT";
pub const ENV_DOWNLOAD_TIMEOUT: &str = "DOWNLOAD_TIMEOUT";
pub const ENV_DOWNLOAD_MAX_RETRIES: &str = "DOWNLOAD_MAX_RETRIES";
pub const ENV_DOWNLOAD_RETRY_DELAY: &str = "DOWNLOAD_RETRY_DELAY";

#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Maximum number of puzzle attempts
    pub retry_limit: u32,
    /// Wait between submitting and reading the result indicator
    pub settle_delay: Duration,
    /// Wait before and after clicking the reload control
    pub refresh_delay: Duration,
    /// Classifier labels that mark a sprite slice as unusable
    pub degenerate_labels: Vec<String>,
    /// Class fragment on the result indicator that means success
    pub success_marker: String,
    pub matching: MatchConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            retry_limit: 5,
            settle_delay: Duration::from_secs(5),
            refresh_delay: Duration::from_secs(2),
            degenerate_labels: vec!["0".to_string(), "1".to_string()],
            success_marker: "show-success".to_string(),
            matching: MatchConfig::default(),
        }
    }
}

impl SolverConfig {
    /// Defaults overlaid with environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            retry_limit: read_parsed(&lookup, ENV_RETRY_LIMIT, defaults.retry_limit),
            ..defaults
        }
    }

    /// No waiting at all, for tests and offline replays
    pub fn without_delays() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            refresh_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn is_degenerate_label(&self, label: &str) -> bool {
        self.degenerate_labels.iter().any(|l| l == label)
    }
}

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Per-request timeout
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl DownloadConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let timeout_secs = read_parsed(&lookup, ENV_DOWNLOAD_TIMEOUT, defaults.timeout.as_secs());
        let max_retries = read_parsed(&lookup, ENV_DOWNLOAD_MAX_RETRIES, defaults.max_retries);
        let delay_secs = read_parsed(
            &lookup,
            ENV_DOWNLOAD_RETRY_DELAY,
            defaults.retry_delay.as_secs_f64(),
        );
        let retry_delay = Duration::try_from_secs_f64(delay_secs).unwrap_or_else(|_| {
            log::warn!(
                "Invalid config: {} must be a non-negative number, using default {:?}",
                ENV_DOWNLOAD_RETRY_DELAY,
                defaults.retry_delay
            );
            defaults.retry_delay
        });
        Self {
            timeout: Duration::from_secs(timeout_secs),
            max_retries,
            retry_delay,
        }
    }
}

/// Parse an optional setting; empty means default, garbage warns and means default
fn read_parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Debug,
{
    match lookup(key) {
        None => default,
        Some(raw) if raw.trim().is_empty() => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!(
                "Invalid config: {} = {:?} is not valid, using default {:?}",
                key,
                raw,
                default
            );
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_solver_defaults() {
        let config = SolverConfig::default();
        assert_eq!(config.retry_limit, 5);
        assert_eq!(config.settle_delay, Duration::from_secs(5));
        assert!(config.is_degenerate_label("0"));
        assert!(config.is_degenerate_label("1"));
        assert!(!config.is_degenerate_label("2"));
        assert_eq!(config.matching.ratio_threshold, 0.8);
    }

    #[test]
    fn test_solver_env_override() {
        let config = SolverConfig::from_lookup(lookup(&[(ENV_RETRY_LIMIT, "8")]));
        assert_eq!(config.retry_limit, 8);
    }

    #[test]
    fn test_invalid_and_empty_values_keep_defaults() {
        let config = SolverConfig::from_lookup(lookup(&[(ENV_RETRY_LIMIT, "many")]));
        assert_eq!(config.retry_limit, 5);

        let download = DownloadConfig::from_lookup(lookup(&[
            (ENV_DOWNLOAD_TIMEOUT, ""),
            (ENV_DOWNLOAD_MAX_RETRIES, "-1"),
            (ENV_DOWNLOAD_RETRY_DELAY, "-3.5"),
        ]));
        assert_eq!(download.timeout, Duration::from_secs(10));
        assert_eq!(download.max_retries, 3);
        assert_eq!(download.retry_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_download_env_override() {
        let download = DownloadConfig::from_lookup(lookup(&[
            (ENV_DOWNLOAD_TIMEOUT, "30"),
            (ENV_DOWNLOAD_MAX_RETRIES, "5"),
            (ENV_DOWNLOAD_RETRY_DELAY, "0.5"),
        ]));
        assert_eq!(download.timeout, Duration::from_secs(30));
        assert_eq!(download.max_retries, 5);
        assert_eq!(download.retry_delay, Duration::from_millis(500));
    }
}
