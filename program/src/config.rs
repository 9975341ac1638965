// Prize Draw Engine - Configuration
use std::path::PathBuf;
use std::time::Duration;

use crate::error::DrawError;

const HOUR_MS: i64 = 60 * 60 * 1000;

/// Longest accepted round, in hours (about 100 years)
pub const MAX_ROUND_HOURS: i64 = 100 * 365 * 24;
/// Longest accepted reveal window or sweep interval
pub const MAX_INTERVAL_MS: i64 = 24 * HOUR_MS;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// How long a published round stays open, in milliseconds
    pub round_duration_ms: i64,
    /// Reveal window: how long the turn lock is held after a win, in milliseconds
    pub reveal_window_ms: i64,
    /// Cadence of the background round-expiry sweep
    pub sweep_interval: Duration,
    /// Directory holding uploaded prize artifacts
    pub upload_dir: PathBuf,
    /// On-disk state file
    pub state_path: PathBuf,
    /// Operator login
    pub admin_user: String,
    /// Operator password
    pub admin_pass: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            round_duration_ms: 24 * HOUR_MS, // 24 hours
            reveal_window_ms: 8_000,
            sweep_interval: Duration::from_secs(5),
            upload_dir: PathBuf::from("uploads"),
            state_path: PathBuf::from("data").join("state.bin"),
            admin_user: "admin".to_string(),
            admin_pass: "admin123".to_string(),
        }
    }
}

impl Config {
    /// Build a config from process environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, DrawError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DrawError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(hours) = lookup("ROUND_HOURS") {
            config.round_duration_ms =
                parse_bounded("ROUND_HOURS", &hours, MAX_ROUND_HOURS)? * HOUR_MS;
        }
        if let Some(ms) = lookup("SPIN_LOCK_MS") {
            config.reveal_window_ms = parse_bounded("SPIN_LOCK_MS", &ms, MAX_INTERVAL_MS)?;
        }
        if let Some(ms) = lookup("SWEEP_INTERVAL_MS") {
            config.sweep_interval =
                Duration::from_millis(parse_bounded("SWEEP_INTERVAL_MS", &ms, MAX_INTERVAL_MS)? as u64);
        }
        if let Some(dir) = lookup("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("STATE_PATH") {
            config.state_path = PathBuf::from(path);
        }
        if let Some(user) = lookup("ADMIN_USER") {
            config.admin_user = user;
        }
        if let Some(pass) = lookup("ADMIN_PASS") {
            config.admin_pass = pass;
        }

        Ok(config)
    }

    /// Check operator credentials
    pub fn authenticate(&self, user: &str, pass: &str) -> bool {
        user == self.admin_user && pass == self.admin_pass
    }
}

/// Parse a value in `1..=max`
fn parse_bounded(key: &'static str, raw: &str, max: i64) -> Result<i64, DrawError> {
    match raw.trim().parse::<i64>() {
        Ok(value) if value > 0 && value <= max => Ok(value),
        _ => Err(DrawError::InvalidConfig {
            key,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.round_duration_ms, 86_400_000);
        assert_eq!(config.reveal_window_ms, 8_000);
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = Config::from_lookup(lookup_from(&[
            ("ROUND_HOURS", "2"),
            ("SPIN_LOCK_MS", "1500"),
            ("SWEEP_INTERVAL_MS", "250"),
            ("ADMIN_USER", "host"),
        ]))
        .unwrap();

        assert_eq!(config.round_duration_ms, 2 * 3_600_000);
        assert_eq!(config.reveal_window_ms, 1_500);
        assert_eq!(config.sweep_interval, Duration::from_millis(250));
        assert_eq!(config.admin_user, "host");
        assert_eq!(config.admin_pass, "admin123");
    }

    #[test]
    fn test_rejects_non_positive_values() {
        let err = Config::from_lookup(lookup_from(&[("SPIN_LOCK_MS", "0")])).unwrap_err();
        assert!(matches!(err, DrawError::InvalidConfig { key: "SPIN_LOCK_MS", .. }));

        let err = Config::from_lookup(lookup_from(&[("ROUND_HOURS", "soon")])).unwrap_err();
        assert!(matches!(err, DrawError::InvalidConfig { key: "ROUND_HOURS", .. }));
    }

    #[test]
    fn test_rejects_values_past_the_limit() {
        let err = Config::from_lookup(lookup_from(&[("ROUND_HOURS", "3000000000000")])).unwrap_err();
        assert!(matches!(err, DrawError::InvalidConfig { key: "ROUND_HOURS", .. }));

        let err =
            Config::from_lookup(lookup_from(&[("SPIN_LOCK_MS", "9223372036854775807")])).unwrap_err();
        assert!(matches!(err, DrawError::InvalidConfig { key: "SPIN_LOCK_MS", .. }));

        let err = Config::from_lookup(lookup_from(&[("SWEEP_INTERVAL_MS", "86400001")])).unwrap_err();
        assert!(matches!(err, DrawError::InvalidConfig { key: "SWEEP_INTERVAL_MS", .. }));

        let config = Config::from_lookup(lookup_from(&[
            ("ROUND_HOURS", "876000"),
            ("SPIN_LOCK_MS", "86400000"),
        ]))
        .unwrap();
        assert_eq!(config.round_duration_ms, MAX_ROUND_HOURS * HOUR_MS);
        assert_eq!(config.reveal_window_ms, MAX_INTERVAL_MS);
    }

    #[test]
    fn test_authenticate() {
        let config = Config::default();
        assert!(config.authenticate("admin", "admin123"));
        assert!(!config.authenticate("admin", "wrong"));
    }
}
