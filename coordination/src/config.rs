//! Typed configuration for the debate pipeline.
//!
//! Values are read from the process environment under a `DEBATE_*`
//! prefix (plus the legacy `ENABLE_AI_DEBATE` toggle). A `.env` file,
//! if present, is loaded first but never overrides a variable already
//! set in the real environment -- see [`load_dotenv_without_override`].

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{DebateError, DebateResult};

/// Loads `.env` (if present) without overriding variables that are
/// already set in the process environment. `dotenvy::dotenv()` on its
/// own already skips keys present in the environment, but we check
/// explicitly here so the precedence rule is guaranteed regardless of
/// the crate's internal behavior and is easy to unit test.
pub fn load_dotenv_without_override() {
    if let Ok(iter) = dotenvy::dotenv_iter() {
        for item in iter.flatten() {
            let (key, value) = item;
            if std::env::var(&key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DebateConfig {
    pub enabled: bool,
    pub complexity_threshold: u8,
    pub max_rounds: u8,
    pub consensus_min: u8,
    pub target_consensus: u8,
    pub min_improvement_threshold: f64,
    pub max_regression_tolerance: f64,
    pub lock_timeout: Duration,
    pub cleanup_days: u32,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub debug: bool,
    pub temp_dir: Option<PathBuf>,
    /// Opaque participant labels, in invocation order. The reference
    /// hard-codes `["claude", "codex"]"; this is generalized to an
    /// arbitrary ordered list of labels.
    pub participants: Vec<String>,
    pub cache_ttl: Duration,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            // ENABLE_AI_DEBATE: master on/off switch
            enabled: std::env::var("ENABLE_AI_DEBATE")
                .ok()
                .map(|s| parse_bool(&s))
                .unwrap_or(true),
            // DEBATE_COMPLEXITY_THRESHOLD: enforcement gate score floor, 0-100
            complexity_threshold: std::env::var("DEBATE_COMPLEXITY_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(40),
            // DEBATE_MAX_ROUNDS: iteration cap, 1-10
            max_rounds: std::env::var("DEBATE_MAX_ROUNDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            // DEBATE_CONSENSUS_MIN: floor below which a debate is considered unresolved
            consensus_min: std::env::var("DEBATE_CONSENSUS_MIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(70),
            // DEBATE_TARGET_CONSENSUS: iterative engine's stopping target, 50-100
            target_consensus: std::env::var("DEBATE_TARGET_CONSENSUS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(85),
            // DEBATE_MIN_IMPROVEMENT: minimum per-iteration gain before a "stalled" warning
            min_improvement_threshold: std::env::var("DEBATE_MIN_IMPROVEMENT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3.0),
            // DEBATE_MAX_REGRESSION: tolerated consensus drop before a regression warning
            max_regression_tolerance: std::env::var("DEBATE_MAX_REGRESSION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5.0),
            // DEBATE_LOCK_TIMEOUT: seconds to wait on an advisory session lock
            lock_timeout: std::env::var("DEBATE_LOCK_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or_else(|| Duration::from_secs(10)),
            // DEBATE_CLEANUP_DAYS: session directories older than this are purged
            cleanup_days: std::env::var("DEBATE_CLEANUP_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(7),
            // DEBATE_RETRY_ATTEMPTS: adapter invocation retry count
            retry_attempts: std::env::var("DEBATE_RETRY_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            // DEBATE_RETRY_DELAY_MS: backoff between adapter retries
            retry_delay: std::env::var("DEBATE_RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or_else(|| Duration::from_millis(500)),
            // DEBATE_LOG_LEVEL: tracing-subscriber env-filter directive
            log_level: std::env::var("DEBATE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            // DEBATE_LOG_FILE: optional path to also write logs to
            log_file: std::env::var("DEBATE_LOG_FILE").ok().map(PathBuf::from),
            // DEBATE_DEBUG: verbose diagnostics
            debug: std::env::var("DEBATE_DEBUG")
                .ok()
                .map(|s| parse_bool(&s))
                .unwrap_or(false),
            // DEBATE_TEMP_DIR: root for session directories (defaults to the OS temp dir)
            temp_dir: std::env::var("DEBATE_TEMP_DIR").ok().map(PathBuf::from),
            // DEBATE_PARTICIPANTS: comma-separated participant labels
            participants: std::env::var("DEBATE_PARTICIPANTS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect::<Vec<_>>()
                })
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| vec!["claude".to_string(), "codex".to_string()]),
            // DEBATE_CACHE_TTL_SECS: response cache entry lifetime
            cache_ttl: std::env::var("DEBATE_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or_else(|| Duration::from_secs(3600)),
        }
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl DebateConfig {
    /// Loads configuration from the environment (after seeding any
    /// unset variables from `.env`), then validates it.
    pub fn load() -> DebateResult<Self> {
        load_dotenv_without_override();
        Self::default().validate()
    }

    /// Validates the configured ranges. Returns the
    /// config unchanged on success so this composes with `load`.
    pub fn validate(self) -> DebateResult<Self> {
        if self.complexity_threshold > 100 {
            return Err(DebateError::config(format!(
                "complexity_threshold must be 0..=100, got {}",
                self.complexity_threshold
            )));
        }
        if !(1..=10).contains(&self.max_rounds) {
            return Err(DebateError::config(format!(
                "max_rounds must be 1..=10, got {}",
                self.max_rounds
            )));
        }
        if self.consensus_min > 100 {
            return Err(DebateError::config(format!(
                "consensus_min must be 0..=100, got {}",
                self.consensus_min
            )));
        }
        if !(50..=100).contains(&self.target_consensus) {
            return Err(DebateError::config(format!(
                "target_consensus must be 50..=100, got {}",
                self.target_consensus
            )));
        }
        if self.min_improvement_threshold < 0.0 {
            return Err(DebateError::config(
                "min_improvement_threshold must be >= 0",
            ));
        }
        if self.max_regression_tolerance < 0.0 {
            return Err(DebateError::config("max_regression_tolerance must be >= 0"));
        }
        if self.lock_timeout.is_zero() {
            return Err(DebateError::config("lock_timeout must be > 0"));
        }
        if self.cleanup_days == 0 {
            return Err(DebateError::config("cleanup_days must be > 0"));
        }
        if self.participants.len() < 2 {
            return Err(DebateError::config(
                "at least two participant labels are required",
            ));
        }
        Ok(self)
    }

    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
            .join("ai_debates")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variable mutation must be serialized across tests in
    // this module since `std::env::var`/`set_var` are process-global.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_all() {
        for key in [
            "ENABLE_AI_DEBATE",
            "DEBATE_COMPLEXITY_THRESHOLD",
            "DEBATE_MAX_ROUNDS",
            "DEBATE_CONSENSUS_MIN",
            "DEBATE_TARGET_CONSENSUS",
            "DEBATE_MIN_IMPROVEMENT",
            "DEBATE_MAX_REGRESSION",
            "DEBATE_LOCK_TIMEOUT",
            "DEBATE_CLEANUP_DAYS",
            "DEBATE_RETRY_ATTEMPTS",
            "DEBATE_RETRY_DELAY_MS",
            "DEBATE_LOG_LEVEL",
            "DEBATE_LOG_FILE",
            "DEBATE_DEBUG",
            "DEBATE_TEMP_DIR",
            "DEBATE_PARTICIPANTS",
            "DEBATE_CACHE_TTL_SECS",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn defaults_are_valid() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        let cfg = DebateConfig::default().validate().unwrap();
        assert_eq!(cfg.max_rounds, 3);
        assert_eq!(cfg.target_consensus, 85);
        assert_eq!(cfg.participants, vec!["claude", "codex"]);
    }

    #[test]
    fn rejects_out_of_range_target_consensus() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        std::env::set_var("DEBATE_TARGET_CONSENSUS", "30");
        let result = DebateConfig::default().validate();
        assert!(result.is_err());
        std::env::remove_var("DEBATE_TARGET_CONSENSUS");
    }

    #[test]
    fn rejects_zero_max_rounds() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        std::env::set_var("DEBATE_MAX_ROUNDS", "0");
        let result = DebateConfig::default().validate();
        assert!(result.is_err());
        std::env::remove_var("DEBATE_MAX_ROUNDS");
    }

    #[test]
    fn parses_custom_participants() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        std::env::set_var("DEBATE_PARTICIPANTS", "alice, bob , carol");
        let cfg = DebateConfig::default();
        assert_eq!(cfg.participants, vec!["alice", "bob", "carol"]);
        std::env::remove_var("DEBATE_PARTICIPANTS");
    }

    #[test]
    fn parse_bool_accepts_common_truthy_forms() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(parse_bool("YES"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("no"));
    }

    #[test]
    fn temp_root_defaults_under_os_temp_dir() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        let cfg = DebateConfig::default();
        assert!(cfg.temp_root().ends_with("ai_debates"));
    }
}
