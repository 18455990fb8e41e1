//! Unified error taxonomy for the debate pipeline.
//!
//! Every library module returns `Result<T, DebateError>`. Recoverable
//! conditions (lock retry, cache miss, adapter retry, malformed history
//! record) are absorbed and logged by their callers rather than turned
//! into an error; this type exists for conditions that genuinely stop
//! an operation.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DebateError {
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("lock not acquired within {timeout_secs}s: {path}")]
    LockTimeout { path: PathBuf, timeout_secs: u64 },

    #[error("adapter '{vendor}' ({model}) failed: {message}")]
    Adapter {
        vendor: String,
        model: String,
        message: String,
    },

    #[error("adapter '{vendor}' ({model}) timed out after {timeout_secs}s")]
    Timeout {
        vendor: String,
        model: String,
        timeout_secs: u64,
    },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("not ready: {message}")]
    NotReady { message: String },
}

impl DebateError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn lock_timeout(path: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self::LockTimeout {
            path: path.into(),
            timeout_secs,
        }
    }

    pub fn adapter(
        vendor: impl Into<String>,
        model: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Adapter {
            vendor: vendor.into(),
            model: model.into(),
            message: message.into(),
        }
    }

    pub fn timeout(vendor: impl Into<String>, model: impl Into<String>, timeout_secs: u64) -> Self {
        Self::Timeout {
            vendor: vendor.into(),
            model: model.into(),
            timeout_secs,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_ready(message: impl Into<String>) -> Self {
        Self::NotReady {
            message: message.into(),
        }
    }

    /// Whether a caller might reasonably retry this exact operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout { .. } | Self::Timeout { .. })
    }
}

pub type DebateResult<T> = Result<T, DebateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_formats_message() {
        let err = DebateError::config("max_rounds out of range");
        assert_eq!(err.to_string(), "configuration error: max_rounds out of range");
    }

    #[test]
    fn timeout_is_retryable() {
        let err = DebateError::timeout("codex-cli", "gpt-5-codex-max", 120);
        assert!(err.is_retryable());
    }

    #[test]
    fn adapter_error_is_not_retryable() {
        let err = DebateError::adapter("codex-cli", "gpt-5-codex-max", "non-zero exit");
        assert!(!err.is_retryable());
    }

    #[test]
    fn lock_timeout_is_retryable() {
        let err = DebateError::lock_timeout("/tmp/x/.sequence.lock", 10);
        assert!(err.is_retryable());
    }

    #[test]
    fn io_error_wraps_source() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = DebateError::io("/tmp/x", source);
        assert!(err.to_string().contains("/tmp/x"));
    }
}
