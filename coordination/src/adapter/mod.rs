//! LLM adapter capability interface and provider registry.

mod http;
mod registry;
mod subprocess;

pub use http::HttpAdapter;
pub use registry::ProviderRegistry;
pub use subprocess::{SubprocessAdapter, SubprocessAdapterConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DebateResult;

/// Adapter availability is a tagged variant, not a boolean, so a
/// caller can distinguish "never installed" from "installed but
/// currently failing".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdapterState {
    Available,
    Uninstalled,
    Degraded(String),
}

impl AdapterState {
    pub fn is_usable(&self) -> bool {
        matches!(self, AdapterState::Available)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub text: String,
    pub model: String,
    pub vendor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterStatus {
    pub available: bool,
    pub version: Option<String>,
    pub model: String,
    pub method: String,
    pub error: Option<String>,
}

/// Uniform capability set every LLM backend must provide.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    fn vendor(&self) -> &str;

    async fn invoke(&self, prompt: &str, model: Option<&str>) -> DebateResult<InvokeResponse>;

    async fn state(&self) -> AdapterState;

    async fn status(&self) -> AdapterStatus;
}

/// Truncates an error body/stderr to a bounded length for error
/// reporting, matching the reference's 500-char truncation.
pub fn truncate_for_error(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let boundary = (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0);
        format!("{}...", &s[..boundary])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_state_usable_only_when_available() {
        assert!(AdapterState::Available.is_usable());
        assert!(!AdapterState::Uninstalled.is_usable());
        assert!(!AdapterState::Degraded("timeout".into()).is_usable());
    }

    #[test]
    fn truncate_for_error_respects_bound() {
        let long = "x".repeat(600);
        let truncated = truncate_for_error(&long, 500);
        assert_eq!(truncated.len(), 503);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn truncate_for_error_passes_short_strings_through() {
        assert_eq!(truncate_for_error("short", 500), "short");
    }
}
