//! Subprocess-over-STDIN adapter family.
//!
//! Grounded in `original_source/services/codex_cli_invoker.py`: the
//! prompt is delivered on standard input (avoiding command-line length
//! limits), the response is the tool's trimmed standard output, and
//! failures retry up to `retry_count` additional times.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{truncate_for_error, AdapterState, AdapterStatus, InvokeResponse, LlmAdapter};
use crate::error::{DebateError, DebateResult};

#[derive(Debug, Clone)]
pub struct SubprocessAdapterConfig {
    pub command: String,
    pub args: Vec<String>,
    pub vendor: String,
    pub model: String,
    pub timeout: Duration,
    pub retry_count: u32,
}

impl SubprocessAdapterConfig {
    /// Matches `CodexCLIConfig` defaults: 120s timeout, 2 retries,
    /// `gpt-5-codex-max`.
    pub fn codex_cli() -> Self {
        Self {
            command: "codex".to_string(),
            args: vec![
                "exec".to_string(),
                "--full-auto".to_string(),
                "--skip-git-repo-check".to_string(),
                "-".to_string(),
            ],
            vendor: "codex-cli".to_string(),
            model: "gpt-5-codex-max".to_string(),
            timeout: Duration::from_secs(120),
            retry_count: 2,
        }
    }
}

pub struct SubprocessAdapter {
    config: SubprocessAdapterConfig,
}

impl SubprocessAdapter {
    pub fn new(config: SubprocessAdapterConfig) -> Self {
        Self { config }
    }

    async fn run_once(&self, prompt: &str) -> DebateResult<String> {
        let mut child = Command::new(&self.config.command)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                DebateError::adapter(&self.config.vendor, &self.config.model, e.to_string())
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let prompt = prompt.to_string();
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(|e| DebateError::adapter(&self.config.vendor, &self.config.model, e.to_string()))?;
        }

        let output = tokio::time::timeout(self.config.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                DebateError::timeout(
                    &self.config.vendor,
                    &self.config.model,
                    self.config.timeout.as_secs(),
                )
            })?
            .map_err(|e| DebateError::adapter(&self.config.vendor, &self.config.model, e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if output.status.success() && !stdout.is_empty() {
            return Ok(stdout);
        }
        if output.status.success() && stdout.is_empty() {
            return Err(DebateError::adapter(
                &self.config.vendor,
                &self.config.model,
                format!("empty output, stderr: {}", truncate_for_error(&stderr, 500)),
            ));
        }
        Err(DebateError::adapter(
            &self.config.vendor,
            &self.config.model,
            format!(
                "exit status {}: {}",
                output.status,
                truncate_for_error(&stderr, 500)
            ),
        ))
    }
}

#[async_trait]
impl LlmAdapter for SubprocessAdapter {
    fn vendor(&self) -> &str {
        &self.config.vendor
    }

    async fn invoke(&self, prompt: &str, _model: Option<&str>) -> DebateResult<InvokeResponse> {
        let attempts = self.config.retry_count + 1;
        let mut last_err = None;
        for attempt in 0..attempts {
            match self.run_once(prompt).await {
                Ok(text) => {
                    return Ok(InvokeResponse {
                        text,
                        model: self.config.model.clone(),
                        vendor: self.config.vendor.clone(),
                    })
                }
                Err(e) => {
                    warn!(attempt, vendor = %self.config.vendor, error = %e, "adapter invocation failed, retrying");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            DebateError::adapter(&self.config.vendor, &self.config.model, "all retry attempts failed")
        }))
    }

    async fn state(&self) -> AdapterState {
        let probe = Command::new(&self.config.command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match tokio::time::timeout(Duration::from_secs(5), probe).await {
            Ok(Ok(status)) if status.success() => AdapterState::Available,
            Ok(Ok(_)) => AdapterState::Degraded("non-zero exit from --version probe".to_string()),
            Ok(Err(_)) => AdapterState::Uninstalled,
            Err(_) => AdapterState::Degraded("availability probe timed out".to_string()),
        }
    }

    async fn status(&self) -> AdapterStatus {
        let state = self.state().await;
        debug!(vendor = %self.config.vendor, ?state, "adapter status probe");
        AdapterStatus {
            available: state.is_usable(),
            version: None,
            model: self.config.model.clone(),
            method: self.config.vendor.clone(),
            error: match state {
                AdapterState::Degraded(reason) => Some(reason),
                AdapterState::Uninstalled => Some("not installed".to_string()),
                AdapterState::Available => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codex_cli_defaults_match_reference() {
        let cfg = SubprocessAdapterConfig::codex_cli();
        assert_eq!(cfg.timeout, Duration::from_secs(120));
        assert_eq!(cfg.retry_count, 2);
        assert_eq!(cfg.model, "gpt-5-codex-max");
        assert_eq!(
            cfg.args,
            vec!["exec", "--full-auto", "--skip-git-repo-check", "-"]
        );
    }

    #[tokio::test]
    async fn state_is_uninstalled_for_nonexistent_binary() {
        let adapter = SubprocessAdapter::new(SubprocessAdapterConfig {
            command: "definitely-not-a-real-binary-xyz".to_string(),
            args: vec![],
            vendor: "test".to_string(),
            model: "test-model".to_string(),
            timeout: Duration::from_secs(5),
            retry_count: 0,
        });
        assert_eq!(adapter.state().await, AdapterState::Uninstalled);
    }
}
