//! HTTP adapter family: one entry per local bridge
//! endpoint. `POST /invoke {prompt, model}` on success; `503` is a
//! permanent "unavailable" for that invocation; other 5xx and connect
//! errors are retried.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{AdapterState, AdapterStatus, InvokeResponse, LlmAdapter};
use crate::error::{DebateError, DebateResult};

#[derive(Debug, Serialize)]
struct InvokeRequest<'a> {
    prompt: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct InvokeResponseBody {
    response: String,
    model: String,
    vendor: String,
}

pub struct HttpAdapter {
    client: reqwest::Client,
    base_url: String,
    vendor: String,
    default_model: String,
    timeout: Duration,
    retry_count: u32,
}

impl HttpAdapter {
    pub fn new(base_url: impl Into<String>, vendor: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            vendor: vendor.into(),
            default_model: default_model.into(),
            timeout: Duration::from_secs(60),
            retry_count: 2,
        }
    }

    async fn invoke_once(&self, prompt: &str, model: &str) -> DebateResult<InvokeResponseBody> {
        let url = format!("{}/invoke", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&InvokeRequest { prompt, model })
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| DebateError::adapter(&self.vendor, model, e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 503 {
            return Err(DebateError::adapter(&self.vendor, model, "backend unavailable (503)"));
        }
        if status.is_server_error() {
            return Err(DebateError::adapter(
                &self.vendor,
                model,
                format!("server error {status}"),
            ));
        }
        if !status.is_success() {
            return Err(DebateError::adapter(
                &self.vendor,
                model,
                format!("unexpected status {status}"),
            ));
        }
        response
            .json::<InvokeResponseBody>()
            .await
            .map_err(|e| DebateError::adapter(&self.vendor, model, format!("invalid response body: {e}")))
    }
}

#[async_trait]
impl LlmAdapter for HttpAdapter {
    fn vendor(&self) -> &str {
        &self.vendor
    }

    async fn invoke(&self, prompt: &str, model: Option<&str>) -> DebateResult<InvokeResponse> {
        let model = model.unwrap_or(&self.default_model);
        let attempts = self.retry_count + 1;
        let mut last_err = None;
        for _ in 0..attempts {
            match self.invoke_once(prompt, model).await {
                Ok(body) => {
                    return Ok(InvokeResponse {
                        text: body.response,
                        model: body.model,
                        vendor: body.vendor,
                    })
                }
                Err(e) if e.to_string().contains("503") => return Err(e),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| DebateError::adapter(&self.vendor, model, "all retry attempts failed")))
    }

    async fn state(&self) -> AdapterState {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).timeout(Duration::from_secs(5)).send().await {
            Ok(resp) if resp.status().is_success() => AdapterState::Available,
            Ok(resp) => AdapterState::Degraded(format!("health check returned {}", resp.status())),
            Err(e) => {
                if e.is_connect() {
                    AdapterState::Uninstalled
                } else {
                    AdapterState::Degraded(e.to_string())
                }
            }
        }
    }

    async fn status(&self) -> AdapterStatus {
        let state = self.state().await;
        AdapterStatus {
            available: state.is_usable(),
            version: None,
            model: self.default_model.clone(),
            method: self.vendor.clone(),
            error: match state {
                AdapterState::Degraded(reason) => Some(reason),
                AdapterState::Uninstalled => Some("unreachable".to_string()),
                AdapterState::Available => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_carries_vendor_and_default_model() {
        let adapter = HttpAdapter::new("http://localhost:9000", "local-bridge", "llama-3");
        assert_eq!(adapter.vendor(), "local-bridge");
        assert_eq!(adapter.default_model, "llama-3");
    }
}
