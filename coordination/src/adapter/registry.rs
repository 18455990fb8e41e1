//! Provider registry: picks an ordered list of available
//! adapters at start-up, guaranteeing at least two entries so the
//! orchestrator always has two independent invocation slots (by
//! duplicating the sole available one if necessary).

use std::sync::Arc;

use super::LlmAdapter;

pub struct ProviderRegistry {
    slots: Vec<Arc<dyn LlmAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn register(&mut self, adapter: Arc<dyn LlmAdapter>) {
        self.slots.push(adapter);
    }

    /// Returns two adapter slots for parallel invocation, duplicating
    /// the sole registered adapter when only one is available.
    pub async fn pick_two(&self) -> Option<(Arc<dyn LlmAdapter>, Arc<dyn LlmAdapter>)> {
        let mut usable = Vec::new();
        for adapter in &self.slots {
            if adapter.state().await.is_usable() {
                usable.push(Arc::clone(adapter));
            }
        }
        match usable.len() {
            0 => None,
            1 => Some((usable[0].clone(), usable[0].clone())),
            _ => Some((usable[0].clone(), usable[1].clone())),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterState, AdapterStatus, InvokeResponse};
    use async_trait::async_trait;
    use crate::error::DebateResult;

    struct StubAdapter {
        vendor: String,
        usable: bool,
    }

    #[async_trait]
    impl LlmAdapter for StubAdapter {
        fn vendor(&self) -> &str {
            &self.vendor
        }

        async fn invoke(&self, _prompt: &str, _model: Option<&str>) -> DebateResult<InvokeResponse> {
            Ok(InvokeResponse {
                text: "stub".to_string(),
                model: "stub-model".to_string(),
                vendor: self.vendor.clone(),
            })
        }

        async fn state(&self) -> AdapterState {
            if self.usable {
                AdapterState::Available
            } else {
                AdapterState::Uninstalled
            }
        }

        async fn status(&self) -> AdapterStatus {
            AdapterStatus {
                available: self.usable,
                version: None,
                model: "stub-model".to_string(),
                method: self.vendor.clone(),
                error: None,
            }
        }
    }

    #[tokio::test]
    async fn single_available_adapter_is_duplicated() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(StubAdapter {
            vendor: "only".to_string(),
            usable: true,
        }));
        let (a, b) = registry.pick_two().await.unwrap();
        assert_eq!(a.vendor(), "only");
        assert_eq!(b.vendor(), "only");
    }

    #[tokio::test]
    async fn two_available_adapters_are_both_returned() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(StubAdapter {
            vendor: "a".to_string(),
            usable: true,
        }));
        registry.register(Arc::new(StubAdapter {
            vendor: "b".to_string(),
            usable: true,
        }));
        let (a, b) = registry.pick_two().await.unwrap();
        assert_eq!(a.vendor(), "a");
        assert_eq!(b.vendor(), "b");
    }

    #[tokio::test]
    async fn no_usable_adapters_returns_none() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(StubAdapter {
            vendor: "dead".to_string(),
            usable: false,
        }));
        assert!(registry.pick_two().await.is_none());
    }
}
