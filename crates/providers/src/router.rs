//! Provider router — selects the correct LLM provider based on config.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use gongbu_core::provider::Provider;
use crate::openai_compat::OpenAiCompatProvider;
use tracing::warn;

/// Routes LLM requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }
}

/// Build providers from configuration.
///
/// Entries without `api_url` must name a known endpoint; others are skipped.
pub fn build_from_config(config: &gongbu_config::AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);
    let timeout = Duration::from_secs(config.request_timeout_secs);

    for (name, provider_config) in &config.providers {
        let Some(base_url) = provider_config.api_url.clone().or_else(|| known_base_url(name)) else {
            warn!(provider = %name, "Skipping provider without api_url");
            continue;
        };
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        router.register(
            name.clone(),
            Arc::new(OpenAiCompatProvider::with_timeout(name, &base_url, &api_key, timeout)),
        );
    }

    // The default provider needs no table entry when it is a known endpoint.
    if router.get(&config.default_provider).is_none() {
        match known_base_url(&config.default_provider) {
            Some(base_url) => {
                let api_key = config.api_key.clone().unwrap_or_default();
                router.register(
                    config.default_provider.clone(),
                    Arc::new(OpenAiCompatProvider::with_timeout(
                        &config.default_provider,
                        &base_url,
                        &api_key,
                        timeout,
                    )),
                );
            }
            None => warn!(
                provider = %config.default_provider,
                "Default provider is not configured and has no known endpoint"
            ),
        }
    }

    router
}

/// Base URL of the endpoints usable without an explicit `api_url`.
fn known_base_url(provider_name: &str) -> Option<String> {
    match provider_name {
        "openai" => Some("https://api.openai.com/v1".into()),
        "ollama" => Some("http://localhost:11434/v1".into()),
        _ => None,
    }
}
