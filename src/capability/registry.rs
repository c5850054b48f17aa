use std::collections::HashMap;
use std::sync::Arc;

use crate::capability::mock::MockProvider;
use crate::capability::provider::CapabilityProvider;
use crate::capability::providers::openai_compatible::OpenAiCompatibleProvider;
use crate::config::AppConfig;
use crate::errors::{TextLensError, TextLensResult};

/// Registry of all capability hosts, keyed by their config.toml identifier.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn CapabilityProvider>>,
    active: String,
}

impl ProviderRegistry {
    /// A registry holding only the built-in `mock` host, which is active.
    pub fn new() -> Self {
        let mut registry = Self {
            providers: HashMap::new(),
            active: "mock".into(),
        };
        registry.register(Arc::new(MockProvider::demo()));
        registry
    }

    pub fn register(&mut self, provider: Arc<dyn CapabilityProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get_active(&self) -> TextLensResult<Arc<dyn CapabilityProvider>> {
        self.providers
            .get(&self.active)
            .cloned()
            .ok_or_else(|| {
                TextLensError::Config(format!(
                    "Active provider '{}' not found in registry",
                    self.active
                ))
            })
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn set_active(&mut self, name: String) -> TextLensResult<()> {
        if self.providers.contains_key(&name) {
            self.active = name;
            Ok(())
        } else {
            Err(TextLensError::Config(format!("Provider '{name}' not registered")))
        }
    }

    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build a registry from the loaded app config.
    /// API keys are read from environment variables named `TEXTLENS_<ID>_API_KEY`.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut registry = Self::new();
        for (id, entry) in &config.backend.providers {
            let api_key = std::env::var(format!("TEXTLENS_{}_API_KEY", id.to_uppercase()))
                .unwrap_or_else(|_| entry.api_key.clone().unwrap_or_default());
            let provider = OpenAiCompatibleProvider::new(id.clone(), entry.clone(), api_key);
            registry.register(Arc::new(provider));
        }
        if let Err(e) = registry.set_active(config.backend.active.clone()) {
            tracing::warn!(error = %e, "falling back to the mock provider");
        }
        registry
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
    use crate::config::parse_config;

    #[test]
    fn mock_is_always_available() {
        let registry = ProviderRegistry::new();
        assert_eq!(registry.active_name(), "mock");
        assert_eq!(registry.get_active().unwrap().name(), "mock");
    }

    #[test]
    fn config_providers_are_registered_and_activated() {
        let cfg = parse_config(
            r#"
            [backend]
            active = "remote"

            [backend.providers.remote]
            display_name = "Remote"
            api_base = "http://127.0.0.1:9/v1"
            model = "m"
            "#,
        )
        .unwrap();
        let mut registry = ProviderRegistry::from_config(&cfg);

        assert_eq!(registry.list_names(), vec!["mock".to_string(), "remote".to_string()]);
        assert_eq!(registry.active_name(), "remote");
        assert!(registry.set_active("missing".into()).is_err());
        assert_eq!(registry.active_name(), "remote");
    }

    #[test]
    fn unknown_active_falls_back_to_mock() {
        let cfg = parse_config("[backend]\nactive = \"nowhere\"\n").unwrap();
        let registry = ProviderRegistry::from_config(&cfg);
        assert_eq!(registry.active_name(), "mock");
    }
}
