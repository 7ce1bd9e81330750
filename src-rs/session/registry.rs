use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::error::{CoreError, CoreResult};
use crate::llm::dispatch::SharedProvider;
use crate::llm::models::provider_handle::{configure_provider, AnyProviderClient};

/// Named provider instances plus the one currently selected.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, SharedProvider>,
    active: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures every provider entry. Entries that fail configuration are
    /// logged and left out; `active_provider` is activated if it survived.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut registry = Self::new();
        for (name, provider_config) in &config.providers {
            match configure_provider(name, provider_config) {
                Ok(client) => {
                    log::debug!("Configured provider '{}'", name);
                    registry.register(name, client);
                }
                Err(e) => log::warn!("Skipping provider '{}': {}", name, e),
            }
        }
        if let Some(active) = config.active_provider.as_deref() {
            if let Err(e) = registry.activate(active) {
                log::warn!("Active provider not available: {}", e);
            }
        }
        registry
    }

    /// Adds `client` under `name`, returning the instance it replaced.
    /// An active entry of the same name stays active and now points at the
    /// new instance.
    pub fn register(&mut self, name: &str, client: AnyProviderClient) -> Option<SharedProvider> {
        self.providers
            .insert(name.to_string(), Arc::new(Mutex::new(client)))
    }

    pub fn activate(&mut self, name: &str) -> CoreResult<()> {
        if !self.providers.contains_key(name) {
            return Err(CoreError::NotFound(format!("provider '{}' is not registered", name)));
        }
        log::info!("Active provider set to '{}'", name);
        self.active = Some(name.to_string());
        Ok(())
    }

    pub fn current(&self) -> Option<SharedProvider> {
        let name = self.active.as_ref()?;
        self.providers.get(name).cloned()
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<SharedProvider> {
        self.providers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
