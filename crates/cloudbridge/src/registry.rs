//! Provider factory registry
//!
//! Adapter crates expose a `register()` function that adds their
//! [`ProviderFactory`] to the process-wide registry. The embedding process
//! calls those at start-up and afterwards builds providers by vendor id.

use crate::config::ProviderConfig;
use crate::error::{CloudError, Result};
use crate::provider::{CloudProvider, ProviderFactory};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, RwLock};

/// Set of provider factories keyed by vendor id
#[derive(Default)]
pub struct ProviderRegistry {
    factories: RwLock<BTreeMap<String, Arc<dyn ProviderFactory>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a factory; a later registration for the same id replaces it
    pub fn register(&self, factory: Arc<dyn ProviderFactory>) {
        let id = factory.id().to_string();
        let mut factories = self.factories.write().unwrap_or_else(|e| e.into_inner());
        if factories.insert(id.clone(), factory).is_some() {
            tracing::warn!("Provider factory {} registered twice, replacing", id);
        } else {
            tracing::debug!("Registered provider factory {}", id);
        }
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn ProviderFactory>> {
        self.factories
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
            .ok_or_else(|| CloudError::NotSupported(format!("provider {}", id)))
    }

    pub fn ids(&self) -> Vec<String> {
        self.factories
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(id)
    }

    /// Validate `config` against its vendor's factory and build the provider
    pub async fn create(&self, config: ProviderConfig) -> Result<Box<dyn CloudProvider>> {
        let factory = self.get(&config.vendor)?;
        factory.validate_config(&config)?;
        tracing::info!(
            "Creating {} provider for account {}",
            factory.name(),
            config.account
        );
        factory.create_provider(config).await
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("factories", &self.ids())
            .finish()
    }
}

static GLOBAL: OnceLock<ProviderRegistry> = OnceLock::new();

/// The process-wide registry
pub fn global() -> &'static ProviderRegistry {
    GLOBAL.get_or_init(ProviderRegistry::new)
}

pub fn register_factory(factory: Arc<dyn ProviderFactory>) {
    global().register(factory);
}

pub fn provider_factory(id: &str) -> Result<Arc<dyn ProviderFactory>> {
    global().get(id)
}

pub fn registered_provider_ids() -> Vec<String> {
    global().ids()
}

pub fn is_supported(id: &str) -> bool {
    global().contains(id)
}

pub async fn create_provider(config: ProviderConfig) -> Result<Box<dyn CloudProvider>> {
    global().create(config).await
}
