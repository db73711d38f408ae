//! Adapter registry
//!
//! Adapters are registered by name at startup. A resource resolves its adapter through
//! [`ResourceConfig::adapter_name`], which defaults to the resource type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::Adapter;
use crate::config::{EndpointConfig, ResourceConfig};
use crate::error::{Error, Result};

/// Adapters keyed by registry name
///
/// # Example
///
/// ```rust,ignore
/// let registry = AdapterRegistry::new()
///     .register("articles", ResourceAdapter::new(Articles, MemoryStore::new("articles")))
///     .register("people", ResourceAdapter::new(People, MemoryStore::new("people")));
///
/// registry.validate(&config.endpoint)?;
/// ```
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under `name`
    pub fn register(mut self, name: impl Into<String>, adapter: impl Adapter + 'static) -> Self {
        self.insert(name, Arc::new(adapter));
        self
    }

    /// Register a shared adapter under `name`, replacing any previous one
    pub fn insert(&mut self, name: impl Into<String>, adapter: Arc<dyn Adapter>) {
        let name = name.into();
        if self.adapters.insert(name.clone(), adapter).is_some() {
            tracing::warn!(adapter = %name, "Replaced previously registered adapter");
        }
    }

    /// Adapter registered under `name`
    pub fn get(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(name).cloned()
    }

    /// Adapter serving a configured resource type
    pub fn resolve(&self, resource_type: &str, resource: &ResourceConfig) -> Result<Arc<dyn Adapter>> {
        let name = resource.adapter_name(resource_type);
        self.get(name).ok_or_else(|| {
            Error::Configuration(format!(
                "no adapter `{}` registered for resource type `{}`",
                name, resource_type
            ))
        })
    }

    /// Check that every configured resource has an adapter
    ///
    /// Relationships pointing at unconfigured types are only warned about; they are
    /// reported as `NotFound` when requested.
    pub fn validate(&self, endpoint: &EndpointConfig) -> Result<()> {
        let mut types: Vec<&String> = endpoint.resources.keys().collect();
        types.sort();

        for resource_type in types {
            let resource = &endpoint.resources[resource_type];
            let adapter = self.resolve(resource_type, resource)?;

            for (name, related_type) in adapter.relationships() {
                if endpoint.resource(&related_type).is_none() {
                    tracing::warn!(
                        resource_type = %resource_type,
                        relationship = %name,
                        related_type = %related_type,
                        "Relationship points at a resource type that is not configured"
                    );
                }
            }
        }

        tracing::debug!(adapters = self.adapters.len(), "Adapter registry validated");
        Ok(())
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.adapters.keys().collect();
        names.sort();
        f.debug_struct("AdapterRegistry")
            .field("adapters", &names)
            .finish()
    }
}
