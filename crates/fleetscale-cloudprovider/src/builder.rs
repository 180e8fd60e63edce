//! Cloud provider builder.
//!
//! Providers are selected by name at startup. The [`ProviderRegistry`]
//! maps names to constructors; [`CloudProviderBuilder`] looks the
//! configured name up and runs its constructor exactly once.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{CloudProviderError, CloudProviderResult};
use crate::provider::{CloudProvider, NodeGroupDiscoveryOptions};
use crate::static_provider::{self, StaticCloudProvider};

/// Everything a provider constructor gets to work with.
#[derive(Debug, Clone, Copy)]
pub struct ProviderBuildContext<'a> {
    pub provider_name: &'a str,
    /// Path to the provider config file. Empty for none.
    pub cloud_config: &'a str,
    pub discovery: &'a NodeGroupDiscoveryOptions,
}

/// Constructor registered for a provider name.
pub type ProviderConstructor = Arc<
    dyn Fn(&ProviderBuildContext<'_>) -> CloudProviderResult<Arc<dyn CloudProvider>> + Send + Sync,
>;

/// Name → constructor table for cloud providers.
#[derive(Clone)]
pub struct ProviderRegistry {
    constructors: BTreeMap<String, ProviderConstructor>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// A registry holding the built-in providers.
    pub fn with_defaults() -> Self {
        Self::empty().with_provider(static_provider::PROVIDER_NAME, Arc::new(build_static))
    }

    /// Register (or replace) the constructor for `name`.
    pub fn with_provider(mut self, name: &str, constructor: ProviderConstructor) -> Self {
        self.constructors.insert(name.to_string(), constructor);
        self
    }

    /// Registered provider names, sorted.
    pub fn available_providers(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }
}

fn build_static(ctx: &ProviderBuildContext<'_>) -> CloudProviderResult<Arc<dyn CloudProvider>> {
    let provider = StaticCloudProvider::build(ctx.cloud_config, ctx.discovery)?;
    Ok(Arc::new(provider))
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available_providers())
            .finish()
    }
}

/// Builds the configured cloud provider.
#[derive(Debug, Clone)]
pub struct CloudProviderBuilder {
    provider_name: String,
    cloud_config: String,
    registry: ProviderRegistry,
}

impl CloudProviderBuilder {
    /// Create a builder over the built-in providers.
    pub fn new(provider_name: &str, cloud_config: &str) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            cloud_config: cloud_config.to_string(),
            registry: ProviderRegistry::with_defaults(),
        }
    }

    /// Use a custom provider registry.
    pub fn with_registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Construct the provider.
    ///
    /// Each call runs the constructor again and returns a fresh,
    /// independent instance.
    pub fn build(
        &self,
        discovery: NodeGroupDiscoveryOptions,
    ) -> CloudProviderResult<Arc<dyn CloudProvider>> {
        let constructor = self
            .registry
            .constructors
            .get(&self.provider_name)
            .ok_or_else(|| CloudProviderError::UnknownProvider(self.provider_name.clone()))?;

        debug!(
            provider = %self.provider_name,
            cloud_config = %self.cloud_config,
            specs = discovery.node_group_specs.len(),
            auto_discovery = %discovery.node_group_auto_discovery_spec,
            "building cloud provider"
        );

        let ctx = ProviderBuildContext {
            provider_name: &self.provider_name,
            cloud_config: &self.cloud_config,
            discovery: &discovery,
        };
        let provider = constructor(&ctx)?;

        info!(
            provider = %self.provider_name,
            node_groups = provider.node_groups().len(),
            "cloud provider built"
        );
        Ok(provider)
    }
}
