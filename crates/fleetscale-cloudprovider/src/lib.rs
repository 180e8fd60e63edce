//! fleetscale-cloudprovider: the cloud provider abstraction.
//!
//! The autoscaler never talks to a cloud API directly. It goes through a
//! [`CloudProvider`], which exposes the managed [`NodeGroup`]s and lets
//! the control loop resize them.
//!
//! # Architecture
//!
//! ```text
//! CloudProviderBuilder (name → constructor registry)
//!   ├── "static"  → StaticCloudProvider (TOML cloud config, in-memory sizes)
//!   └── register()  → any other provider, without touching callers
//!
//! NodeGroupDiscoveryOptions
//!   ├── node_group_specs             ["1:10:pool-a", ...]
//!   └── node_group_auto_discovery_spec  "static:name=^pool-"
//! ```
//!
//! Providers are handed out as `Arc<dyn CloudProvider>` so every
//! subsystem can share the same instance.

pub mod builder;
pub mod error;
pub mod provider;
pub mod spec;
pub mod static_provider;

pub use builder::{
    CloudProviderBuilder, ProviderBuildContext, ProviderConstructor, ProviderRegistry,
};
pub use error::{CloudProviderError, CloudProviderResult};
pub use provider::{CloudProvider, NodeGroup, NodeGroupDiscoveryOptions, PricingModel};
pub use spec::{AutoDiscoverySpec, NodeGroupSpec};
pub use static_provider::StaticCloudProvider;
