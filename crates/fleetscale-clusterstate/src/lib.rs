//! fleetscale-clusterstate: tracking the state of the cluster's nodes.
//!
//! The [`ClusterStateRegistry`] compares what the cloud provider believes
//! exists with what registered in the cluster, and decides whether the
//! cluster (and each node group) is healthy enough to autoscale.
//!
//! # Architecture
//!
//! ```text
//! ClusterStateRegistry
//!   ├── shared Arc<dyn CloudProvider> (same instance as the rest of the loop)
//!   ├── ClusterStateRegistryConfig (unready ceilings, fixed at construction)
//!   └── Mutex<RegistryState>
//!       ├── Readiness (total and per node group)
//!       ├── Unregistered nodes (provider machines missing from the cluster)
//!       └── Scale-up requests in flight
//! ```
//!
//! # Health
//!
//! A cluster (or node group) is unhealthy when its unready node count is
//! both above `ok_total_unready_count` and above
//! `max_total_unready_percentage` of its registered nodes.

pub mod error;
pub mod registry;

pub use error::ClusterStateError;
pub use registry::{
    ClusterStateRegistry, ClusterStateRegistryConfig, ClusterStatus, NodeGroupStatus, Readiness,
    ScaleUpRequest, UnregisteredNode,
};
