//! Shared types used across fleetscale crates.
//!
//! These mirror the small slice of cluster objects the autoscaler needs:
//! registered nodes, pending pods, and the template a node group would
//! produce when it grows.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A node registered in the cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    /// Identifier of the backing machine at the cloud provider
    /// (e.g. `static://pool-a/2`). Empty when not yet known.
    #[serde(default)]
    pub provider_id: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub ready: bool,
    /// Allocatable CPU in millicores.
    #[serde(default)]
    pub cpu_millis: u64,
    /// Allocatable memory in bytes.
    #[serde(default)]
    pub memory_bytes: u64,
    /// Unix timestamp (seconds) when the node object was created.
    #[serde(default)]
    pub created_at: u64,
}

impl Node {
    pub fn new(name: &str, provider_id: &str) -> Self {
        Self {
            name: name.to_string(),
            provider_id: provider_id.to_string(),
            labels: HashMap::new(),
            ready: true,
            cpu_millis: 0,
            memory_bytes: 0,
            created_at: 0,
        }
    }
}

/// A workload unit waiting to be scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pod {
    pub namespace: String,
    pub name: String,
    /// Requested CPU in millicores.
    #[serde(default)]
    pub cpu_millis: u64,
    /// Requested memory in bytes.
    #[serde(default)]
    pub memory_bytes: u64,
    /// Labels a node must carry for this pod to land on it.
    #[serde(default)]
    pub node_selector: HashMap<String, String>,
}

impl Pod {
    pub fn new(namespace: &str, name: &str, cpu_millis: u64, memory_bytes: u64) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            cpu_millis,
            memory_bytes,
            node_selector: HashMap::new(),
        }
    }

    /// `namespace/name`, the key used in logs and events.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Shape of a node that a node group would add when scaled up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NodeTemplate {
    pub cpu_millis: u64,
    pub memory_bytes: u64,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}
