//! Cluster API client.
//!
//! The context carries a [`ClusterClient`] handle for the control loop to
//! read cluster objects with. [`InMemoryCluster`] serves a fixed snapshot,
//! loaded from JSON:
//!
//! ```json
//! {
//!   "nodes": [{ "name": "n1", "provider_id": "static://pool-a/0", "ready": true }],
//!   "pods":  [{ "namespace": "default", "name": "web-0", "cpu_millis": 500 }]
//! }
//! ```

use std::fmt;
use std::path::Path;
use std::sync::RwLock;

use fleetscale_core::{Node, NodeLister, Pod, StaticNodeLister};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::listers::StaticListerRegistry;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to read snapshot {path}: {reason}")]
    Snapshot { path: String, reason: String },

    #[error("api call failed: {0}")]
    Api(String),
}

/// Read access to the cluster API.
pub trait ClusterClient: Send + Sync + fmt::Debug {
    fn list_nodes(&self) -> Result<Vec<Node>, ClientError>;

    /// Pods in `namespace`, or in every namespace when it is empty.
    fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, ClientError>;
}

/// Serialized cluster contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub pods: Vec<Pod>,
}

/// A cluster that lives in memory.
#[derive(Debug, Default)]
pub struct InMemoryCluster {
    nodes: StaticNodeLister,
    pods: RwLock<Vec<Pod>>,
}

impl InMemoryCluster {
    pub fn new(snapshot: ClusterSnapshot) -> Self {
        Self {
            nodes: StaticNodeLister::new(snapshot.nodes),
            pods: RwLock::new(snapshot.pods),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ClientError> {
        let snapshot_err = |reason: String| ClientError::Snapshot {
            path: path.display().to_string(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| snapshot_err(e.to_string()))?;
        let snapshot: ClusterSnapshot =
            serde_json::from_str(&content).map_err(|e| snapshot_err(e.to_string()))?;
        Ok(Self::new(snapshot))
    }

    /// Listers backed by this cluster's nodes.
    pub fn lister_registry(&self) -> StaticListerRegistry {
        StaticListerRegistry::new(self.nodes.clone())
    }

    pub fn set_nodes(&self, nodes: Vec<Node>) {
        self.nodes.set_nodes(nodes);
    }
}

impl ClusterClient for InMemoryCluster {
    fn list_nodes(&self) -> Result<Vec<Node>, ClientError> {
        self.nodes.list().map_err(|e| ClientError::Api(e.to_string()))
    }

    fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, ClientError> {
        let pods = self.pods.read().unwrap_or_else(|e| e.into_inner());
        Ok(pods
            .iter()
            .filter(|p| namespace.is_empty() || p.namespace == namespace)
            .cloned()
            .collect())
    }
}
