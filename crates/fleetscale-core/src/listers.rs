//! Listers: read access to cluster objects.
//!
//! Subsystems hold a lister instead of a client so the source of the
//! objects (API watch cache, snapshot file, test fixture) stays swappable.

use std::fmt;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::types::Node;

#[derive(Debug, Error)]
pub enum ListerError {
    #[error("listing {kind} failed: {reason}")]
    List { kind: &'static str, reason: String },
}

/// Lists nodes.
pub trait NodeLister: Send + Sync + fmt::Debug {
    fn list(&self) -> Result<Vec<Node>, ListerError>;
}

/// Node lister over a shared, replaceable set of nodes.
#[derive(Debug, Clone, Default)]
pub struct StaticNodeLister {
    nodes: Arc<RwLock<Vec<Node>>>,
    ready_only: bool,
}

impl StaticNodeLister {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes: Arc::new(RwLock::new(nodes)),
            ready_only: false,
        }
    }

    /// A lister over the same nodes that only returns ready ones.
    pub fn ready(&self) -> Self {
        Self {
            nodes: Arc::clone(&self.nodes),
            ready_only: true,
        }
    }

    /// Replace the node set seen by this lister and every lister
    /// derived from it.
    pub fn set_nodes(&self, nodes: Vec<Node>) {
        *self.nodes.write().unwrap_or_else(|e| e.into_inner()) = nodes;
    }
}

impl NodeLister for StaticNodeLister {
    fn list(&self) -> Result<Vec<Node>, ListerError> {
        let nodes = self.nodes.read().unwrap_or_else(|e| e.into_inner());
        Ok(nodes
            .iter()
            .filter(|n| !self.ready_only || n.ready)
            .cloned()
            .collect())
    }
}
