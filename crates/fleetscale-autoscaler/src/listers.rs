//! Lister registry: the listers handed to subsystems.

use std::fmt;
use std::sync::Arc;

use fleetscale_core::{NodeLister, StaticNodeLister};

/// Access to the node listers of one cluster.
pub trait ListerRegistry: Send + Sync + fmt::Debug {
    /// Every node, ready or not.
    fn all_node_lister(&self) -> Arc<dyn NodeLister>;

    /// Ready nodes only.
    fn ready_node_lister(&self) -> Arc<dyn NodeLister>;
}

/// Registry over an in-memory node set.
#[derive(Debug, Clone, Default)]
pub struct StaticListerRegistry {
    all: StaticNodeLister,
}

impl StaticListerRegistry {
    pub fn new(all: StaticNodeLister) -> Self {
        Self { all }
    }
}

impl ListerRegistry for StaticListerRegistry {
    fn all_node_lister(&self) -> Arc<dyn NodeLister> {
        Arc::new(self.all.clone())
    }

    fn ready_node_lister(&self) -> Arc<dyn NodeLister> {
        Arc::new(self.all.ready())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetscale_core::Node;

    #[test]
    fn listers_share_nodes() {
        let mut unready = Node::new("n2", "p2");
        unready.ready = false;
        let registry = StaticListerRegistry::new(StaticNodeLister::new(vec![
            Node::new("n1", "p1"),
            unready,
        ]));

        assert_eq!(registry.all_node_lister().list().unwrap().len(), 2);
        assert_eq!(registry.ready_node_lister().list().unwrap().len(), 1);
    }
}
