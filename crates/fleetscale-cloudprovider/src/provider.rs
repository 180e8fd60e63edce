//! Provider and node group traits.

use std::fmt;
use std::sync::Arc;

use fleetscale_core::{Node, NodeTemplate, Pod};

use crate::error::CloudProviderResult;

/// How a provider finds the node groups it should manage.
///
/// Both fields are passed to the provider unmodified. A provider may use
/// either, both, or neither.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeGroupDiscoveryOptions {
    /// Explicit node groups, `<min>:<max>:<id>`, in order.
    pub node_group_specs: Vec<String>,
    /// Pattern-based discovery definition. Empty when unused.
    pub node_group_auto_discovery_spec: String,
}

/// A cloud provider the autoscaler runs against.
pub trait CloudProvider: Send + Sync + fmt::Debug {
    /// Provider name, as selected in the options.
    fn name(&self) -> &str;

    /// All node groups managed by this provider.
    fn node_groups(&self) -> Vec<Arc<dyn NodeGroup>>;

    /// The node group a node belongs to, or `None` if the node is not
    /// managed by the autoscaler.
    fn node_group_for_node(&self, node: &Node) -> CloudProviderResult<Option<Arc<dyn NodeGroup>>>;

    /// Pricing model, if the provider knows machine prices.
    fn pricing(&self) -> Option<Arc<dyn PricingModel>> {
        None
    }

    /// Called before every reconciliation to refresh cached provider state.
    fn refresh(&self) -> CloudProviderResult<()> {
        Ok(())
    }
}

/// An independently resizable pool of nodes.
pub trait NodeGroup: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    fn min_size(&self) -> usize;

    fn max_size(&self) -> usize;

    /// Desired size of the group. May differ from the number of
    /// registered nodes while machines are being created or removed.
    fn target_size(&self) -> CloudProviderResult<usize>;

    /// Grow the group by `delta` nodes.
    fn increase_size(&self, delta: usize) -> CloudProviderResult<()>;

    /// Shrink the target size without deleting existing nodes. Only
    /// allowed for nodes that have not been created yet.
    fn decrease_target_size(&self, delta: usize) -> CloudProviderResult<()>;

    /// Delete the given nodes and shrink the group accordingly.
    fn delete_nodes(&self, nodes: &[Node]) -> CloudProviderResult<()>;

    /// Provider ids of the group's machines.
    fn nodes(&self) -> CloudProviderResult<Vec<String>>;

    /// Shape of a new node in this group, if known.
    fn template_node_info(&self) -> Option<NodeTemplate>;

    /// One-line description for logs.
    fn debug(&self) -> String {
        format!(
            "{} (min: {}, max: {})",
            self.id(),
            self.min_size(),
            self.max_size()
        )
    }
}

/// Machine and workload prices.
pub trait PricingModel: Send + Sync + fmt::Debug {
    /// Price of running a node shaped like `template` for `hours`.
    fn node_price(&self, template: &NodeTemplate, hours: f64) -> CloudProviderResult<f64>;

    /// Price of running `pod` for `hours`.
    fn pod_price(&self, pod: &Pod, hours: f64) -> CloudProviderResult<f64>;
}
