//! Expander strategy interface and the closed set of expander names.

use std::collections::HashMap;
use std::fmt;

use fleetscale_core::{NodeTemplate, Pod};
use thiserror::Error;

/// Errors raised while constructing an expander.
#[derive(Debug, Error)]
pub enum ExpanderError {
    #[error("unknown expander: {name:?} (available: {available})")]
    UnknownExpander { name: String, available: String },

    #[error("expander {name:?} requires pricing, which cloud provider {provider:?} does not offer")]
    PricingUnavailable { name: String, provider: String },
}

/// A way of growing one node group.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionOption {
    pub node_group_id: String,
    /// Nodes to add to the group.
    pub node_count: usize,
    /// Pending pods that would fit on the new nodes.
    pub pods: Vec<Pod>,
    /// Free-form description for logs.
    pub debug: String,
}

impl ExpansionOption {
    pub fn new(node_group_id: &str, node_count: usize, pods: Vec<Pod>) -> Self {
        Self {
            node_group_id: node_group_id.to_string(),
            node_count,
            pods,
            debug: String::new(),
        }
    }
}

/// Picks the node group to grow.
pub trait Strategy: Send + Sync + fmt::Debug {
    /// Name the strategy was selected by.
    fn name(&self) -> &'static str;

    /// Choose among `options`. `node_infos` maps node group id to the
    /// template of a new node in that group.
    ///
    /// Returns `None` only when `options` is empty.
    fn best_option(
        &self,
        options: &[ExpansionOption],
        node_infos: &HashMap<String, NodeTemplate>,
    ) -> Option<ExpansionOption>;
}

/// Built-in expanders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpanderKind {
    Random,
    MostPods,
    LeastWaste,
    Price,
}

impl ExpanderKind {
    pub const ALL: [ExpanderKind; 4] = [
        ExpanderKind::Random,
        ExpanderKind::MostPods,
        ExpanderKind::LeastWaste,
        ExpanderKind::Price,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpanderKind::Random => "random",
            ExpanderKind::MostPods => "most-pods",
            ExpanderKind::LeastWaste => "least-waste",
            ExpanderKind::Price => "price",
        }
    }

    /// Look up an expander by name.
    pub fn parse(name: &str) -> Result<Self, ExpanderError> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == name)
            .ok_or_else(|| ExpanderError::UnknownExpander {
                name: name.to_string(),
                available: Self::available(),
            })
    }

    /// Comma-separated list of valid names.
    pub fn available() -> String {
        Self::ALL
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ExpanderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
