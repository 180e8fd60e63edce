//! Static cloud provider: node groups declared in a TOML cloud config.
//!
//! Machines are tracked in memory. Growing a group raises its target size;
//! the missing machines (`static://<group>/<n>`) are created on the next
//! [`CloudProvider::refresh`]. Nothing is created outside the process.
//! Useful for local runs, dry runs, and tests.
//!
//! ```toml
//! [pricing]
//! cpu_core_hour = 0.033
//! memory_gib_hour = 0.0045
//!
//! [[node_group]]
//! id = "pool-a"
//! min_size = 1
//! max_size = 10
//! target_size = 2
//! cpu_millis = 4000
//! memory_bytes = 17179869184
//! labels = { pool = "a" }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Deserialize;
use tracing::{debug, info, warn};

use fleetscale_core::{Node, NodeTemplate, Pod};

use crate::error::{CloudProviderError, CloudProviderResult};
use crate::provider::{CloudProvider, NodeGroup, NodeGroupDiscoveryOptions, PricingModel};
use crate::spec::{AutoDiscoverySpec, NodeGroupSpec};

/// Name the static provider is registered under.
pub const PROVIDER_NAME: &str = "static";

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Parsed cloud config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaticCloudConfig {
    #[serde(default)]
    pub pricing: Option<StaticPricing>,
    #[serde(default)]
    pub node_group: Vec<NodeGroupConfig>,
}

/// A node group declared in the cloud config.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeGroupConfig {
    pub id: String,
    pub min_size: usize,
    pub max_size: usize,
    pub target_size: Option<usize>,
    pub cpu_millis: Option<u64>,
    pub memory_bytes: Option<u64>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl NodeGroupConfig {
    fn template(&self) -> Option<NodeTemplate> {
        match (self.cpu_millis, self.memory_bytes) {
            (Some(cpu_millis), Some(memory_bytes)) => Some(NodeTemplate {
                cpu_millis,
                memory_bytes,
                labels: self.labels.clone(),
            }),
            _ => None,
        }
    }
}

/// Linear resource pricing.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct StaticPricing {
    /// Price of one CPU core for one hour.
    pub cpu_core_hour: f64,
    /// Price of one GiB of memory for one hour.
    pub memory_gib_hour: f64,
}

impl StaticPricing {
    fn price(&self, cpu_millis: u64, memory_bytes: u64, hours: f64) -> f64 {
        let cores = cpu_millis as f64 / 1000.0;
        let gib = memory_bytes as f64 / GIB;
        (cores * self.cpu_core_hour + gib * self.memory_gib_hour) * hours
    }
}

impl PricingModel for StaticPricing {
    fn node_price(&self, template: &NodeTemplate, hours: f64) -> CloudProviderResult<f64> {
        Ok(self.price(template.cpu_millis, template.memory_bytes, hours))
    }

    fn pod_price(&self, pod: &Pod, hours: f64) -> CloudProviderResult<f64> {
        Ok(self.price(pod.cpu_millis, pod.memory_bytes, hours))
    }
}

impl StaticCloudConfig {
    pub fn from_file(path: &Path) -> CloudProviderResult<Self> {
        let config_err = |reason: String| CloudProviderError::Config {
            path: path.display().to_string(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
        let config: StaticCloudConfig =
            toml::from_str(&content).map_err(|e| config_err(e.to_string()))?;
        Ok(config)
    }
}

/// In-memory machine bookkeeping for one group.
#[derive(Debug)]
struct GroupState {
    /// Desired size. Never below `machines.len()`.
    target: usize,
    /// Created machines.
    machines: Vec<String>,
    next_index: usize,
}

/// A node group of the static provider.
#[derive(Debug)]
pub struct StaticNodeGroup {
    id: String,
    min_size: usize,
    max_size: usize,
    template: Option<NodeTemplate>,
    state: Mutex<GroupState>,
}

impl StaticNodeGroup {
    fn new(
        id: &str,
        min_size: usize,
        max_size: usize,
        target_size: usize,
        template: Option<NodeTemplate>,
    ) -> Self {
        let target = target_size.clamp(min_size, max_size);
        let group = Self {
            id: id.to_string(),
            min_size,
            max_size,
            template,
            state: Mutex::new(GroupState {
                target,
                machines: Vec::with_capacity(target),
                next_index: 0,
            }),
        };
        group.lock().provision(&group.id);
        group
    }

    fn lock(&self) -> MutexGuard<'_, GroupState> {
        // A panic while holding the lock cannot leave GroupState half-updated.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn size_violation(&self, reason: String) -> CloudProviderError {
        CloudProviderError::SizeViolation {
            group: self.id.clone(),
            reason,
        }
    }
}

impl GroupState {
    /// Create machines until the group reaches its target. Returns how
    /// many were created.
    fn provision(&mut self, group_id: &str) -> usize {
        let missing = self.target.saturating_sub(self.machines.len());
        for _ in 0..missing {
            self.machines
                .push(format!("{PROVIDER_NAME}://{group_id}/{}", self.next_index));
            self.next_index += 1;
        }
        missing
    }
}

impl NodeGroup for StaticNodeGroup {
    fn id(&self) -> &str {
        &self.id
    }

    fn min_size(&self) -> usize {
        self.min_size
    }

    fn max_size(&self) -> usize {
        self.max_size
    }

    fn target_size(&self) -> CloudProviderResult<usize> {
        Ok(self.lock().target)
    }

    fn increase_size(&self, delta: usize) -> CloudProviderResult<()> {
        if delta == 0 {
            return Err(self.size_violation("size increase must be positive".to_string()));
        }
        let mut state = self.lock();
        let current = state.target;
        let desired = current
            .checked_add(delta)
            .filter(|n| *n <= self.max_size)
            .ok_or_else(|| {
                self.size_violation(format!(
                    "size increase too large: current {current} delta {delta} max {}",
                    self.max_size
                ))
            })?;
        state.target = desired;
        info!(node_group = %self.id, from = current, to = desired, "node group increased");
        Ok(())
    }

    fn decrease_target_size(&self, delta: usize) -> CloudProviderResult<()> {
        if delta == 0 {
            return Err(self.size_violation("size decrease must be positive".to_string()));
        }
        let mut state = self.lock();
        let current = state.target;
        let created = state.machines.len();
        let desired = current.checked_sub(delta).ok_or_else(|| {
            self.size_violation(format!(
                "size decrease too large: current {current} delta {delta}"
            ))
        })?;
        if desired < created {
            return Err(self.size_violation(format!(
                "attempt to delete existing nodes: target {desired} below {created} created \
                 machines"
            )));
        }
        if desired < self.min_size {
            return Err(self.size_violation(format!(
                "size decrease too large: desired {desired} min {}",
                self.min_size
            )));
        }
        state.target = desired;
        info!(node_group = %self.id, from = current, to = desired, "node group target decreased");
        Ok(())
    }

    fn delete_nodes(&self, nodes: &[Node]) -> CloudProviderResult<()> {
        let mut state = self.lock();
        if state.target < nodes.len().saturating_add(self.min_size) {
            return Err(self.size_violation(format!(
                "deleting {} nodes would go below min size {}",
                nodes.len(),
                self.min_size
            )));
        }
        if let Some(foreign) = nodes
            .iter()
            .find(|n| !state.machines.contains(&n.provider_id))
        {
            return Err(CloudProviderError::ForeignNode {
                node: foreign.name.clone(),
                group: self.id.clone(),
            });
        }
        let before = state.machines.len();
        state
            .machines
            .retain(|m| !nodes.iter().any(|n| &n.provider_id == m));
        let deleted = before - state.machines.len();
        state.target -= deleted;
        info!(node_group = %self.id, deleted, "nodes deleted");
        Ok(())
    }

    fn nodes(&self) -> CloudProviderResult<Vec<String>> {
        Ok(self.lock().machines.clone())
    }

    fn template_node_info(&self) -> Option<NodeTemplate> {
        self.template.clone()
    }
}

/// Cloud provider over statically declared node groups.
#[derive(Debug)]
pub struct StaticCloudProvider {
    groups: Vec<Arc<StaticNodeGroup>>,
    pricing: Option<Arc<StaticPricing>>,
}

impl StaticCloudProvider {
    /// Build the provider from a cloud config path (empty for none) and
    /// discovery options.
    ///
    /// Explicit specs take precedence over auto-discovered groups with
    /// the same id.
    pub fn build(
        cloud_config: &str,
        discovery: &NodeGroupDiscoveryOptions,
    ) -> CloudProviderResult<Self> {
        let config = if cloud_config.is_empty() {
            StaticCloudConfig::default()
        } else {
            StaticCloudConfig::from_file(Path::new(cloud_config))?
        };
        Self::from_config(config, discovery)
    }

    pub fn from_config(
        config: StaticCloudConfig,
        discovery: &NodeGroupDiscoveryOptions,
    ) -> CloudProviderResult<Self> {
        let declared: HashMap<&str, &NodeGroupConfig> =
            config.node_group.iter().map(|g| (g.id.as_str(), g)).collect();
        let mut groups: Vec<Arc<StaticNodeGroup>> = Vec::new();

        for raw in &discovery.node_group_specs {
            let spec = NodeGroupSpec::parse(raw)?;
            if groups.iter().any(|g| g.id == spec.id) {
                warn!(node_group = %spec.id, "duplicate node group spec ignored");
                continue;
            }
            let group = match declared.get(spec.id.as_str()) {
                Some(decl) => StaticNodeGroup::new(
                    &spec.id,
                    spec.min_size,
                    spec.max_size,
                    decl.target_size.unwrap_or(spec.min_size),
                    decl.template(),
                ),
                None => StaticNodeGroup::new(
                    &spec.id,
                    spec.min_size,
                    spec.max_size,
                    spec.min_size,
                    None,
                ),
            };
            debug!(node_group = %group.debug(), "node group from explicit spec");
            groups.push(Arc::new(group));
        }

        if !discovery.node_group_auto_discovery_spec.is_empty() {
            let spec = AutoDiscoverySpec::parse(&discovery.node_group_auto_discovery_spec)?;
            if spec.provider != PROVIDER_NAME {
                return Err(CloudProviderError::InvalidAutoDiscoverySpec {
                    spec: discovery.node_group_auto_discovery_spec.clone(),
                    reason: format!("addressed to provider {:?}", spec.provider),
                });
            }
            for decl in config.node_group.iter().filter(|g| spec.matches(&g.id)) {
                if groups.iter().any(|g| g.id == decl.id) {
                    continue;
                }
                if decl.max_size == 0 || decl.min_size > decl.max_size {
                    return Err(CloudProviderError::Config {
                        path: String::new(),
                        reason: format!(
                            "node group {} has invalid bounds {}..{}",
                            decl.id, decl.min_size, decl.max_size
                        ),
                    });
                }
                let group = StaticNodeGroup::new(
                    &decl.id,
                    decl.min_size,
                    decl.max_size,
                    decl.target_size.unwrap_or(decl.min_size),
                    decl.template(),
                );
                debug!(node_group = %group.debug(), "node group auto-discovered");
                groups.push(Arc::new(group));
            }
        }

        if groups.is_empty() {
            warn!("static provider has no node groups to manage");
        }

        Ok(Self {
            groups,
            pricing: config.pricing.map(Arc::new),
        })
    }
}

impl CloudProvider for StaticCloudProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn node_groups(&self) -> Vec<Arc<dyn NodeGroup>> {
        self.groups
            .iter()
            .map(|g| Arc::clone(g) as Arc<dyn NodeGroup>)
            .collect()
    }

    fn node_group_for_node(&self, node: &Node) -> CloudProviderResult<Option<Arc<dyn NodeGroup>>> {
        if node.provider_id.is_empty() {
            return Ok(None);
        }
        for group in &self.groups {
            if group.lock().machines.contains(&node.provider_id) {
                return Ok(Some(Arc::clone(group) as Arc<dyn NodeGroup>));
            }
        }
        Ok(None)
    }

    fn pricing(&self) -> Option<Arc<dyn PricingModel>> {
        self.pricing
            .as_ref()
            .map(|p| Arc::clone(p) as Arc<dyn PricingModel>)
    }

    /// Create the machines every group is missing to reach its target.
    fn refresh(&self) -> CloudProviderResult<()> {
        for group in &self.groups {
            let created = group.lock().provision(&group.id);
            if created > 0 {
                debug!(node_group = %group.id, created, "machines created");
            }
        }
        Ok(())
    }
}
