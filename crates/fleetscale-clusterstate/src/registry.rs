//! Cluster state registry: readiness and provisioning bookkeeping.
//!
//! Construction only stores the provider and config; nothing is read
//! from the provider until the first `update_nodes()` call.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{debug, info, warn};

use fleetscale_cloudprovider::CloudProvider;
use fleetscale_core::Node;

use crate::error::ClusterStateError;

/// Latest scale-up deadline, relative to the request time.
pub const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Unready ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterStateRegistryConfig {
    /// Fraction (0.0–1.0) of unready nodes above which the cluster is unhealthy.
    pub max_total_unready_percentage: f64,
    /// Unready nodes tolerated regardless of the percentage.
    pub ok_total_unready_count: usize,
}

/// Node counts for the whole cluster or one node group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub ready: usize,
    pub unready: usize,
    /// Registered nodes (`ready + unready`).
    pub registered: usize,
    /// Provider machines that never registered in the cluster.
    pub unregistered: usize,
}

impl Readiness {
    fn add_registered(&mut self, ready: bool) {
        self.registered += 1;
        if ready {
            self.ready += 1;
        } else {
            self.unready += 1;
        }
    }
}

/// A scale up that has been requested but not yet fulfilled.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleUpRequest {
    pub node_group_id: String,
    /// Nodes added by the request.
    pub increase: usize,
    pub time: SystemTime,
    /// Deadline for the new nodes to register.
    pub expected_add_time: SystemTime,
}

/// A provider machine that has no matching registered node.
#[derive(Debug, Clone, PartialEq)]
pub struct UnregisteredNode {
    pub provider_id: String,
    pub node_group_id: String,
    pub unregistered_since: SystemTime,
}

/// Per node group summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeGroupStatus {
    pub id: String,
    pub healthy: bool,
    pub scaling_up: bool,
    pub readiness: Readiness,
}

/// Snapshot of the registry, suitable for writing to a status object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterStatus {
    pub healthy: bool,
    pub readiness: Readiness,
    pub node_groups: Vec<NodeGroupStatus>,
    /// Unix timestamp (seconds) of the last `update_nodes()` call.
    pub last_update: Option<u64>,
}

#[derive(Debug, Default)]
struct RegistryState {
    total: Readiness,
    per_node_group: HashMap<String, Readiness>,
    unregistered: HashMap<String, UnregisteredNode>,
    scale_ups: HashMap<String, ScaleUpRequest>,
    last_update: Option<SystemTime>,
}

/// Tracks registered versus provisioned nodes and their readiness.
///
/// Shared behind an `Arc`; all bookkeeping is synchronized internally.
#[derive(Debug)]
pub struct ClusterStateRegistry {
    cloud_provider: Arc<dyn CloudProvider>,
    config: ClusterStateRegistryConfig,
    state: Mutex<RegistryState>,
}

impl ClusterStateRegistry {
    pub fn new(cloud_provider: Arc<dyn CloudProvider>, config: ClusterStateRegistryConfig) -> Self {
        debug!(
            provider = %cloud_provider.name(),
            max_total_unready_percentage = config.max_total_unready_percentage,
            ok_total_unready_count = config.ok_total_unready_count,
            "cluster state registry created"
        );
        Self {
            cloud_provider,
            config,
            state: Mutex::new(RegistryState::default()),
        }
    }

    pub fn config(&self) -> &ClusterStateRegistryConfig {
        &self.config
    }

    pub fn cloud_provider(&self) -> &Arc<dyn CloudProvider> {
        &self.cloud_provider
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a scale up of `node_group_id` by `increase` nodes.
    ///
    /// Requests for the same group accumulate; the deadline moves to
    /// `now + max_node_provision_time`, capped at [`FAR_FUTURE`] when
    /// that is not representable.
    pub fn register_scale_up(
        &self,
        node_group_id: &str,
        increase: usize,
        now: SystemTime,
        max_node_provision_time: Duration,
    ) {
        let expected_add_time = now
            .checked_add(max_node_provision_time)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        let mut state = self.lock();
        let request = state
            .scale_ups
            .entry(node_group_id.to_string())
            .or_insert_with(|| ScaleUpRequest {
                node_group_id: node_group_id.to_string(),
                increase: 0,
                time: now,
                expected_add_time,
            });
        request.increase += increase;
        request.time = now;
        request.expected_add_time = expected_add_time;
        info!(
            node_group = %node_group_id,
            increase,
            total = request.increase,
            "scale up registered"
        );
    }

    /// Recompute readiness from the registered `nodes` and the provider's
    /// view of each node group.
    pub fn update_nodes(&self, nodes: &[Node], now: SystemTime) -> Result<(), ClusterStateError> {
        let groups = self.cloud_provider.node_groups();

        let mut total = Readiness::default();
        let mut per_node_group: HashMap<String, Readiness> = groups
            .iter()
            .map(|g| (g.id().to_string(), Readiness::default()))
            .collect();

        for node in nodes {
            total.add_registered(node.ready);
            if let Some(group) = self.cloud_provider.node_group_for_node(node)? {
                per_node_group
                    .entry(group.id().to_string())
                    .or_default()
                    .add_registered(node.ready);
            }
        }

        let registered: HashSet<&str> = nodes
            .iter()
            .filter(|n| !n.provider_id.is_empty())
            .map(|n| n.provider_id.as_str())
            .collect();

        // Machine lists and target sizes are read before taking the lock.
        let mut machines: Vec<(String, String)> = Vec::new();
        let mut target_sizes: HashMap<String, usize> = HashMap::new();
        for group in &groups {
            for provider_id in group.nodes()? {
                if !registered.contains(provider_id.as_str()) {
                    machines.push((provider_id, group.id().to_string()));
                }
            }
            target_sizes.insert(group.id().to_string(), group.target_size()?);
        }

        let mut state = self.lock();

        let mut unregistered = HashMap::with_capacity(machines.len());
        for (provider_id, node_group_id) in machines {
            let since = state
                .unregistered
                .get(&provider_id)
                .map(|u| u.unregistered_since)
                .unwrap_or(now);
            total.unregistered += 1;
            per_node_group.entry(node_group_id.clone()).or_default().unregistered += 1;
            unregistered.insert(
                provider_id.clone(),
                UnregisteredNode {
                    provider_id,
                    node_group_id,
                    unregistered_since: since,
                },
            );
        }

        state.scale_ups.retain(|id, request| {
            let registered = per_node_group.get(id).map(|r| r.registered).unwrap_or(0);
            let target = target_sizes.get(id).copied().unwrap_or(0);
            if registered >= target {
                info!(node_group = %id, target, "scale up fulfilled");
                false
            } else if now > request.expected_add_time {
                warn!(
                    node_group = %id,
                    registered,
                    target,
                    "scale up timed out, nodes did not register in time"
                );
                false
            } else {
                true
            }
        });

        debug!(
            ready = total.ready,
            unready = total.unready,
            unregistered = total.unregistered,
            "cluster state updated"
        );

        state.total = total;
        state.per_node_group = per_node_group;
        state.unregistered = unregistered;
        state.last_update = Some(now);
        Ok(())
    }

    fn is_healthy(&self, readiness: &Readiness) -> bool {
        let unready = readiness.unready;
        let limit = self.config.max_total_unready_percentage * readiness.registered as f64;
        !(unready > self.config.ok_total_unready_count && unready as f64 > limit)
    }

    /// Whether the cluster as a whole is healthy enough to autoscale.
    pub fn is_cluster_healthy(&self) -> bool {
        let total = self.lock().total;
        let healthy = self.is_healthy(&total);
        if !healthy {
            warn!(
                ready = total.ready,
                unready = total.unready,
                "cluster is unhealthy, too many unready nodes"
            );
        }
        healthy
    }

    /// Whether a node group is healthy. Unknown groups are unhealthy.
    pub fn is_node_group_healthy(&self, node_group_id: &str) -> bool {
        match self.lock().per_node_group.get(node_group_id) {
            Some(readiness) => self.is_healthy(readiness),
            None => {
                warn!(node_group = %node_group_id, "no readiness information for node group");
                false
            }
        }
    }

    pub fn is_node_group_scaling_up(&self, node_group_id: &str) -> bool {
        self.lock().scale_ups.contains_key(node_group_id)
    }

    pub fn total_readiness(&self) -> Readiness {
        self.lock().total
    }

    pub fn node_group_readiness(&self, node_group_id: &str) -> Option<Readiness> {
        self.lock().per_node_group.get(node_group_id).copied()
    }

    pub fn scale_up_requests(&self) -> Vec<ScaleUpRequest> {
        self.lock().scale_ups.values().cloned().collect()
    }

    pub fn unregistered_nodes(&self) -> Vec<UnregisteredNode> {
        self.lock().unregistered.values().cloned().collect()
    }

    /// Unregistered nodes that have been missing for longer than `threshold`.
    pub fn long_unregistered_nodes(
        &self,
        threshold: Duration,
        now: SystemTime,
    ) -> Vec<UnregisteredNode> {
        self.lock()
            .unregistered
            .values()
            .filter(|u| now.duration_since(u.unregistered_since).unwrap_or_default() > threshold)
            .cloned()
            .collect()
    }

    pub fn last_update(&self) -> Option<SystemTime> {
        self.lock().last_update
    }

    /// Summary of the current state.
    pub fn status(&self) -> ClusterStatus {
        let state = self.lock();
        let mut node_groups: Vec<NodeGroupStatus> = state
            .per_node_group
            .iter()
            .map(|(id, readiness)| NodeGroupStatus {
                id: id.clone(),
                healthy: self.is_healthy(readiness),
                scaling_up: state.scale_ups.contains_key(id),
                readiness: *readiness,
            })
            .collect();
        node_groups.sort_by(|a, b| a.id.cmp(&b.id));

        ClusterStatus {
            healthy: self.is_healthy(&state.total),
            readiness: state.total,
            node_groups,
            last_update: state.last_update.map(|t| {
                t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
            }),
        }
    }
}
