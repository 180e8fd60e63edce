//! The bundle of collaborators every reconciliation pass works with.
//!
//! Built once by [`new_autoscaling_context`] right after the options are
//! loaded, then shared read-only (`Arc<AutoscalingContext>`) for the life
//! of the process.

use std::ops::Deref;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use fleetscale_cloudprovider::{
    CloudProvider, CloudProviderBuilder, NodeGroupDiscoveryOptions, ProviderRegistry,
};
use fleetscale_clusterstate::{ClusterStateRegistry, ClusterStateRegistryConfig};
use fleetscale_core::AutoscalingOptions;
use fleetscale_expander::{Strategy, expander_strategy_from_name};

use crate::client::ClusterClient;
use crate::error::AutoscalerError;
use crate::events::{EventRecorder, LogEventRecorder};
use crate::listers::ListerRegistry;
use crate::predicates::PredicateChecker;

/// Configuration and long-lived collaborators passed to scale up and
/// scale down.
#[derive(Debug)]
pub struct AutoscalingContext {
    /// Options to customize how autoscaling works.
    pub options: AutoscalingOptions,
    /// Cloud provider shared by every subsystem.
    pub cloud_provider: Arc<dyn CloudProvider>,
    /// Cluster API client.
    pub client: Arc<dyn ClusterClient>,
    /// Readiness and provisioning state of the cluster's nodes.
    pub cluster_state_registry: Arc<ClusterStateRegistry>,
    /// Recorder for cluster events.
    pub recorder: Arc<dyn EventRecorder>,
    /// Checks whether a pod fits on a node.
    pub predicate_checker: Arc<dyn PredicateChecker>,
    /// Chooses the node group to grow on scale up.
    pub expander_strategy: Arc<dyn Strategy>,
    /// Collects log messages to expose as events on the status object.
    pub log_recorder: Arc<LogEventRecorder>,
}

impl Deref for AutoscalingContext {
    type Target = AutoscalingOptions;

    fn deref(&self) -> &AutoscalingOptions {
        &self.options
    }
}

/// Build the autoscaling context against the built-in cloud providers.
///
/// See [`new_autoscaling_context_with_providers`].
pub fn new_autoscaling_context(
    options: AutoscalingOptions,
    predicate_checker: Arc<dyn PredicateChecker>,
    client: Arc<dyn ClusterClient>,
    event_recorder: Arc<dyn EventRecorder>,
    log_recorder: Arc<LogEventRecorder>,
    lister_registry: &dyn ListerRegistry,
) -> Result<AutoscalingContext, AutoscalerError> {
    new_autoscaling_context_with_providers(
        &ProviderRegistry::with_defaults(),
        options,
        predicate_checker,
        client,
        event_recorder,
        log_recorder,
        lister_registry,
    )
}

/// Build the autoscaling context, looking the cloud provider up in
/// `providers`.
///
/// Steps, in order:
/// 1. build the cloud provider from the options' provider name, cloud
///    config, and node group discovery options;
/// 2. build the expander strategy on that provider and the all-node lister;
/// 3. build the cluster state registry on that provider;
/// 4. bundle everything with the caller's collaborators.
///
/// Options are taken as already validated. Each call builds new,
/// independent subsystems.
pub fn new_autoscaling_context_with_providers(
    providers: &ProviderRegistry,
    options: AutoscalingOptions,
    predicate_checker: Arc<dyn PredicateChecker>,
    client: Arc<dyn ClusterClient>,
    event_recorder: Arc<dyn EventRecorder>,
    log_recorder: Arc<LogEventRecorder>,
    lister_registry: &dyn ListerRegistry,
) -> Result<AutoscalingContext, AutoscalerError> {
    let cloud_provider =
        CloudProviderBuilder::new(&options.cloud_provider_name, &options.cloud_config)
            .with_registry(providers.clone())
            .build(NodeGroupDiscoveryOptions {
                node_group_specs: options.node_groups.clone(),
                node_group_auto_discovery_spec: options.node_group_auto_discovery.clone(),
            })
            .map_err(|source| AutoscalerError::CloudProvider {
                provider: options.cloud_provider_name.clone(),
                source,
            })?;

    let expander_strategy = expander_strategy_from_name(
        &options.expander_name,
        Arc::clone(&cloud_provider),
        lister_registry.all_node_lister(),
    )
    .map_err(|source| AutoscalerError::Expander {
        expander: options.expander_name.clone(),
        source,
    })?;

    let cluster_state_config = ClusterStateRegistryConfig {
        max_total_unready_percentage: options.max_total_unready_percentage,
        ok_total_unready_count: options.ok_total_unready_count,
    };
    let cluster_state_registry = Arc::new(ClusterStateRegistry::new(
        Arc::clone(&cloud_provider),
        cluster_state_config,
    ));

    info!(
        provider = %cloud_provider.name(),
        node_groups = cloud_provider.node_groups().len(),
        expander = %expander_strategy.name(),
        "autoscaling context assembled"
    );

    Ok(AutoscalingContext {
        options,
        cloud_provider,
        client,
        cluster_state_registry,
        recorder: event_recorder,
        predicate_checker,
        expander_strategy,
        log_recorder,
    })
}

/// Printable description of an assembled context.
#[derive(Debug, Clone, Serialize)]
pub struct ContextSummary {
    pub cloud_provider: String,
    pub node_groups: Vec<String>,
    pub expander: String,
    pub cluster_state: ClusterStateRegistryConfig,
    pub status_object: String,
    pub write_status: bool,
    pub options: AutoscalingOptions,
}

impl AutoscalingContext {
    pub fn summary(&self) -> ContextSummary {
        ContextSummary {
            cloud_provider: self.cloud_provider.name().to_string(),
            node_groups: self
                .cloud_provider
                .node_groups()
                .iter()
                .map(|g| g.debug())
                .collect(),
            expander: self.expander_strategy.name().to_string(),
            cluster_state: *self.cluster_state_registry.config(),
            status_object: self.log_recorder.status_object().to_string(),
            write_status: self.log_recorder.is_active(),
            options: self.options.clone(),
        }
    }
}
