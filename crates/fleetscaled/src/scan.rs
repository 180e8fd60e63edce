//! Scan loop: keeps the cluster state registry current.

use std::time::{Duration, SystemTime};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use fleetscale_autoscaler::AutoscalingContext;

/// What one scan observed.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub nodes: usize,
    pub healthy: bool,
    /// Log messages sent to the status object.
    pub flushed: usize,
}

/// Refresh the provider, feed the current nodes to the registry, and
/// flush the log recorder.
pub fn scan_once(ctx: &AutoscalingContext, now: SystemTime) -> anyhow::Result<ScanReport> {
    ctx.cloud_provider.refresh()?;
    let nodes = ctx.client.list_nodes()?;
    ctx.cluster_state_registry.update_nodes(&nodes, now)?;

    let readiness = ctx.cluster_state_registry.total_readiness();
    let healthy = ctx.cluster_state_registry.is_cluster_healthy();
    if healthy {
        debug!(
            ready = readiness.ready,
            unready = readiness.unready,
            unregistered = readiness.unregistered,
            "cluster healthy"
        );
    } else {
        ctx.log_recorder.warning(
            "ClusterUnhealthy",
            &format!(
                "{} of {} registered nodes unready",
                readiness.unready, readiness.registered
            ),
        );
    }

    let long_unregistered = ctx
        .cluster_state_registry
        .long_unregistered_nodes(ctx.unregistered_node_removal_time, now);
    for node in &long_unregistered {
        warn!(
            provider_id = %node.provider_id,
            node_group = %node.node_group_id,
            "machine never registered"
        );
    }

    Ok(ScanReport {
        nodes: nodes.len(),
        healthy,
        flushed: ctx.log_recorder.flush(),
    })
}

/// Scan every `interval` until `shutdown` flips.
pub async fn run(
    ctx: &AutoscalingContext,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(interval_ms = interval.as_millis() as u64, "scan loop started");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                if let Err(e) = scan_once(ctx, SystemTime::now()) {
                    tracing::error!(error = %e, "scan failed");
                }
            }
            _ = shutdown.changed() => {
                info!("scan loop shutting down");
                break;
            }
        }
    }
}
