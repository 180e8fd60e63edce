//! Error types for the cluster state registry.

use fleetscale_cloudprovider::CloudProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterStateError {
    #[error("cloud provider error: {0}")]
    CloudProvider(#[from] CloudProviderError),
}
