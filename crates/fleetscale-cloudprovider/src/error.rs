//! Error types for cloud provider construction and node group operations.

use thiserror::Error;

/// Result type alias for cloud provider operations.
pub type CloudProviderResult<T> = Result<T, CloudProviderError>;

/// Errors that can occur while building or driving a cloud provider.
#[derive(Debug, Error)]
pub enum CloudProviderError {
    #[error("unknown cloud provider: {0}")]
    UnknownProvider(String),

    #[error("failed to read cloud config {path}: {reason}")]
    Config { path: String, reason: String },

    #[error("invalid node group spec {spec:?}: {reason}")]
    InvalidNodeGroupSpec { spec: String, reason: String },

    #[error("invalid auto-discovery spec {spec:?}: {reason}")]
    InvalidAutoDiscoverySpec { spec: String, reason: String },

    #[error("node group not found: {0}")]
    NodeGroupNotFound(String),

    #[error("node group {group}: {reason}")]
    SizeViolation { group: String, reason: String },

    #[error("node {node} does not belong to node group {group}")]
    ForeignNode { node: String, group: String },
}
