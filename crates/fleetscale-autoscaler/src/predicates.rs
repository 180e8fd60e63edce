//! Scheduling feasibility: can a pod run on a node?

use std::fmt;

use fleetscale_core::{NodeTemplate, Pod};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    #[error("insufficient cpu: requested {requested}m, available {available}m")]
    InsufficientCpu { requested: u64, available: u64 },

    #[error("insufficient memory: requested {requested}, available {available}")]
    InsufficientMemory { requested: u64, available: u64 },

    #[error("node selector {key}={value} not satisfied")]
    NodeSelectorMismatch { key: String, value: String },
}

/// Checks whether a pod fits on a node.
pub trait PredicateChecker: Send + Sync + fmt::Debug {
    fn check_predicates(&self, pod: &Pod, node: &NodeTemplate) -> Result<(), PredicateError>;

    /// Whether `pod` fits on an empty node shaped like `node`.
    fn fits(&self, pod: &Pod, node: &NodeTemplate) -> bool {
        self.check_predicates(pod, node).is_ok()
    }
}

/// Resource and node selector checks.
#[derive(Debug, Default)]
pub struct ResourceFitChecker;

impl ResourceFitChecker {
    pub fn new() -> Self {
        Self
    }
}

impl PredicateChecker for ResourceFitChecker {
    fn check_predicates(&self, pod: &Pod, node: &NodeTemplate) -> Result<(), PredicateError> {
        for (key, value) in &pod.node_selector {
            match node.labels.get(key) {
                Some(v) if v == value => {}
                _ => {
                    return Err(PredicateError::NodeSelectorMismatch {
                        key: key.clone(),
                        value: value.clone(),
                    });
                }
            }
        }
        if pod.cpu_millis > node.cpu_millis {
            return Err(PredicateError::InsufficientCpu {
                requested: pod.cpu_millis,
                available: node.cpu_millis,
            });
        }
        if pod.memory_bytes > node.memory_bytes {
            return Err(PredicateError::InsufficientMemory {
                requested: pod.memory_bytes,
                available: node.memory_bytes,
            });
        }
        Ok(())
    }
}
