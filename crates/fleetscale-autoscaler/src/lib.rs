//! fleetscale-autoscaler: the autoscaling context.
//!
//! Assembles, once at startup, the long-lived collaborators every
//! reconciliation pass works with, and bundles them with the options
//! into an [`AutoscalingContext`].
//!
//! # Assembly order
//!
//! ```text
//! AutoscalingOptions
//!   └── CloudProviderBuilder::build()        → Arc<dyn CloudProvider>
//!         ├── expander_strategy_from_name()  → Arc<dyn Strategy>
//!         └── ClusterStateRegistry::new()    → Arc<ClusterStateRegistry>
//!
//! + ClusterClient, EventRecorder, PredicateChecker, LogEventRecorder
//!   (constructed by the caller)
//!   └── AutoscalingContext
//! ```
//!
//! The provider is built exactly once and the same `Arc` is handed to
//! every subsystem that needs it. Any failure aborts assembly; no
//! partially built context is ever returned.
//!
//! # Errors
//!
//! Provider construction failures are fatal: the process cannot run
//! against a provider it failed to build. Expander construction failures
//! are configuration errors the caller may report and handle.

pub mod client;
pub mod context;
pub mod error;
pub mod events;
pub mod listers;
pub mod predicates;

pub use client::{ClientError, ClusterClient, ClusterSnapshot, InMemoryCluster};
pub use context::{
    AutoscalingContext, ContextSummary, new_autoscaling_context,
    new_autoscaling_context_with_providers,
};
pub use error::{AutoscalerError, ErrorType};
pub use events::{
    EventRecorder, EventType, LogEventRecorder, MemoryEventRecorder, ObjectReference,
    RecordedEvent, TracingEventRecorder,
};
pub use listers::{ListerRegistry, StaticListerRegistry};
pub use predicates::{PredicateChecker, PredicateError, ResourceFitChecker};
