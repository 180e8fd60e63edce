//! fleetscale-expander: choosing which node group to grow.
//!
//! When pending pods need more capacity, scale up produces one
//! [`ExpansionOption`] per node group that could host them. An expander
//! [`Strategy`] picks one of those options.
//!
//! # Strategies
//!
//! - **`random`**: uniform random choice
//! - **`most-pods`**: the option that schedules the most pods
//! - **`least-waste`**: the option leaving the least idle CPU and memory
//! - **`price`**: the cheapest option per scheduled pod, preferring
//!   node sizes that fit the current cluster size
//!
//! Ties are broken randomly. Strategies are built by name through
//! [`expander_strategy_from_name`]; unknown names are a typed error.

pub mod factory;
pub mod least_waste;
pub mod most_pods;
pub mod price;
pub mod random;
pub mod strategy;

pub use factory::expander_strategy_from_name;
pub use strategy::{ExpanderError, ExpanderKind, ExpansionOption, Strategy};
