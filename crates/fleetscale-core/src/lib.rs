pub mod listers;
pub mod options;
pub mod types;

pub use listers::{ListerError, NodeLister, StaticNodeLister};
pub use options::{AutoscalingOptions, OptionsError};
pub use types::*;
