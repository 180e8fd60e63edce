//! Autoscaling options and the options file parser.
//!
//! `AutoscalingOptions` is a flat record of every tunable the autoscaler
//! reads. It is loaded once at startup, validated by the loader, and then
//! treated as read-only by every consumer.
//!
//! ```toml
//! [autoscaling]
//! cloud_provider_name = "static"
//! cloud_config = "/etc/fleetscale/cloud.toml"
//! expander_name = "least-waste"
//! node_groups = ["1:10:pool-a"]
//! scale_down_unneeded_time = "10m"
//! max_total_unready_percentage = 0.33
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("failed to read options file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse options: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("{field} must be within [0, 1], got {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("{0} must not be empty")]
    Missing(&'static str),
}

/// Options to customize how autoscaling works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoscalingOptions {
    /// Number of empty nodes that can be removed at the same time.
    pub max_empty_bulk_delete: usize,
    /// Utilization (fraction, 0.0–1.0) below which a node is considered
    /// for scale down. Well-utilized nodes are not touched.
    pub scale_down_utilization_threshold: f64,
    /// How long a node must be unneeded before it is scaled down.
    #[serde(with = "duration_str")]
    pub scale_down_unneeded_time: Duration,
    /// How long an unready node must be unneeded before it is scaled down.
    #[serde(with = "duration_str")]
    pub scale_down_unready_time: Duration,
    /// Maximum number of nodes in the whole cluster. 0 means no limit.
    pub max_nodes_total: usize,
    /// Node group auto-discovery definition, e.g. `static:name=^pool-`.
    pub node_group_auto_discovery: String,
    /// How long to wait before removing nodes that never registered.
    #[serde(with = "duration_str")]
    pub unregistered_node_removal_time: Duration,
    /// Estimator used to size scale ups.
    pub estimator_name: String,
    /// Node group expander used in scale up.
    pub expander_name: String,
    /// Seconds scale down waits for pods to terminate before removing
    /// the node from the cloud provider.
    pub max_graceful_termination_sec: u64,
    /// Maximum time to wait for a node to be provisioned.
    #[serde(with = "duration_str")]
    pub max_node_provision_time: Duration,
    /// Fraction (0.0–1.0) of unready nodes above which autoscaling halts.
    pub max_total_unready_percentage: f64,
    /// Unready nodes tolerated regardless of `max_total_unready_percentage`.
    pub ok_total_unready_count: usize,
    /// Path to the cloud provider configuration file. Empty for none.
    pub cloud_config: String,
    /// Cloud provider to run against.
    pub cloud_provider_name: String,
    /// Explicit node groups (`<min>:<max>:<id>`), in order.
    pub node_groups: Vec<String>,
    pub scale_down_enabled: bool,
    /// Time from the last scale up until scale down is considered.
    #[serde(with = "duration_str")]
    pub scale_down_delay: Duration,
    /// How often scale down possibility is checked.
    #[serde(with = "duration_str")]
    pub scale_down_trial_interval: Duration,
    /// Write status information to the status config map.
    pub write_status_config_map: bool,
    /// Balance node counts between node groups with similar machines.
    pub balance_similar_node_groups: bool,
    /// Namespace the autoscaler runs in; status objects live here.
    pub config_namespace: String,
    /// Limits scanning for pods to this namespace. Empty for all.
    pub namespace_filter: String,
}

impl Default for AutoscalingOptions {
    fn default() -> Self {
        Self {
            max_empty_bulk_delete: 10,
            scale_down_utilization_threshold: 0.5,
            scale_down_unneeded_time: Duration::from_secs(10 * 60),
            scale_down_unready_time: Duration::from_secs(20 * 60),
            max_nodes_total: 0,
            node_group_auto_discovery: String::new(),
            unregistered_node_removal_time: Duration::from_secs(15 * 60),
            estimator_name: "binpacking".to_string(),
            expander_name: "random".to_string(),
            max_graceful_termination_sec: 600,
            max_node_provision_time: Duration::from_secs(15 * 60),
            max_total_unready_percentage: 0.33,
            ok_total_unready_count: 3,
            cloud_config: String::new(),
            cloud_provider_name: "static".to_string(),
            node_groups: Vec::new(),
            scale_down_enabled: true,
            scale_down_delay: Duration::from_secs(10 * 60),
            scale_down_trial_interval: Duration::from_secs(10),
            write_status_config_map: true,
            balance_similar_node_groups: false,
            config_namespace: "kube-system".to_string(),
            namespace_filter: String::new(),
        }
    }
}

/// On-disk layout: options live under an `[autoscaling]` table.
#[derive(Debug, Default, Deserialize)]
struct OptionsFile {
    #[serde(default)]
    autoscaling: AutoscalingOptions,
}

impl AutoscalingOptions {
    /// Load and validate options from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, OptionsError> {
        let content = std::fs::read_to_string(path).map_err(|source| OptionsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate options from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, OptionsError> {
        let file: OptionsFile = toml::from_str(content)?;
        file.autoscaling.validate()?;
        Ok(file.autoscaling)
    }

    /// Range-check the options.
    ///
    /// Called by the loaders. Consumers of an already loaded value never
    /// call this again.
    pub fn validate(&self) -> Result<(), OptionsError> {
        check_fraction(
            "scale_down_utilization_threshold",
            self.scale_down_utilization_threshold,
        )?;
        check_fraction(
            "max_total_unready_percentage",
            self.max_total_unready_percentage,
        )?;

        if self.expander_name.trim().is_empty() {
            return Err(OptionsError::Missing("expander_name"));
        }
        if self.cloud_provider_name.trim().is_empty() {
            return Err(OptionsError::Missing("cloud_provider_name"));
        }
        if self.estimator_name.trim().is_empty() {
            return Err(OptionsError::Missing("estimator_name"));
        }
        if self.scale_down_trial_interval.is_zero() {
            return Err(OptionsError::InvalidDuration(
                "scale_down_trial_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_fraction(field: &'static str, value: f64) -> Result<(), OptionsError> {
    // NaN fails the range check too.
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(OptionsError::OutOfRange { field, value })
    }
}

/// Parse a duration string like "500ms", "30s", "10m", "1h".
///
/// A bare integer is read as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, OptionsError> {
    let s = s.trim();
    let invalid = || OptionsError::InvalidDuration(s.to_string());

    let (digits, unit_secs, unit_millis) = if let Some(ms) = s.strip_suffix("ms") {
        (ms, 0, 1)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1, 0)
    } else if let Some(mins) = s.strip_suffix('m') {
        (mins, 60, 0)
    } else if let Some(hours) = s.strip_suffix('h') {
        (hours, 3600, 0)
    } else {
        (s, 1, 0)
    };

    let value = digits.trim().parse::<u64>().map_err(|_| invalid())?;
    if unit_millis > 0 {
        Ok(Duration::from_millis(value))
    } else {
        value
            .checked_mul(unit_secs)
            .map(Duration::from_secs)
            .ok_or_else(invalid)
    }
}

/// Render a duration in the largest unit that represents it exactly.
pub fn format_duration(d: Duration) -> String {
    if d.subsec_millis() != 0 || (d.as_secs() == 0 && !d.is_zero()) {
        return format!("{}ms", d.as_millis());
    }
    let secs = d.as_secs();
    if secs != 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

/// Serde adapter for `Duration` fields written as "10m"-style strings.
mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
