//! Node group spec and auto-discovery spec parsing.
//!
//! ```text
//! node group spec:      <min>:<max>:<id>            1:10:pool-a
//! auto-discovery spec:  <provider>:name=<regex>     static:name=^pool-
//! ```

use regex::Regex;

use crate::error::{CloudProviderError, CloudProviderResult};

/// An explicitly configured node group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeGroupSpec {
    pub id: String,
    pub min_size: usize,
    pub max_size: usize,
}

impl NodeGroupSpec {
    pub fn parse(spec: &str) -> CloudProviderResult<Self> {
        let invalid = |reason: &str| CloudProviderError::InvalidNodeGroupSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = spec.splitn(3, ':');
        let (Some(min), Some(max), Some(id)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid("expected <min>:<max>:<id>"));
        };

        let min_size = min
            .trim()
            .parse::<usize>()
            .map_err(|_| invalid("min size is not a non-negative integer"))?;
        let max_size = max
            .trim()
            .parse::<usize>()
            .map_err(|_| invalid("max size is not a non-negative integer"))?;
        let id = id.trim();

        if id.is_empty() {
            return Err(invalid("node group id is empty"));
        }
        if max_size == 0 {
            return Err(invalid("max size must be greater than zero"));
        }
        if min_size > max_size {
            return Err(invalid("min size is greater than max size"));
        }

        Ok(Self {
            id: id.to_string(),
            min_size,
            max_size,
        })
    }
}

/// A pattern-based node group discovery definition.
#[derive(Debug, Clone)]
pub struct AutoDiscoverySpec {
    /// Provider the spec is addressed to.
    pub provider: String,
    /// Node group ids matching this pattern are managed.
    pub name_pattern: Regex,
}

impl AutoDiscoverySpec {
    pub fn parse(spec: &str) -> CloudProviderResult<Self> {
        let invalid = |reason: String| CloudProviderError::InvalidAutoDiscoverySpec {
            spec: spec.to_string(),
            reason,
        };

        let (provider, selector) = spec
            .split_once(':')
            .ok_or_else(|| invalid("expected <provider>:<key>=<value>".to_string()))?;
        let (key, value) = selector
            .split_once('=')
            .ok_or_else(|| invalid("expected <key>=<value> after provider".to_string()))?;

        if provider.trim().is_empty() {
            return Err(invalid("provider is empty".to_string()));
        }
        if key.trim() != "name" {
            return Err(invalid(format!("unsupported discovery key {:?}", key.trim())));
        }
        let name_pattern = Regex::new(value.trim())
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            provider: provider.trim().to_string(),
            name_pattern,
        })
    }

    pub fn matches(&self, node_group_id: &str) -> bool {
        self.name_pattern.is_match(node_group_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_node_group_spec() {
        let spec = NodeGroupSpec::parse("1:10:pool-a").unwrap();
        assert_eq!(spec.id, "pool-a");
        assert_eq!(spec.min_size, 1);
        assert_eq!(spec.max_size, 10);
    }

    #[test]
    fn node_group_id_may_contain_colons() {
        let spec = NodeGroupSpec::parse("0:3:projects/p/zones/z:pool").unwrap();
        assert_eq!(spec.id, "projects/p/zones/z:pool");
    }

    #[test]
    fn node_group_spec_errors() {
        for bad in [
            "",
            "1:10",
            "a:10:pool",
            "1:b:pool",
            "1:10:",
            "5:2:pool",
            "0:0:pool",
        ] {
            let err = NodeGroupSpec::parse(bad).unwrap_err();
            assert!(
                matches!(err, CloudProviderError::InvalidNodeGroupSpec { .. }),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn parse_auto_discovery() {
        let spec = AutoDiscoverySpec::parse("static:name=^pool-").unwrap();
        assert_eq!(spec.provider, "static");
        assert!(spec.matches("pool-a"));
        assert!(!spec.matches("gpu-pool"));
    }

    #[test]
    fn auto_discovery_errors() {
        for bad in [
            "static",
            "static:name",
            ":name=x",
            "static:tag=x",
            "static:name=(",
        ] {
            let err = AutoDiscoverySpec::parse(bad).unwrap_err();
            assert!(
                matches!(err, CloudProviderError::InvalidAutoDiscoverySpec { .. }),
                "{bad:?} should be rejected"
            );
        }
    }
}
