//! Expander factory: builds a strategy from its configured name.

use std::sync::Arc;

use fleetscale_cloudprovider::CloudProvider;
use fleetscale_core::NodeLister;
use tracing::info;

use crate::least_waste::LeastWasteStrategy;
use crate::most_pods::MostPodsStrategy;
use crate::price::PriceStrategy;
use crate::random::RandomStrategy;
use crate::strategy::{ExpanderError, ExpanderKind, Strategy};

/// Build the expander named `name`.
///
/// `cloud_provider` must be the instance the rest of the autoscaler uses;
/// strategies that consult the provider keep a reference to it.
pub fn expander_strategy_from_name(
    name: &str,
    cloud_provider: Arc<dyn CloudProvider>,
    all_node_lister: Arc<dyn NodeLister>,
) -> Result<Arc<dyn Strategy>, ExpanderError> {
    let kind = ExpanderKind::parse(name)?;
    let strategy: Arc<dyn Strategy> = match kind {
        ExpanderKind::Random => Arc::new(RandomStrategy::new()),
        ExpanderKind::MostPods => Arc::new(MostPodsStrategy::new()),
        ExpanderKind::LeastWaste => Arc::new(LeastWasteStrategy::new()),
        ExpanderKind::Price => {
            let pricing = cloud_provider
                .pricing()
                .ok_or_else(|| ExpanderError::PricingUnavailable {
                    name: name.to_string(),
                    provider: cloud_provider.name().to_string(),
                })?;
            Arc::new(PriceStrategy::new(cloud_provider, pricing, all_node_lister))
        }
    };
    info!(expander = %kind, "expander strategy built");
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetscale_cloudprovider::static_provider::{StaticCloudConfig, StaticPricing};
    use fleetscale_cloudprovider::{NodeGroupDiscoveryOptions, StaticCloudProvider};
    use fleetscale_core::StaticNodeLister;

    fn provider(pricing: bool) -> Arc<dyn CloudProvider> {
        let config = StaticCloudConfig {
            pricing: pricing.then_some(StaticPricing {
                cpu_core_hour: 0.04,
                memory_gib_hour: 0.005,
            }),
            node_group: Vec::new(),
        };
        Arc::new(
            StaticCloudProvider::from_config(config, &NodeGroupDiscoveryOptions::default())
                .unwrap(),
        )
    }

    fn lister() -> Arc<dyn NodeLister> {
        Arc::new(StaticNodeLister::default())
    }

    #[test]
    fn builds_every_known_expander() {
        for kind in ExpanderKind::ALL {
            let strategy =
                expander_strategy_from_name(kind.as_str(), provider(true), lister()).unwrap();
            assert_eq!(strategy.name(), kind.as_str());
        }
    }

    #[test]
    fn unknown_expander_is_an_error() {
        let err = expander_strategy_from_name("unknown-strategy", provider(true), lister())
            .unwrap_err();
        assert!(matches!(err, ExpanderError::UnknownExpander { .. }));
        assert!(err.to_string().contains("unknown-strategy"));
    }

    #[test]
    fn price_requires_pricing() {
        let err = expander_strategy_from_name("price", provider(false), lister()).unwrap_err();
        assert!(matches!(err, ExpanderError::PricingUnavailable { .. }));
        assert!(err.to_string().contains("static"));
    }
}
