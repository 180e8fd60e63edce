//! Price expander.
//!
//! ```text
//! price_score = (node_price + STABILIZATION) / (pod_price + STABILIZATION)
//! unfitness   = max(cores / preferred, preferred / cores)
//! score       = price_score * unfitness            (lower is better)
//! ```
//!
//! `preferred` is the node size (in cores) that suits the current cluster
//! size, so small clusters lean towards small machines and large clusters
//! towards large ones even when prices are linear.

use std::collections::HashMap;
use std::sync::Arc;

use fleetscale_cloudprovider::{CloudProvider, PricingModel};
use fleetscale_core::{NodeLister, NodeTemplate};
use tracing::{debug, warn};

use crate::random::RandomStrategy;
use crate::strategy::{ExpansionOption, Strategy};

/// Price horizon for scoring.
const PRICE_HOURS: f64 = 1.0;

/// Keeps near-zero prices from dominating the ratio.
const STABILIZATION: f64 = 0.1;

/// Preferred node cores by cluster size: `(max nodes, cores)`.
const PREFERRED_CORES: [(usize, u64); 5] = [(2, 1), (5, 2), (19, 4), (59, 8), (199, 16)];
const PREFERRED_CORES_MAX: u64 = 32;

/// Picks the cheapest option per pod, adjusted for node size fit.
#[derive(Debug)]
pub struct PriceStrategy {
    cloud_provider: Arc<dyn CloudProvider>,
    pricing: Arc<dyn PricingModel>,
    all_node_lister: Arc<dyn NodeLister>,
}

impl PriceStrategy {
    pub fn new(
        cloud_provider: Arc<dyn CloudProvider>,
        pricing: Arc<dyn PricingModel>,
        all_node_lister: Arc<dyn NodeLister>,
    ) -> Self {
        Self {
            cloud_provider,
            pricing,
            all_node_lister,
        }
    }

    fn score(
        &self,
        option: &ExpansionOption,
        template: &NodeTemplate,
        preferred_cores: u64,
    ) -> Option<f64> {
        let node_price = match self.pricing.node_price(template, PRICE_HOURS) {
            Ok(p) => p * option.node_count as f64,
            Err(e) => {
                warn!(node_group = %option.node_group_id, error = %e, "failed to price node");
                return None;
            }
        };

        let mut pod_price = 0.0;
        for pod in &option.pods {
            match self.pricing.pod_price(pod, PRICE_HOURS) {
                Ok(p) => pod_price += p,
                Err(e) => {
                    warn!(pod = %pod.key(), error = %e, "failed to price pod");
                    return None;
                }
            }
        }

        let cores = (template.cpu_millis as f64 / 1000.0).max(f64::MIN_POSITIVE);
        let preferred = preferred_cores as f64;
        let unfitness = (cores / preferred).max(preferred / cores);

        let price_score = (node_price + STABILIZATION) / (pod_price + STABILIZATION);
        Some(price_score * unfitness)
    }
}

/// Preferred node size, in cores, for a cluster of `cluster_size` nodes.
pub fn preferred_node_cores(cluster_size: usize) -> u64 {
    PREFERRED_CORES
        .iter()
        .find(|(max_nodes, _)| cluster_size <= *max_nodes)
        .map(|(_, cores)| *cores)
        .unwrap_or(PREFERRED_CORES_MAX)
}

impl Strategy for PriceStrategy {
    fn name(&self) -> &'static str {
        "price"
    }

    fn best_option(
        &self,
        options: &[ExpansionOption],
        node_infos: &HashMap<String, NodeTemplate>,
    ) -> Option<ExpansionOption> {
        let cluster_size = match self.all_node_lister.list() {
            Ok(nodes) => nodes.len(),
            Err(e) => {
                warn!(error = %e, "failed to list nodes, assuming empty cluster");
                0
            }
        };
        let preferred = preferred_node_cores(cluster_size);

        let mut best: Vec<&ExpansionOption> = Vec::new();
        let mut best_score = f64::INFINITY;
        for option in options {
            let Some(template) = node_infos.get(&option.node_group_id) else {
                continue;
            };
            let Some(score) = self.score(option, template, preferred) else {
                continue;
            };
            debug!(
                provider = %self.cloud_provider.name(),
                node_group = %option.node_group_id,
                score,
                preferred,
                "price score"
            );
            if score < best_score {
                best_score = score;
                best.clear();
                best.push(option);
            } else if score == best_score {
                best.push(option);
            }
        }

        if best.is_empty() {
            let all: Vec<&ExpansionOption> = options.iter().collect();
            return RandomStrategy::choose(&all);
        }
        RandomStrategy::choose(&best)
    }
}
