//! Least-waste expander.
//!
//! ```text
//! wasted_cpu    = (template.cpu * nodes - Σ pod.cpu) / (template.cpu * nodes)
//! wasted_memory = (template.mem * nodes - Σ pod.mem) / (template.mem * nodes)
//! score         = wasted_cpu + wasted_memory      (lower is better)
//! ```

use std::collections::HashMap;

use fleetscale_core::NodeTemplate;
use tracing::debug;

use crate::random::RandomStrategy;
use crate::strategy::{ExpansionOption, Strategy};

/// Picks the option that leaves the least CPU and memory idle.
#[derive(Debug, Default)]
pub struct LeastWasteStrategy;

impl LeastWasteStrategy {
    pub fn new() -> Self {
        Self
    }
}

/// Waste score of an option, or `None` if the group's template is
/// unknown or has no capacity.
pub(crate) fn waste_score(option: &ExpansionOption, template: &NodeTemplate) -> Option<f64> {
    let nodes = option.node_count as f64;
    let available_cpu = template.cpu_millis as f64 * nodes;
    let available_memory = template.memory_bytes as f64 * nodes;
    if available_cpu <= 0.0 || available_memory <= 0.0 {
        return None;
    }

    let requested_cpu: u64 = option.pods.iter().map(|p| p.cpu_millis).sum();
    let requested_memory: u64 = option.pods.iter().map(|p| p.memory_bytes).sum();

    let wasted_cpu = (available_cpu - requested_cpu as f64) / available_cpu;
    let wasted_memory = (available_memory - requested_memory as f64) / available_memory;
    Some(wasted_cpu + wasted_memory)
}

impl Strategy for LeastWasteStrategy {
    fn name(&self) -> &'static str {
        "least-waste"
    }

    fn best_option(
        &self,
        options: &[ExpansionOption],
        node_infos: &HashMap<String, NodeTemplate>,
    ) -> Option<ExpansionOption> {
        let scored: Vec<(&ExpansionOption, f64)> = options
            .iter()
            .filter_map(|o| {
                let template = node_infos.get(&o.node_group_id)?;
                let score = waste_score(o, template)?;
                debug!(node_group = %o.node_group_id, score, "least-waste score");
                Some((o, score))
            })
            .collect();

        if scored.is_empty() {
            let all: Vec<&ExpansionOption> = options.iter().collect();
            return RandomStrategy::choose(&all);
        }

        let min = scored
            .iter()
            .map(|(_, s)| *s)
            .fold(f64::INFINITY, f64::min);
        let best: Vec<&ExpansionOption> = scored
            .iter()
            .filter(|(_, s)| *s == min)
            .map(|(o, _)| *o)
            .collect();
        RandomStrategy::choose(&best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetscale_core::Pod;

    const GIB: u64 = 1024 * 1024 * 1024;

    fn template(cpu_millis: u64, memory_bytes: u64) -> NodeTemplate {
        NodeTemplate {
            cpu_millis,
            memory_bytes,
            labels: HashMap::new(),
        }
    }

    fn pods(n: usize, cpu_millis: u64, memory_bytes: u64) -> Vec<Pod> {
        (0..n)
            .map(|i| Pod::new("default", &format!("p{i}"), cpu_millis, memory_bytes))
            .collect()
    }

    #[test]
    fn picks_tightest_fit() {
        let mut infos = HashMap::new();
        infos.insert("small".to_string(), template(2000, 4 * GIB));
        infos.insert("large".to_string(), template(16000, 64 * GIB));

        let options = vec![
            ExpansionOption::new("small", 1, pods(3, 500, GIB)),
            ExpansionOption::new("large", 1, pods(3, 500, GIB)),
        ];
        let best = LeastWasteStrategy::new()
            .best_option(&options, &infos)
            .unwrap();
        assert_eq!(best.node_group_id, "small");
    }

    #[test]
    fn options_without_template_are_skipped() {
        let mut infos = HashMap::new();
        infos.insert("known".to_string(), template(16000, 64 * GIB));

        let options = vec![
            ExpansionOption::new("unknown", 1, pods(4, 500, GIB)),
            ExpansionOption::new("known", 1, pods(1, 500, GIB)),
        ];
        let best = LeastWasteStrategy::new()
            .best_option(&options, &infos)
            .unwrap();
        assert_eq!(best.node_group_id, "known");
    }

    #[test]
    fn falls_back_to_random_without_templates() {
        let options = vec![ExpansionOption::new("pool-a", 1, pods(1, 100, GIB))];
        let best = LeastWasteStrategy::new()
            .best_option(&options, &HashMap::new())
            .unwrap();
        assert_eq!(best.node_group_id, "pool-a");
    }

    #[test]
    fn waste_score_values() {
        let option = ExpansionOption::new("g", 2, pods(2, 1000, 2 * GIB));
        let score = waste_score(&option, &template(2000, 4 * GIB)).unwrap();
        assert!((score - 1.0).abs() < 1e-9);
        assert!(waste_score(&option, &template(0, GIB)).is_none());
    }
}
