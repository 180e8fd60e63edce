//! Most-pods expander.

use std::collections::HashMap;

use fleetscale_core::NodeTemplate;

use crate::random::RandomStrategy;
use crate::strategy::{ExpansionOption, Strategy};

/// Picks the option that schedules the most pending pods.
#[derive(Debug, Default)]
pub struct MostPodsStrategy;

impl MostPodsStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for MostPodsStrategy {
    fn name(&self) -> &'static str {
        "most-pods"
    }

    fn best_option(
        &self,
        options: &[ExpansionOption],
        _node_infos: &HashMap<String, NodeTemplate>,
    ) -> Option<ExpansionOption> {
        let max = options.iter().map(|o| o.pods.len()).max()?;
        let best: Vec<&ExpansionOption> = options.iter().filter(|o| o.pods.len() == max).collect();
        RandomStrategy::choose(&best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetscale_core::Pod;

    fn pods(n: usize) -> Vec<Pod> {
        (0..n)
            .map(|i| Pod::new("default", &format!("p{i}"), 100, 1024))
            .collect()
    }

    #[test]
    fn picks_most_pods() {
        let options = vec![
            ExpansionOption::new("pool-a", 1, pods(2)),
            ExpansionOption::new("pool-b", 3, pods(5)),
            ExpansionOption::new("pool-c", 1, pods(1)),
        ];
        let best = MostPodsStrategy::new()
            .best_option(&options, &HashMap::new())
            .unwrap();
        assert_eq!(best.node_group_id, "pool-b");
    }

    #[test]
    fn ties_stay_within_the_best() {
        let options = vec![
            ExpansionOption::new("pool-a", 1, pods(3)),
            ExpansionOption::new("pool-b", 1, pods(3)),
            ExpansionOption::new("pool-c", 1, pods(1)),
        ];
        for _ in 0..20 {
            let best = MostPodsStrategy::new()
                .best_option(&options, &HashMap::new())
                .unwrap();
            assert_ne!(best.node_group_id, "pool-c");
        }
    }
}
