//! Random expander.

use std::collections::HashMap;

use fleetscale_core::NodeTemplate;
use rand::seq::SliceRandom;

use crate::strategy::{ExpansionOption, Strategy};

/// Picks an option uniformly at random.
#[derive(Debug, Default)]
pub struct RandomStrategy;

impl RandomStrategy {
    pub fn new() -> Self {
        Self
    }

    /// Random choice among already filtered options. Used by the other
    /// strategies to break ties.
    pub(crate) fn choose(options: &[&ExpansionOption]) -> Option<ExpansionOption> {
        options
            .choose(&mut rand::thread_rng())
            .map(|o| (*o).clone())
    }
}

impl Strategy for RandomStrategy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn best_option(
        &self,
        options: &[ExpansionOption],
        _node_infos: &HashMap<String, NodeTemplate>,
    ) -> Option<ExpansionOption> {
        let refs: Vec<&ExpansionOption> = options.iter().collect();
        Self::choose(&refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_options_yield_none() {
        assert!(RandomStrategy::new()
            .best_option(&[], &HashMap::new())
            .is_none());
    }

    #[test]
    fn picks_one_of_the_options() {
        let options = vec![
            ExpansionOption::new("pool-a", 1, Vec::new()),
            ExpansionOption::new("pool-b", 2, Vec::new()),
        ];
        for _ in 0..20 {
            let best = RandomStrategy::new()
                .best_option(&options, &HashMap::new())
                .unwrap();
            assert!(options.contains(&best));
        }
    }
}
