//! Search entry point: single-chemistry, multi-chemistry and global-optimum
//! stages run in sequence and merged into one ranked list.

use packcore::{BatteryDesign, Catalogue, Requirements};
use serde::{Deserialize, Serialize};

use crate::compose::{rank_designs, single_design};
use crate::config::SearchConfig;
use crate::multi::MultiChemistrySearch;
use crate::optimizer::MixOptimizer;
use crate::single::SingleChemistrySearch;
use crate::stats::SearchStats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    /// Best designs, global optimum first when one exists
    pub results: Vec<BatteryDesign>,
    /// Longer list of the same ranking for plotting
    pub plot_results: Vec<BatteryDesign>,
    /// Designs found before the cutoffs were applied
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SearchStats>,
}

#[derive(Debug, Clone, Default)]
pub struct DesignEngine {
    config: SearchConfig,
}

impl DesignEngine {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Runs every enabled stage against `catalogue` and ranks the designs by
    /// energy per unit price. Stats are attached only when the request sets
    /// `debug`.
    pub fn run(&self, catalogue: &Catalogue, requirements: &Requirements) -> SearchOutcome {
        let config = &self.config;
        let deadline = config.resolve_deadline();

        let (subpacks, mut stats) = SingleChemistrySearch::new(catalogue, requirements, config)
            .with_deadline(deadline)
            .run();
        let mut designs: Vec<BatteryDesign> = subpacks
            .into_iter()
            .map(|subpack| single_design(subpack, &config.financial))
            .collect();

        if config.enable_multi && catalogue.cells().len() >= 2 {
            let (multi, multi_stats) = MultiChemistrySearch::new(catalogue, requirements, config)
                .with_deadline(deadline)
                .run();
            designs.extend(multi);
            stats += multi_stats;
        }

        let optimum = if config.enable_optimizer {
            match MixOptimizer::new(catalogue, requirements, config)
                .with_deadline(deadline)
                .run(&mut stats)
            {
                Ok(design) => Some(design),
                Err(e) => {
                    log::warn!("Global optimum unavailable: {e}");
                    stats.optimizer_failures += 1;
                    None
                }
            }
        } else {
            None
        };

        rank_designs(&mut designs);
        if let Some(optimum) = optimum {
            designs.insert(0, optimum);
        }

        if stats.truncated {
            log::warn!("Search stopped at its deadline; results are partial");
        }

        let total = designs.len();
        let results = designs.iter().take(config.top_results).cloned().collect();
        designs.truncate(config.plot_results);
        log::info!("{total} designs found, returning {}", total.min(config.top_results));

        SearchOutcome {
            results,
            plot_results: designs,
            total,
            stats: requirements.debug.then_some(stats),
        }
    }
}
