//! Two-chemistry combinations over a grid of energy and power splits.
//!
//! Each chemistry of a pair takes a percentage share of the energy and power
//! floors and contributes its cheapest subpack meeting that share. The voltage
//! window and envelope dimensions apply to each subpack on its own; combined
//! geometry is not validated.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use packcore::{BatteryDesign, Catalogue, CellSpec, DesignOrigin, RelaxedCheck, Requirements, Subpack};
use rayon::prelude::*;

use crate::compose::{check_budget, compose_design};
use crate::config::{SearchConfig, expired};
use crate::single::SingleChemistrySearch;
use crate::stats::SearchStats;

/// (energy %, power %) assigned to one chemistry
pub type Share = (u8, u8);

const EMPTY_SHARE: Share = (0, 0);

/// Cheapest subpack per share, for one cell
type ShareTable = HashMap<Share, Option<Subpack>>;

pub struct MultiChemistrySearch<'a> {
    catalogue: &'a Catalogue,
    requirements: &'a Requirements,
    config: &'a SearchConfig,
    deadline: Option<Instant>,
}

impl<'a> MultiChemistrySearch<'a> {
    pub fn new(catalogue: &'a Catalogue, requirements: &'a Requirements, config: &'a SearchConfig) -> Self {
        Self {
            catalogue,
            requirements,
            config,
            deadline: config.resolve_deadline(),
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Grid values clamped to 100, sorted and deduplicated
    fn grid(&self) -> Vec<u8> {
        let mut grid: Vec<u8> = self.config.split_grid_pct.iter().map(|&v| v.min(100)).collect();
        grid.sort_unstable();
        grid.dedup();
        grid
    }

    /// Every share either side of a split can receive
    fn shares(&self) -> Vec<Share> {
        let grid = self.grid();
        let mut shares: Vec<Share> = grid
            .iter()
            .flat_map(|&e| grid.iter().flat_map(move |&p| [(e, p), (100 - e, 100 - p)]))
            .filter(|&share| share != EMPTY_SHARE)
            .collect();
        shares.sort_unstable();
        shares.dedup();
        shares
    }

    /// Cheapest subpack of `cell` meeting `share` of the floors
    pub fn cheapest_share(&self, cell: &Arc<CellSpec>, share: Share) -> (Option<Subpack>, SearchStats) {
        let (energy_pct, power_pct) = share;
        let share_requirements = self
            .requirements
            .with_share(f64::from(energy_pct) / 100.0, f64::from(power_pct) / 100.0);
        SingleChemistrySearch::new(self.catalogue, &share_requirements, self.config)
            .with_deadline(self.deadline)
            .cheapest_for_cell(cell)
    }

    fn share_table(&self, cell: &Arc<CellSpec>, shares: &[Share]) -> (ShareTable, bool) {
        let mut truncated = false;
        let table = shares
            .iter()
            .map(|&share| {
                let (subpack, stats) = self.cheapest_share(cell, share);
                truncated |= stats.truncated;
                (share, subpack)
            })
            .collect();
        (table, truncated)
    }

    /// Composes the design for cells `a` and `b` where `a` takes
    /// `energy_pct`/`power_pct` and `b` the remainder.
    ///
    /// `None` when a non-empty share has no feasible subpack. The caller
    /// still has to check the combined budget.
    pub fn combine(&self, a: &Arc<CellSpec>, b: &Arc<CellSpec>, energy_pct: u8, power_pct: u8) -> Option<BatteryDesign> {
        let first_share = (energy_pct.min(100), power_pct.min(100));
        let second_share = (100 - first_share.0, 100 - first_share.1);
        let searched = |share: Share| if share == EMPTY_SHARE { Vec::new() } else { vec![share] };

        let (first, _) = self.share_table(a, &searched(first_share));
        let (second, _) = self.share_table(b, &searched(second_share));
        Some(self.compose(
            share_subpack(&first, first_share)?,
            share_subpack(&second, second_share)?,
            first_share.0,
            first_share.1,
        ))
    }

    fn compose(
        &self,
        first: Option<Subpack>,
        second: Option<Subpack>,
        energy_pct: u8,
        power_pct: u8,
    ) -> BatteryDesign {
        let subpacks: Vec<Subpack> = first.into_iter().chain(second).collect();
        let relaxed = if subpacks.len() > 1 {
            vec![RelaxedCheck::CombinedGeometry]
        } else {
            Vec::new()
        };
        compose_design(
            subpacks,
            DesignOrigin::MultiChemistry {
                energy_split_pct: energy_pct,
                power_split_pct: power_pct,
            },
            relaxed,
            &self.config.financial,
        )
    }

    /// Every viable (pair, split) design over distinct catalogue cells.
    pub fn run(&self) -> (Vec<BatteryDesign>, SearchStats) {
        let cells = self.catalogue.cells();
        let mut stats = SearchStats::default();
        if cells.len() < 2 {
            return (Vec::new(), stats);
        }

        let shares = self.shares();
        let tables: Vec<(ShareTable, bool)> = cells.par_iter().map(|cell| self.share_table(cell, &shares)).collect();
        stats.truncated = tables.iter().any(|(_, truncated)| *truncated);

        let grid = self.grid();
        let pairs: Vec<(usize, usize)> = (0..cells.len())
            .flat_map(|i| (i + 1..cells.len()).map(move |j| (i, j)))
            .collect();

        let per_pair: Vec<(Vec<BatteryDesign>, SearchStats)> = pairs
            .par_iter()
            .map(|&(i, j)| self.run_pair(&tables[i].0, &tables[j].0, &grid))
            .collect();

        let mut designs = Vec::new();
        for (pair_designs, pair_stats) in per_pair {
            designs.extend(pair_designs);
            stats += pair_stats;
        }

        log::info!(
            "Multi-chemistry search: {} designs from {} combinations ({} pairs)",
            designs.len(),
            stats.multi_combinations,
            pairs.len()
        );
        (designs, stats)
    }

    fn run_pair(&self, first: &ShareTable, second: &ShareTable, grid: &[u8]) -> (Vec<BatteryDesign>, SearchStats) {
        let mut stats = SearchStats::default();
        let mut designs = Vec::new();

        for &energy_pct in grid {
            for &power_pct in grid {
                if expired(self.deadline) {
                    stats.truncated = true;
                    return (designs, stats);
                }
                stats.multi_combinations += 1;

                let (Some(a), Some(b)) = (
                    share_subpack(first, (energy_pct, power_pct)),
                    share_subpack(second, (100 - energy_pct, 100 - power_pct)),
                ) else {
                    stats.multi_infeasible_share += 1;
                    continue;
                };

                let design = self.compose(a, b, energy_pct, power_pct);
                if check_budget(&design, self.requirements).is_err() {
                    stats.multi_over_budget += 1;
                    continue;
                }
                stats.multi_designs += 1;
                designs.push(design);
            }
        }
        (designs, stats)
    }
}

/// `Some(None)` for the empty share, `None` when a non-empty share is infeasible
fn share_subpack(table: &ShareTable, share: Share) -> Option<Option<Subpack>> {
    if share == EMPTY_SHARE {
        return Some(None);
    }
    table.get(&share).cloned().flatten().map(Some)
}
