//! Single-chemistry search: evaluate every candidate of every cell and keep
//! the ones meeting all bounds.

use std::sync::Arc;
use std::time::Instant;

use electrical::{ComponentSelector, PackElectrical, SelectionOutcome, assess_safety};
use packcore::{
    Catalogue, CellSpec, DurabilityEstimate, GridLayout, Requirements, SafetyAssessment, SelectedComponents, Subpack,
};
use rayon::prelude::*;

use crate::candidates::{Candidate, CandidateSpace};
use crate::config::{SearchConfig, expired};
use crate::stats::{Rejection, SearchStats};

pub struct SingleChemistrySearch<'a> {
    catalogue: &'a Catalogue,
    requirements: &'a Requirements,
    config: &'a SearchConfig,
    deadline: Option<Instant>,
}

impl<'a> SingleChemistrySearch<'a> {
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

    /// Candidate space over `cells` under these requirements
    pub fn candidate_space(&self, cells: &'a [Arc<CellSpec>]) -> CandidateSpace<'a> {
        CandidateSpace::new(cells, self.requirements, self.config.max_parallel)
    }

    fn selector(&self) -> ComponentSelector<'a> {
        ComponentSelector::new(
            self.catalogue.components(),
            self.config.selection_policy,
            self.config.component_policies,
            self.config.cable_model,
            self.requirements.ambient_temp,
        )
    }

    /// Runs every check on one candidate, in order: weight, geometry,
    /// safety gate, energy and power floors, required components, price.
    pub fn evaluate(&self, candidate: Candidate<'_>) -> Result<Subpack, Rejection> {
        let req = self.requirements;
        let cell = candidate.cell;
        let pack = PackElectrical::new(cell, candidate.series, candidate.parallel, req.min_continuous_power);

        if pack.weight_kg > req.max_weight {
            return Err(Rejection::Weight);
        }

        let grid = layout::find_layout(
            cell.thickness_mm,
            cell.width_mm,
            pack.total_cells(),
            req.max_width,
            req.max_length,
        )
        .ok_or(Rejection::Geometry)?;

        let safety = assess_safety(cell, pack.continuous_current, pack.parallel, pack.voltage);
        if !safety.is_safe {
            return Err(Rejection::Unsafe);
        }

        if pack.energy_wh < req.min_energy {
            return Err(Rejection::Energy);
        }
        if pack.continuous_power_capability < req.min_continuous_power {
            return Err(Rejection::Power);
        }

        let components = match self.selector().select_for(&pack) {
            SelectionOutcome::Selected(components) => components,
            SelectionOutcome::Missing(kind) => return Err(Rejection::MissingComponent(kind)),
        };

        let subpack = assemble_subpack(
            cell,
            &pack,
            components,
            Some(grid),
            safety,
            self.config.durability.estimate(cell, pack.series, pack.parallel, req),
        );
        if subpack.total_price > req.max_price {
            return Err(Rejection::Price);
        }
        Ok(subpack)
    }

    /// All feasible subpacks of `space`, in enumeration order.
    pub fn search_space(&self, space: CandidateSpace<'a>) -> (Vec<Subpack>, SearchStats) {
        let mut stats = SearchStats::default();
        let mut found = Vec::new();

        for step in space.iter() {
            let candidate = match step {
                Ok(candidate) => candidate,
                Err((cell, rejection)) => {
                    log::trace!("{}: skipped ({:?})", cell.label(), rejection);
                    stats.record(rejection);
                    continue;
                }
            };
            if expired(self.deadline) {
                stats.truncated = true;
                break;
            }
            stats.total_attempts += 1;
            match self.evaluate(candidate) {
                Ok(subpack) => {
                    stats.valid_configurations += 1;
                    found.push(subpack);
                }
                Err(rejection) => stats.record(rejection),
            }
        }
        (found, stats)
    }

    /// All feasible subpacks of one cell, in enumeration order.
    pub fn search_cell(&self, cell: &'a Arc<CellSpec>) -> (Vec<Subpack>, SearchStats) {
        let (found, stats) = self.search_space(self.candidate_space(std::slice::from_ref(cell)));
        log::debug!("{}: {} feasible of {} attempts", cell.label(), found.len(), stats.total_attempts);
        (found, stats)
    }

    /// Cheapest feasible subpack of one cell
    pub fn cheapest_for_cell(&self, cell: &'a Arc<CellSpec>) -> (Option<Subpack>, SearchStats) {
        let (found, stats) = self.search_cell(cell);
        let cheapest = found
            .into_iter()
            .min_by(|a, b| a.total_price.total_cmp(&b.total_price));
        (cheapest, stats)
    }

    /// Searches every cell of the catalogue in parallel.
    pub fn run(&self) -> (Vec<Subpack>, SearchStats) {
        let per_cell: Vec<(Vec<Subpack>, SearchStats)> = self
            .catalogue
            .cells()
            .par_iter()
            .map(|cell| self.search_cell(cell))
            .collect();

        let mut subpacks = Vec::new();
        let mut stats = SearchStats::default();
        for (found, cell_stats) in per_cell {
            subpacks.extend(found);
            stats += cell_stats;
        }

        log::info!(
            "Single-chemistry search: {} subpacks from {} attempts over {} cells",
            subpacks.len(),
            stats.total_attempts,
            self.catalogue.cells().len()
        );
        (subpacks, stats)
    }
}

/// Builds the subpack record for an electrically evaluated block.
pub(crate) fn assemble_subpack(
    cell: &Arc<CellSpec>,
    pack: &PackElectrical,
    components: SelectedComponents,
    grid: Option<GridLayout>,
    safety: SafetyAssessment,
    durability: DurabilityEstimate,
) -> Subpack {
    let cell_price = cell.price * f64::from(pack.total_cells());
    let total_price = cell_price + components.total_price();

    Subpack {
        cell: Arc::clone(cell),
        series_cells: pack.series,
        parallel_cells: pack.parallel,
        battery_voltage: pack.voltage,
        battery_capacity: pack.capacity_ah,
        battery_energy: pack.energy_wh,
        battery_weight: pack.weight_kg,
        battery_impedance: pack.impedance_ohm,
        continuous_current: pack.continuous_current,
        continuous_power: pack.continuous_power_capability,
        peak_power: pack.peak_power,
        cell_price,
        components,
        total_price,
        layout: grid,
        dimensions: layout::estimate_dimensions(cell, pack.total_cells()),
        safety,
        durability,
    }
}
