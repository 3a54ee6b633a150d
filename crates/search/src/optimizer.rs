//! Global mix optimizer.
//!
//! Every chemistry whose series count fits the voltage window contributes one
//! integer variable: its number of parallel strings. The program minimises
//! cell cost subject to the energy and power floors. When the integer program
//! is over budget, runs past its time limit or fails, the continuous
//! relaxation is solved and each variable rounded up, which keeps both floors
//! satisfied.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use electrical::{ComponentSelector, PackElectrical, SelectionOutcome, assess_safety};
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable, constraint, microlp, variable,
};
use packcore::{BatteryDesign, Catalogue, CellSpec, ComponentKind, DesignOrigin, RelaxedCheck, Requirements, SolvePath};
use thiserror::Error;

use crate::candidates::series_range;
use crate::compose::{check_budget, compose_design};
use crate::config::SearchConfig;
use crate::single::assemble_subpack;
use crate::stats::{Rejection, SearchStats};

/// Slack when rounding a relaxed solution up to whole strings
const ROUNDING_EPSILON: f64 = 1e-9;

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("no chemistry fits the voltage window and height bound")]
    NoEligibleChemistry,
    #[error("solver failed: {0}")]
    Solver(#[from] ResolutionError),
    #[error("optimal mix selects no strings")]
    EmptyMix,
    #[error("no {0} matches a chemistry of the optimal mix")]
    MissingComponent(ComponentKind),
    #[error("{0} strings of the optimal mix fit no grid inside the envelope")]
    NoLayout(String),
    #[error("optimal mix breaks the {0} budget")]
    OverBudget(&'static str),
}

/// One chemistry's string at the smallest series count in the voltage window.
#[derive(Debug, Clone)]
pub struct EligibleString<'a> {
    pub cell: &'a Arc<CellSpec>,
    pub series: u32,
    /// Wh per parallel string
    pub energy: f64,
    /// Continuous W per parallel string
    pub power: f64,
    /// Cell cost per parallel string
    pub cost: f64,
    pub max_strings: u32,
}

/// Chemistries taking part in the mix
pub fn eligible_strings<'a>(cells: &'a [Arc<CellSpec>], requirements: &Requirements, max_strings: u32) -> Vec<EligibleString<'a>> {
    cells
        .iter()
        .filter(|cell| layout::clears_height(cell.height_mm, requirements.max_height))
        .filter_map(|cell| {
            let series = *series_range(cell, requirements)?.start();
            let voltage = f64::from(series) * cell.nominal_voltage;
            Some(EligibleString {
                cell,
                series,
                energy: voltage * cell.capacity_ah,
                power: f64::from(series) * cell.continuous_power_w(),
                cost: f64::from(series) * cell.price,
                max_strings,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct MixTerm {
    energy: f64,
    power: f64,
    cost: f64,
    max_strings: u32,
}

/// Owned coefficients of the mix program, so a solve can move to another thread.
#[derive(Debug, Clone)]
pub struct MixProgram {
    terms: Vec<MixTerm>,
    min_energy: f64,
    min_power: f64,
}

impl MixProgram {
    pub fn new(strings: &[EligibleString<'_>], requirements: &Requirements) -> Self {
        Self {
            terms: strings
                .iter()
                .map(|s| MixTerm {
                    energy: s.energy,
                    power: s.power,
                    cost: s.cost,
                    max_strings: s.max_strings,
                })
                .collect(),
            min_energy: requirements.min_energy,
            min_power: requirements.min_continuous_power,
        }
    }

    /// String count of each chemistry, in the order the program was built from
    pub fn solve(&self, integer: bool) -> Result<Vec<f64>, ResolutionError> {
        let mut vars = ProblemVariables::new();
        let counts: Vec<Variable> = self
            .terms
            .iter()
            .map(|t| {
                let definition = variable().min(0).max(f64::from(t.max_strings));
                vars.add(if integer { definition.integer() } else { definition })
            })
            .collect();

        let cost: Expression = self.terms.iter().zip(&counts).map(|(t, &x)| t.cost * x).sum();
        let energy: Expression = self.terms.iter().zip(&counts).map(|(t, &x)| t.energy * x).sum();
        let power: Expression = self.terms.iter().zip(&counts).map(|(t, &x)| t.power * x).sum();

        let solution = vars
            .minimise(cost)
            .using(microlp)
            .with(constraint!(energy >= self.min_energy))
            .with(constraint!(power >= self.min_power))
            .solve()?;

        Ok(counts.iter().map(|&x| solution.value(x).max(0.0)).collect())
    }

    /// Integer solve on a worker thread, given up once `limit` passes.
    ///
    /// `None` when the limit is reached first; the abandoned solve finishes on
    /// its own thread and its result is dropped.
    pub fn solve_integer_before(self, limit: Instant) -> Option<Result<Vec<f64>, ResolutionError>> {
        let remaining = limit.checked_duration_since(Instant::now())?;
        if remaining.is_zero() {
            return None;
        }

        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new().name("mix-ilp".to_string()).spawn(move || {
            // The receiver is gone when the limit already passed
            let _ = tx.send(self.solve(true));
        });
        if let Err(e) = spawned {
            log::warn!("Could not start the integer solve: {e}");
            return None;
        }
        rx.recv_timeout(remaining).ok()
    }
}

/// Solves the mix program, returning the string count of each chemistry.
pub fn solve_mix(strings: &[EligibleString<'_>], requirements: &Requirements, integer: bool) -> Result<Vec<f64>, ResolutionError> {
    MixProgram::new(strings, requirements).solve(integer)
}

pub struct MixOptimizer<'a> {
    catalogue: &'a Catalogue,
    requirements: &'a Requirements,
    config: &'a SearchConfig,
    deadline: Option<Instant>,
}

impl<'a> MixOptimizer<'a> {
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

    /// Moment the integer solve is given up: the sooner of its own time
    /// budget and the search deadline
    fn integer_limit(&self) -> Option<Instant> {
        let budget = self
            .config
            .solver_budget
            .integer_time_limit_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));
        match (budget, self.deadline) {
            (Some(budget), Some(deadline)) => Some(budget.min(deadline)),
            (budget, deadline) => budget.or(deadline),
        }
    }

    /// Whole string counts per eligible chemistry and the path that produced them
    fn string_counts(
        &self,
        strings: &[EligibleString<'_>],
        stats: &mut SearchStats,
    ) -> Result<(Vec<u32>, SolvePath), OptimizerError> {
        let budget = self.config.solver_budget;

        if strings.len() <= budget.max_integer_variables {
            let program = MixProgram::new(strings, self.requirements);
            let attempt = match self.integer_limit() {
                Some(limit) => program.solve_integer_before(limit),
                None => Some(program.solve(true)),
            };
            match attempt {
                Some(Ok(values)) => {
                    let counts = values.iter().map(|v| v.round() as u32).collect();
                    return Ok((counts, SolvePath::Integer));
                }
                Some(Err(e)) => log::warn!("Integer mix program failed ({e}), solving the relaxation"),
                None => log::warn!("Integer mix program ran out of time, solving the relaxation"),
            }
        } else {
            log::debug!(
                "{} variables over an integer budget of {}, solving the relaxation",
                strings.len(),
                budget.max_integer_variables
            );
        }

        stats.optimizer_relaxed_fallbacks += 1;
        let values = solve_mix(strings, self.requirements, false)?;
        let counts = values
            .iter()
            .map(|v| (v - ROUNDING_EPSILON).ceil().max(0.0) as u32)
            .collect();
        Ok((counts, SolvePath::RelaxedRounded))
    }

    /// Cheapest mix meeting the energy and power floors, as a full design.
    pub fn run(&self, stats: &mut SearchStats) -> Result<BatteryDesign, OptimizerError> {
        let req = self.requirements;
        let strings = eligible_strings(
            self.catalogue.cells(),
            req,
            self.config.solver_budget.max_strings_per_chemistry,
        );
        if strings.is_empty() {
            return Err(OptimizerError::NoEligibleChemistry);
        }
        stats.optimizer_variables += strings.len() as u64;

        let (counts, solve_path) = self.string_counts(&strings, stats)?;

        let chosen: Vec<(&EligibleString<'_>, u32)> =
            strings.iter().zip(counts).filter(|(_, count)| *count > 0).collect();
        let total_capability: f64 = chosen.iter().map(|(s, count)| s.power * f64::from(*count)).sum();
        if chosen.is_empty() || total_capability <= 0.0 {
            return Err(OptimizerError::EmptyMix);
        }

        let selector = ComponentSelector::new(
            self.catalogue.components(),
            self.config.selection_policy,
            self.config.component_policies,
            self.config.cable_model,
            req.ambient_temp,
        );

        let mut subpacks = Vec::with_capacity(chosen.len());
        for (string, count) in chosen {
            let cell = string.cell;
            let power_share = string.power * f64::from(count) / total_capability * req.min_continuous_power;
            let pack = PackElectrical::new(cell, string.series, count, power_share);

            let components = match selector.select_for(&pack) {
                SelectionOutcome::Selected(components) => components,
                SelectionOutcome::Missing(kind) => return Err(OptimizerError::MissingComponent(kind)),
            };
            let grid = layout::find_layout(
                cell.thickness_mm,
                cell.width_mm,
                pack.total_cells(),
                req.max_width,
                req.max_length,
            )
            .ok_or_else(|| OptimizerError::NoLayout(cell.label()))?;
            let safety = assess_safety(cell, pack.continuous_current, pack.parallel, pack.voltage);
            let durability = self
                .config
                .durability
                .estimate_at(cell, pack.series, pack.parallel, power_share, req.ambient_temp);

            log::debug!("Mix: {} x {}S{}P", cell.label(), pack.series, pack.parallel);
            subpacks.push(assemble_subpack(cell, &pack, components, Some(grid), safety, durability));
        }

        let relaxed = if subpacks.len() > 1 {
            vec![RelaxedCheck::CombinedGeometry]
        } else {
            Vec::new()
        };
        let design = compose_design(
            subpacks,
            DesignOrigin::GlobalOptimum { solve_path },
            relaxed,
            &self.config.financial,
        );
        match check_budget(&design, req) {
            Err(Rejection::Weight) => Err(OptimizerError::OverBudget("weight")),
            Err(_) => Err(OptimizerError::OverBudget("price")),
            Ok(()) => {
                log::info!(
                    "Global optimum: {} subpacks, {:.0} Wh for {:.2} ({:?})",
                    design.subpacks.len(),
                    design.total_energy,
                    design.total_price,
                    solve_path
                );
                Ok(design)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packcore::Chemistry;

    fn cell(model: &str, nominal: f64, capacity: f64, price: f64) -> Arc<CellSpec> {
        Arc::new(CellSpec {
            brand: String::new(),
            model: model.to_string(),
            chemistry: Chemistry::Lfp,
            nominal_voltage: nominal,
            charge_voltage: nominal + 0.45,
            capacity_ah: capacity,
            max_continuous_discharge_c: 2.0,
            max_continuous_charge_c: 1.0,
            max_peak_discharge_c: None,
            impedance_mohm: 1.5,
            thickness_mm: 20.0,
            width_mm: 100.0,
            height_mm: 140.0,
            weight_kg: 0.615,
            cycle_life: 3000,
            price,
        })
    }

    fn requirements() -> Requirements {
        Requirements {
            min_voltage: 48.0,
            max_voltage: 52.0,
            min_energy: 5000.0,
            min_continuous_power: 2000.0,
            max_weight: 100.0,
            max_price: 5000.0,
            max_width: 1000.0,
            max_length: 1000.0,
            max_height: 500.0,
            ambient_temp: 25.0,
            debug: false,
        }
    }

    #[test]
    fn test_eligible_strings_use_minimum_series() {
        let cells = vec![cell("a", 3.2, 30.0, 12.0), cell("b", 3.7, 50.0, 20.0)];
        let strings = eligible_strings(&cells, &requirements(), 50);
        assert_eq!(strings.len(), 2);
        assert_eq!(strings[0].series, 15);
        assert!((strings[0].energy - 1440.0).abs() < 1e-9);
        assert!((strings[0].cost - 180.0).abs() < 1e-9);
        assert_eq!(strings[1].series, 13);
    }

    #[test]
    fn test_integer_mix_meets_floors() {
        let cells = vec![cell("a", 3.2, 30.0, 12.0), cell("b", 3.2, 50.0, 25.0)];
        let req = requirements();
        let strings = eligible_strings(&cells, &req, 50);
        let values = solve_mix(&strings, &req, true).unwrap();

        let energy: f64 = strings.iter().zip(&values).map(|(s, x)| s.energy * x.round()).sum();
        let power: f64 = strings.iter().zip(&values).map(|(s, x)| s.power * x.round()).sum();
        assert!(energy >= req.min_energy - 1e-6);
        assert!(power >= req.min_continuous_power - 1e-6);
        // Four 30 Ah strings (720) beat two 30 Ah plus one 50 Ah string (735)
        assert_eq!(values[0].round() as u32, 4);
        assert_eq!(values[1].round() as u32, 0);
    }

    #[test]
    fn test_relaxed_rounding_keeps_floors() {
        let cells = vec![cell("a", 3.2, 30.0, 12.0), cell("b", 3.2, 50.0, 25.0)];
        let req = requirements();
        let strings = eligible_strings(&cells, &req, 50);
        let values = solve_mix(&strings, &req, false).unwrap();
        let rounded: Vec<f64> = values.iter().map(|v| (v - ROUNDING_EPSILON).ceil().max(0.0)).collect();
        let energy: f64 = strings.iter().zip(&rounded).map(|(s, x)| s.energy * x).sum();
        assert!(energy >= req.min_energy - 1e-6);
    }

    #[test]
    fn test_no_chemistry_in_window() {
        let cells = vec![cell("a", 3.2, 30.0, 12.0)];
        let mut req = requirements();
        req.min_voltage = 50.0;
        req.max_voltage = 51.0;
        assert!(eligible_strings(&cells, &req, 50).is_empty());
    }

    #[test]
    fn test_integer_solve_gives_up_at_its_limit() {
        let cells = vec![cell("a", 3.2, 30.0, 12.0), cell("b", 3.2, 50.0, 25.0)];
        let req = requirements();
        let program = MixProgram::new(&eligible_strings(&cells, &req, 50), &req);

        assert!(program.clone().solve_integer_before(Instant::now()).is_none());

        let threaded = program
            .clone()
            .solve_integer_before(Instant::now() + Duration::from_secs(60))
            .expect("finished in time")
            .unwrap();
        assert_eq!(threaded, program.solve(true).unwrap());
    }

    #[test]
    fn test_infeasible_string_bound_fails() {
        let cells = vec![cell("a", 3.2, 30.0, 12.0)];
        let req = requirements();
        let strings = eligible_strings(&cells, &req, 2);
        assert!(solve_mix(&strings, &req, false).is_err());
    }
}
