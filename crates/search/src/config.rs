//! Search configuration.

use std::time::{Duration, Instant};

use economics::FinancialParams;
use electrical::{CableThermalModel, ComponentPolicies, DurabilityModel, SelectionPolicy};
use serde::{Deserialize, Serialize};

/// Limits on the integer program before it falls back to the relaxed-and-rounded solve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverBudget {
    /// Integer decision variables (one per eligible chemistry) attempted exactly
    pub max_integer_variables: usize,
    /// Upper bound on each chemistry's parallel string count
    pub max_strings_per_chemistry: u32,
    /// Wall-clock time the integer solve may take; the search deadline also applies
    pub integer_time_limit_ms: Option<u64>,
}

impl Default for SolverBudget {
    fn default() -> Self {
        Self {
            max_integer_variables: 64,
            max_strings_per_chemistry: 50,
            integer_time_limit_ms: Some(5_000),
        }
    }
}

/// Configuration for one `DesignEngine`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Highest parallel count enumerated per series count (inclusive)
    pub max_parallel: u32,
    /// Designs returned in `results`
    pub top_results: usize,
    /// Designs returned in `plot_results`
    pub plot_results: usize,
    pub selection_policy: SelectionPolicy,
    pub component_policies: ComponentPolicies,
    pub cable_model: CableThermalModel,
    pub durability: DurabilityModel,
    pub financial: FinancialParams,
    /// Energy and power split percentages tried by the multi-chemistry stage
    pub split_grid_pct: Vec<u8>,
    pub enable_multi: bool,
    pub enable_optimizer: bool,
    pub solver_budget: SolverBudget,
    /// Wall-clock budget per run, converted into a deadline when the run starts
    pub time_limit_ms: Option<u64>,
    /// Absolute deadline; takes precedence over `time_limit_ms`
    #[serde(skip)]
    pub deadline: Option<Instant>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_parallel: 5,
            top_results: 30,
            plot_results: 100,
            selection_policy: SelectionPolicy::default(),
            component_policies: ComponentPolicies::default(),
            cable_model: CableThermalModel::default(),
            durability: DurabilityModel::default(),
            financial: FinancialParams::default(),
            split_grid_pct: vec![0, 25, 50, 75, 100],
            enable_multi: true,
            enable_optimizer: true,
            solver_budget: SolverBudget::default(),
            time_limit_ms: None,
            deadline: None,
        }
    }
}

impl SearchConfig {
    pub fn with_max_parallel(mut self, max_parallel: u32) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    pub fn with_cutoffs(mut self, top_results: usize, plot_results: usize) -> Self {
        self.top_results = top_results;
        self.plot_results = plot_results;
        self
    }

    pub fn with_selection_policy(mut self, policy: SelectionPolicy) -> Self {
        self.selection_policy = policy;
        self
    }

    pub fn with_component_policies(mut self, policies: ComponentPolicies) -> Self {
        self.component_policies = policies;
        self
    }

    pub fn with_financial(mut self, financial: FinancialParams) -> Self {
        self.financial = financial;
        self
    }

    pub fn with_split_grid(mut self, split_grid_pct: Vec<u8>) -> Self {
        self.split_grid_pct = split_grid_pct;
        self
    }

    pub fn with_multi(mut self, enabled: bool) -> Self {
        self.enable_multi = enabled;
        self
    }

    pub fn with_optimizer(mut self, enabled: bool) -> Self {
        self.enable_optimizer = enabled;
        self
    }

    pub fn with_solver_budget(mut self, budget: SolverBudget) -> Self {
        self.solver_budget = budget;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_ms = Some(limit.as_millis() as u64);
        self
    }

    /// Deadline for a run starting now
    pub fn resolve_deadline(&self) -> Option<Instant> {
        self.deadline
            .or_else(|| self.time_limit_ms.map(|ms| Instant::now() + Duration::from_millis(ms)))
    }
}

/// Whether `deadline` has passed
pub(crate) fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}
