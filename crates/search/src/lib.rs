//! Design-space search over a cell and component catalogue.
//!
//! `DesignEngine::run` enumerates single-chemistry packs, combines pairs of
//! chemistries over a grid of energy and power splits, and solves a global
//! mix program. The result is one list ranked by energy per unit price.

pub mod candidates;
pub mod compose;
pub mod config;
pub mod engine;
pub mod multi;
pub mod optimizer;
pub mod single;
pub mod stats;

pub use candidates::{Candidate, CandidateSpace, Enumerated, series_range};
pub use compose::{check_budget, compose_design, rank_designs, single_design};
pub use config::{SearchConfig, SolverBudget};
pub use engine::{DesignEngine, SearchOutcome};
pub use multi::{MultiChemistrySearch, Share};
pub use optimizer::{EligibleString, MixOptimizer, MixProgram, OptimizerError, eligible_strings, solve_mix};
pub use single::SingleChemistrySearch;
pub use stats::{Rejection, SearchStats};
