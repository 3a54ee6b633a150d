//! Discounted-cashflow evaluation of a storage pack used for energy arbitrage.

pub mod cashflow;

pub use cashflow::{FinancialParams, evaluate, irr, npv, payback_year};
