//! Diagnostic counters reported when a request sets `debug`.

use std::ops::AddAssign;

use packcore::ComponentKind;
use serde::{Deserialize, Serialize};

/// Why a candidate configuration was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Cell plus clearance is taller than the envelope
    Height,
    /// No whole series count lands in the voltage window
    VoltageWindow,
    Weight,
    Geometry,
    /// Hard safety gate: current above the cell's rated C-rate
    Unsafe,
    Energy,
    Power,
    MissingComponent(ComponentKind),
    Price,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    /// (cell, series, parallel) candidates evaluated
    pub total_attempts: u64,
    pub valid_configurations: u64,
    /// Cells skipped before enumeration
    pub rejected_height: u64,
    pub rejected_voltage_window: u64,
    pub rejected_weight: u64,
    pub rejected_geometry: u64,
    pub rejected_unsafe: u64,
    pub rejected_energy: u64,
    pub rejected_power: u64,
    pub missing_fuse: u64,
    pub missing_relay: u64,
    pub missing_cable: u64,
    pub missing_bms: u64,
    pub missing_shunt: u64,
    pub rejected_price: u64,
    /// (pair, split) combinations tried by the multi-chemistry stage
    pub multi_combinations: u64,
    /// Combinations with a share that had no feasible subpack
    pub multi_infeasible_share: u64,
    /// Combinations whose combined weight or price broke the budget
    pub multi_over_budget: u64,
    pub multi_designs: u64,
    pub optimizer_variables: u64,
    pub optimizer_relaxed_fallbacks: u64,
    pub optimizer_failures: u64,
    /// Set when a deadline stopped the search early
    pub truncated: bool,
}

impl SearchStats {
    pub fn record(&mut self, rejection: Rejection) {
        let counter = match rejection {
            Rejection::Height => &mut self.rejected_height,
            Rejection::VoltageWindow => &mut self.rejected_voltage_window,
            Rejection::Weight => &mut self.rejected_weight,
            Rejection::Geometry => &mut self.rejected_geometry,
            Rejection::Unsafe => &mut self.rejected_unsafe,
            Rejection::Energy => &mut self.rejected_energy,
            Rejection::Power => &mut self.rejected_power,
            Rejection::MissingComponent(ComponentKind::Fuse) => &mut self.missing_fuse,
            Rejection::MissingComponent(ComponentKind::Relay) => &mut self.missing_relay,
            Rejection::MissingComponent(ComponentKind::Cable) => &mut self.missing_cable,
            Rejection::MissingComponent(ComponentKind::Bms) => &mut self.missing_bms,
            Rejection::MissingComponent(ComponentKind::Shunt) => &mut self.missing_shunt,
            Rejection::Price => &mut self.rejected_price,
        };
        *counter += 1;
    }

    /// Candidates dropped after enumeration
    pub fn candidate_rejections(&self) -> u64 {
        self.rejected_weight
            + self.rejected_geometry
            + self.rejected_unsafe
            + self.rejected_energy
            + self.rejected_power
            + self.missing_fuse
            + self.missing_relay
            + self.missing_cable
            + self.missing_bms
            + self.missing_shunt
            + self.rejected_price
    }
}

impl AddAssign for SearchStats {
    fn add_assign(&mut self, other: Self) {
        self.total_attempts += other.total_attempts;
        self.valid_configurations += other.valid_configurations;
        self.rejected_height += other.rejected_height;
        self.rejected_voltage_window += other.rejected_voltage_window;
        self.rejected_weight += other.rejected_weight;
        self.rejected_geometry += other.rejected_geometry;
        self.rejected_unsafe += other.rejected_unsafe;
        self.rejected_energy += other.rejected_energy;
        self.rejected_power += other.rejected_power;
        self.missing_fuse += other.missing_fuse;
        self.missing_relay += other.missing_relay;
        self.missing_cable += other.missing_cable;
        self.missing_bms += other.missing_bms;
        self.missing_shunt += other.missing_shunt;
        self.rejected_price += other.rejected_price;
        self.multi_combinations += other.multi_combinations;
        self.multi_infeasible_share += other.multi_infeasible_share;
        self.multi_over_budget += other.multi_over_budget;
        self.multi_designs += other.multi_designs;
        self.optimizer_variables += other.optimizer_variables;
        self.optimizer_relaxed_fallbacks += other.optimizer_relaxed_fallbacks;
        self.optimizer_failures += other.optimizer_failures;
        self.truncated |= other.truncated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_and_serialize() {
        let mut a = SearchStats::default();
        a.total_attempts = 3;
        a.record(Rejection::Weight);
        a.record(Rejection::MissingComponent(ComponentKind::Bms));

        let mut b = SearchStats::default();
        b.total_attempts = 2;
        b.valid_configurations = 1;
        b.record(Rejection::Price);
        b.truncated = true;

        a += b;
        assert_eq!(a.total_attempts, 5);
        assert_eq!(a.candidate_rejections(), 3);
        assert!(a.truncated);

        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["totalAttempts"], 5);
        assert_eq!(json["validConfigurations"], 1);
        assert_eq!(json["missingBms"], 1);
    }
}
