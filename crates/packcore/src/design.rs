//! Search results: subpacks, composite designs and their derived assessments.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cell::CellSpec;
use crate::component::{BmsSpec, CableSpec, ComponentSpec};

/// Rectangular cell arrangement found by the geometry validator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    /// Cells along the width axis
    pub columns: u32,
    /// Cells along the length axis
    pub rows: u32,
    /// Spaced cell pitch along the width axis (mm)
    pub pitch_x_mm: f64,
    /// Spaced cell pitch along the length axis (mm)
    pub pitch_y_mm: f64,
}

impl GridLayout {
    pub fn width_mm(&self) -> f64 {
        f64::from(self.columns) * self.pitch_x_mm
    }

    pub fn length_mm(&self) -> f64 {
        f64::from(self.rows) * self.pitch_y_mm
    }
}

/// Outer pack dimensions (mm)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PackDimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyAssessment {
    pub is_safe: bool,
    /// 0 to 100
    pub safety_score: u8,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurabilityEstimate {
    pub cycles_nominal: f64,
    pub cycles_estimated: f64,
    pub soc_factor: f64,
    pub discharge_factor: f64,
    pub charge_factor: f64,
    pub temperature_factor: f64,
}

/// A cable match together with the thermal sizing that admitted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedCable {
    pub spec: CableSpec,
    /// Minimum copper section from the thermal model (mm²)
    pub required_section_mm2: f64,
    /// Price of the full outbound + return run
    pub run_price: f64,
}

/// Components fitted to a subpack. `None` means "not required" or "no match".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectedComponents {
    pub fuse: Option<ComponentSpec>,
    pub relay: Option<ComponentSpec>,
    pub cable: Option<SelectedCable>,
    pub bms: Option<BmsSpec>,
    pub shunt: Option<ComponentSpec>,
}

impl SelectedComponents {
    pub fn total_price(&self) -> f64 {
        self.fuse.as_ref().map_or(0.0, |c| c.price)
            + self.relay.as_ref().map_or(0.0, |c| c.price)
            + self.cable.as_ref().map_or(0.0, |c| c.run_price)
            + self.bms.as_ref().map_or(0.0, |c| c.master_price)
            + self.shunt.as_ref().map_or(0.0, |c| c.price)
    }
}

/// Single-chemistry pack block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subpack {
    pub cell: Arc<CellSpec>,
    pub series_cells: u32,
    pub parallel_cells: u32,
    /// Nominal pack voltage (V)
    pub battery_voltage: f64,
    /// Pack capacity (Ah)
    pub battery_capacity: f64,
    /// Pack energy at nominal voltage (Wh)
    pub battery_energy: f64,
    /// Cell mass (kg)
    pub battery_weight: f64,
    /// Pack internal resistance (Ω)
    pub battery_impedance: f64,
    /// Current drawn to deliver this subpack's share of the power floor (A)
    pub continuous_current: f64,
    /// Rated continuous power capability (W)
    pub continuous_power: f64,
    /// Rated peak power (W)
    pub peak_power: f64,
    pub cell_price: f64,
    pub components: SelectedComponents,
    pub total_price: f64,
    /// Layout proven by the geometry validator, `None` when geometry was not checked
    pub layout: Option<GridLayout>,
    pub dimensions: PackDimensions,
    pub safety: SafetyAssessment,
    pub durability: DurabilityEstimate,
}

impl Subpack {
    pub fn total_cells(&self) -> u32 {
        self.series_cells * self.parallel_cells
    }

    /// Value-for-money ratio (Wh per currency unit)
    pub fn energy_per_price(&self) -> f64 {
        energy_per_price(self.battery_energy, self.total_price)
    }
}

pub(crate) fn energy_per_price(energy: f64, price: f64) -> f64 {
    if price > 0.0 { energy / price } else { f64::INFINITY }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialKpis {
    pub capex: f64,
    pub annual_opex: f64,
    /// Net cashflow of years 1..=horizon
    pub cashflows: Vec<f64>,
    /// First year whose cumulative cashflow recovers capex
    pub payback_year: Option<u32>,
    pub npv: f64,
    /// `None` when NPV does not change sign over the bisection bracket
    pub irr: Option<f64>,
    /// Sum of cashflows minus capex
    pub lifetime_profit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolvePath {
    /// Integer program solved directly
    Integer,
    /// Continuous relaxation solved and every variable rounded up
    RelaxedRounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DesignOrigin {
    SingleChemistry,
    MultiChemistry { energy_split_pct: u8, power_split_pct: u8 },
    GlobalOptimum { solve_path: SolvePath },
}

/// Requirement bounds a design was not checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelaxedCheck {
    /// Subpacks were placed individually; their joint footprint was not validated
    CombinedGeometry,
}

/// Top-level result: one or more subpacks with aggregate and financial metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryDesign {
    pub origin: DesignOrigin,
    pub subpacks: Vec<Subpack>,
    pub total_energy: f64,
    pub total_continuous_power: f64,
    pub total_peak_power: f64,
    pub total_weight: f64,
    pub total_price: f64,
    /// Subpack safety scores weighted by cell count
    pub safety_score: u8,
    /// Nominal cycle ratings weighted by cell count
    pub weighted_cycles_nominal: f64,
    /// Durability-model cycle estimates weighted by cell count
    pub weighted_cycles_estimated: f64,
    pub financials: FinancialKpis,
    pub relaxed_checks: Vec<RelaxedCheck>,
}

impl BatteryDesign {
    pub fn energy_per_price(&self) -> f64 {
        energy_per_price(self.total_energy, self.total_price)
    }

    pub fn total_cells(&self) -> u32 {
        self.subpacks.iter().map(Subpack::total_cells).sum()
    }

    pub fn is_safe(&self) -> bool {
        self.subpacks.iter().all(|s| s.safety.is_safe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_total_price_skips_absent_parts() {
        let components = SelectedComponents {
            fuse: Some(ComponentSpec {
                brand: String::new(),
                model: "f".to_string(),
                vdc_max: 58.0,
                a_max: 100.0,
                price: 3.5,
                temp_min: None,
                temp_max: None,
                link: String::new(),
            }),
            ..Default::default()
        };
        assert!((components.total_price() - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_grid_layout_extent() {
        let layout = GridLayout { columns: 3, rows: 5, pitch_x_mm: 20.2, pitch_y_mm: 100.2 };
        assert!((layout.width_mm() - 60.6).abs() < 1e-9);
        assert!((layout.length_mm() - 501.0).abs() < 1e-9);
    }

    #[test]
    fn test_origin_serializes_with_kind_tag() {
        let origin = DesignOrigin::MultiChemistry { energy_split_pct: 75, power_split_pct: 25 };
        let json = serde_json::to_value(origin).unwrap();
        assert_eq!(json["kind"], "multi_chemistry");
        assert_eq!(json["energy_split_pct"], 75);
    }
}
