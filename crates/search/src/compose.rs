//! Aggregation of subpacks into a `BatteryDesign`.

use economics::FinancialParams;
use packcore::{BatteryDesign, DesignOrigin, RelaxedCheck, Requirements, Subpack};

use crate::stats::Rejection;

/// Sums the subpack totals and attaches the financial KPIs.
///
/// Safety score and cycle figures are averaged with each subpack weighted by
/// its cell count.
pub fn compose_design(
    subpacks: Vec<Subpack>,
    origin: DesignOrigin,
    relaxed_checks: Vec<RelaxedCheck>,
    financial: &FinancialParams,
) -> BatteryDesign {
    let total_energy: f64 = subpacks.iter().map(|s| s.battery_energy).sum();
    let total_continuous_power = subpacks.iter().map(|s| s.continuous_power).sum();
    let total_peak_power = subpacks.iter().map(|s| s.peak_power).sum();
    let total_weight = subpacks.iter().map(|s| s.battery_weight).sum();
    let total_price: f64 = subpacks.iter().map(|s| s.total_price).sum();

    let cells: f64 = subpacks.iter().map(|s| f64::from(s.total_cells())).sum();
    let weighted = |value: fn(&Subpack) -> f64| -> f64 {
        if cells > 0.0 {
            subpacks.iter().map(|s| value(s) * f64::from(s.total_cells())).sum::<f64>() / cells
        } else {
            0.0
        }
    };
    let safety_score = weighted(|s| f64::from(s.safety.safety_score)).round().clamp(0.0, 100.0) as u8;
    let weighted_cycles_nominal = weighted(|s| s.durability.cycles_nominal);
    let weighted_cycles_estimated = weighted(|s| s.durability.cycles_estimated);

    let financials = economics::evaluate(financial, total_price, total_energy, weighted_cycles_estimated);

    BatteryDesign {
        origin,
        subpacks,
        total_energy,
        total_continuous_power,
        total_peak_power,
        total_weight,
        total_price,
        safety_score,
        weighted_cycles_nominal,
        weighted_cycles_estimated,
        financials,
        relaxed_checks,
    }
}

/// One-subpack design from the single-chemistry stage
pub fn single_design(subpack: Subpack, financial: &FinancialParams) -> BatteryDesign {
    compose_design(vec![subpack], DesignOrigin::SingleChemistry, Vec::new(), financial)
}

/// Combined weight and price against the envelope
pub fn check_budget(design: &BatteryDesign, requirements: &Requirements) -> Result<(), Rejection> {
    if design.total_weight > requirements.max_weight {
        return Err(Rejection::Weight);
    }
    if design.total_price > requirements.max_price {
        return Err(Rejection::Price);
    }
    Ok(())
}

/// Best value for money first
pub fn rank_designs(designs: &mut [BatteryDesign]) {
    designs.sort_by(|a, b| b.energy_per_price().total_cmp(&a.energy_per_price()));
}
