//! Thermal and voltage stress scoring of a candidate pack.

use packcore::{CellSpec, SafetyAssessment};

/// C-rate reported when the pack has no capacity to spread current over
pub const UNBOUNDED_C_RATE: f64 = 999.0;

struct LoadBand {
    /// Fraction of the rated C-rate that must be exceeded
    fraction: f64,
    penalty: i32,
    /// Tail of the high-load warning; `None` emits no warning
    warning: Option<&'static str>,
    recommendation: &'static str,
}

/// Checked from the top; the first band exceeded applies.
const LOAD_BANDS: [LoadBand; 4] = [
    LoadBand {
        fraction: 0.8,
        penalty: 50,
        warning: Some(" Cells need cooling."),
        recommendation: "Add spacing (min 2mm) between cells.",
    },
    LoadBand {
        fraction: 0.7,
        penalty: 40,
        warning: Some(" Cells need cooling."),
        recommendation: "Add spacing (min 2mm) between cells.",
    },
    LoadBand {
        fraction: 0.6,
        penalty: 20,
        warning: Some(""),
        recommendation: "Add spacing (min 1mm) between cells.",
    },
    LoadBand {
        fraction: 0.5,
        penalty: 10,
        warning: None,
        recommendation: "Add spacing (min 0.5mm) between cells.",
    },
];

/// Scores a pack drawing `continuous_current` amps through `parallel` strings at `pack_voltage`.
///
/// Exceeding the cell's rated continuous C-rate is a hard gate: the score
/// drops to 0 and the pack is marked unsafe. A C-rate exactly at the limit
/// passes. Voltage penalties never make a pack unsafe on their own.
pub fn assess_safety(cell: &CellSpec, continuous_current: f64, parallel: u32, pack_voltage: f64) -> SafetyAssessment {
    let mut warnings = Vec::new();
    let mut recommendations = Vec::new();
    let mut score: i32 = 100;
    let mut is_safe = true;

    let pack_capacity_ah = cell.capacity_ah * f64::from(parallel);
    let c_rate = if pack_capacity_ah > 0.0 {
        continuous_current / pack_capacity_ah
    } else {
        UNBOUNDED_C_RATE
    };
    let limit = cell.max_continuous_discharge_c;

    if c_rate > limit {
        warnings.push("DANGER: Current exceeds cell limits. Fire risk.".to_string());
        score = 0;
        is_safe = false;
    } else if let Some(band) = LOAD_BANDS.iter().find(|band| c_rate > limit * band.fraction) {
        score -= band.penalty;
        if let Some(tail) = band.warning {
            warnings.push(format!("Warning: High Load ({c_rate:.2}C).{tail}"));
        }
        recommendations.push(band.recommendation.to_string());
    }

    if pack_voltage > 90.0 {
        score -= 40;
        warnings.push("Very High Voltage (>90V): Severe shock risk.".to_string());
        recommendations.push("Use isolated connectors and protective casing.".to_string());
    } else if pack_voltage > 60.0 {
        score -= 20;
        warnings.push("High Voltage (>60V): Lethal shock risk.".to_string());
        recommendations.push("Use isolated connectors.".to_string());
    }

    SafetyAssessment {
        is_safe,
        safety_score: score.clamp(0, 100) as u8,
        warnings,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packcore::Chemistry;

    fn cell_2c() -> CellSpec {
        CellSpec {
            brand: String::new(),
            model: "lfp".to_string(),
            chemistry: Chemistry::Lfp,
            nominal_voltage: 3.2,
            charge_voltage: 3.65,
            capacity_ah: 30.0,
            max_continuous_discharge_c: 2.0,
            max_continuous_charge_c: 1.0,
            max_peak_discharge_c: None,
            impedance_mohm: 1.5,
            thickness_mm: 20.0,
            width_mm: 100.0,
            height_mm: 140.0,
            weight_kg: 0.615,
            cycle_life: 3000,
            price: 12.0,
        }
    }

    #[test]
    fn test_rated_limit_is_not_a_hard_gate() {
        // 60 A through one 30 Ah string = exactly 2C
        let at_limit = assess_safety(&cell_2c(), 60.0, 1, 48.0);
        assert!(at_limit.is_safe);
        assert_eq!(at_limit.safety_score, 50);

        let above = assess_safety(&cell_2c(), 60.0 + 1e-9, 1, 48.0);
        assert!(!above.is_safe);
        assert_eq!(above.safety_score, 0);
        assert_eq!(above.warnings[0], "DANGER: Current exceeds cell limits. Fire risk.");
    }

    #[test]
    fn test_load_bands() {
        let cell = cell_2c();
        // 0.75 of the limit -> 40 point penalty with a cooling warning
        let high = assess_safety(&cell, 45.0, 1, 48.0);
        assert_eq!(high.safety_score, 60);
        assert_eq!(high.warnings, vec!["Warning: High Load (1.50C). Cells need cooling."]);

        // 0.65 of the limit -> 20 points
        let medium = assess_safety(&cell, 39.0, 1, 48.0);
        assert_eq!(medium.safety_score, 80);
        assert_eq!(medium.recommendations, vec!["Add spacing (min 1mm) between cells."]);

        // 0.55 of the limit -> 10 points, recommendation only
        let light = assess_safety(&cell, 33.0, 1, 48.0);
        assert_eq!(light.safety_score, 90);
        assert!(light.warnings.is_empty());

        let idle = assess_safety(&cell, 10.0, 1, 48.0);
        assert_eq!(idle.safety_score, 100);
        assert!(idle.recommendations.is_empty());
    }

    #[test]
    fn test_voltage_penalty_stacks_on_load_penalty() {
        let cell = cell_2c();
        // 0.9 of the limit (-50) plus > 90 V (-40)
        let assessment = assess_safety(&cell, 54.0, 1, 96.0);
        assert!(assessment.is_safe);
        assert_eq!(assessment.safety_score, 10);
        assert_eq!(assessment.warnings.len(), 2);

        let lethal = assess_safety(&cell, 1.0, 4, 64.0);
        assert_eq!(lethal.safety_score, 80);
        assert_eq!(lethal.recommendations, vec!["Use isolated connectors."]);
    }

    #[test]
    fn test_zero_capacity_is_unsafe() {
        let assessment = assess_safety(&cell_2c(), 1.0, 0, 12.0);
        assert!(!assessment.is_safe);
    }
}
