//! Empirical cycle-life model.
//!
//! `cycles = nominal × soc × discharge × charge × temperature`. Each stress
//! term is `(requested / rated)^(-1/k)` with the requested ratio floored, so
//! lighter-than-rated use extends life and heavier use shortens it. The
//! temperature term is Arrhenius-style around 25 °C.

use packcore::{CellSpec, DurabilityEstimate, Requirements};
use serde::{Deserialize, Serialize};

const KELVIN_OFFSET: f64 = 273.15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurabilityModel {
    /// Depth-of-discharge swing of the usage profile
    pub requested_dod: f64,
    /// Depth-of-discharge swing the cycle rating was measured at
    pub rated_dod: f64,
    pub k_soc: f64,
    pub k_discharge: f64,
    pub k_charge: f64,
    /// Activation energy over the gas constant (K)
    pub activation_temperature_k: f64,
    /// Temperature the cycle rating was measured at (K)
    pub reference_temperature_k: f64,
    /// Lower bound on every requested/rated stress ratio
    pub stress_ratio_floor: f64,
}

impl Default for DurabilityModel {
    fn default() -> Self {
        Self {
            requested_dod: 0.8,
            rated_dod: 1.0,
            k_soc: 1.5,
            k_discharge: 4.0,
            k_charge: 3.0,
            activation_temperature_k: 3600.0,
            reference_temperature_k: 298.15,
            stress_ratio_floor: 0.1,
        }
    }
}

impl DurabilityModel {
    pub fn with_requested_dod(mut self, requested_dod: f64) -> Self {
        self.requested_dod = requested_dod;
        self
    }

    fn stress_term(&self, requested: f64, rated: f64, k: f64) -> f64 {
        let ratio = if rated > 0.0 { requested / rated } else { 1.0 };
        ratio.max(self.stress_ratio_floor).powf(-1.0 / k)
    }

    pub fn temperature_factor(&self, ambient_c: f64) -> f64 {
        let t_k = ambient_c + KELVIN_OFFSET;
        (self.activation_temperature_k * (1.0 / t_k - 1.0 / self.reference_temperature_k)).exp()
    }

    /// Cycle life of `series × parallel` cells delivering `average_power` watts at `ambient_c`.
    ///
    /// Charging is assumed to mirror discharge, so the same average power
    /// sets both C-rates.
    pub fn estimate_at(
        &self,
        cell: &CellSpec,
        series: u32,
        parallel: u32,
        average_power: f64,
        ambient_c: f64,
    ) -> DurabilityEstimate {
        let pack_voltage = f64::from(series) * cell.nominal_voltage;
        let pack_capacity_ah = f64::from(parallel) * cell.capacity_ah;
        let requested_c = if pack_voltage > 0.0 && pack_capacity_ah > 0.0 {
            average_power / pack_voltage / pack_capacity_ah
        } else {
            0.0
        };

        let soc_factor = self.stress_term(self.requested_dod, self.rated_dod, self.k_soc);
        let discharge_factor = self.stress_term(requested_c, cell.max_continuous_discharge_c, self.k_discharge);
        let charge_factor = self.stress_term(requested_c, cell.max_continuous_charge_c, self.k_charge);
        let temperature_factor = self.temperature_factor(ambient_c);

        let cycles_nominal = f64::from(cell.cycle_life);
        DurabilityEstimate {
            cycles_nominal,
            cycles_estimated: cycles_nominal * soc_factor * discharge_factor * charge_factor * temperature_factor,
            soc_factor,
            discharge_factor,
            charge_factor,
            temperature_factor,
        }
    }

    /// `estimate_at` with the power floor and ambient temperature of `requirements`
    pub fn estimate(&self, cell: &CellSpec, series: u32, parallel: u32, requirements: &Requirements) -> DurabilityEstimate {
        self.estimate_at(
            cell,
            series,
            parallel,
            requirements.min_continuous_power,
            requirements.ambient_temp,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use packcore::Chemistry;

    fn cell() -> CellSpec {
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
    fn test_reference_temperature_is_neutral() {
        let model = DurabilityModel::default();
        assert_relative_eq!(model.temperature_factor(25.0), 1.0, epsilon = 1e-12);
        assert!(model.temperature_factor(45.0) < 1.0);
        assert!(model.temperature_factor(5.0) > 1.0);
    }

    #[test]
    fn test_factors_at_rated_load() {
        let model = DurabilityModel::default();
        // 10 S x 1 P at 32 V, 30 Ah; 960 W -> 1C: half the discharge rating, full charge rating
        let estimate = model.estimate_at(&cell(), 10, 1, 960.0, 25.0);

        assert_relative_eq!(estimate.soc_factor, 0.8f64.powf(-1.0 / 1.5), epsilon = 1e-12);
        assert_relative_eq!(estimate.discharge_factor, 0.5f64.powf(-0.25), epsilon = 1e-12);
        assert_relative_eq!(estimate.charge_factor, 1.0, epsilon = 1e-12);
        assert_relative_eq!(
            estimate.cycles_estimated,
            3000.0 * estimate.soc_factor * estimate.discharge_factor,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_idle_load_is_floored() {
        let model = DurabilityModel::default();
        let idle = model.estimate_at(&cell(), 10, 1, 0.0, 25.0);
        assert_relative_eq!(idle.discharge_factor, 0.1f64.powf(-0.25), epsilon = 1e-12);
        assert_relative_eq!(idle.charge_factor, 0.1f64.powf(-1.0 / 3.0), epsilon = 1e-12);
    }
}
