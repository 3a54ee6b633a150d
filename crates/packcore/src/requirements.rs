use serde::{Deserialize, Serialize};

/// Buyer requirements for one search invocation.
///
/// Voltages in V, energy in Wh, power in W, weight in kg, footprint in mm,
/// temperature in °C. Field names follow the upstream request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    pub min_voltage: f64,
    pub max_voltage: f64,
    pub min_energy: f64,
    pub min_continuous_power: f64,
    pub max_weight: f64,
    pub max_price: f64,
    pub max_width: f64,
    pub max_length: f64,
    pub max_height: f64,
    pub ambient_temp: f64,
    /// Request diagnostic counters alongside the results
    #[serde(default)]
    pub debug: bool,
}

impl Requirements {
    /// Copy of these requirements carrying only a fraction of the energy and power floors.
    ///
    /// All other bounds (voltage window, weight, price, footprint) are kept whole.
    pub fn with_share(&self, energy_fraction: f64, power_fraction: f64) -> Self {
        Self {
            min_energy: self.min_energy * energy_fraction,
            min_continuous_power: self.min_continuous_power * power_fraction,
            ..self.clone()
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
