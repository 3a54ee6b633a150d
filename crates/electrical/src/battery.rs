use packcore::CellSpec;

/// Lumped electrics of an S×P block of identical cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackElectrical {
    pub series: u32,
    pub parallel: u32,
    /// Nominal voltage (V)
    pub voltage: f64,
    /// Fully charged voltage (V)
    pub charge_voltage: f64,
    /// Capacity (Ah)
    pub capacity_ah: f64,
    /// Energy at nominal voltage (Wh)
    pub energy_wh: f64,
    /// Cell mass (kg)
    pub weight_kg: f64,
    /// Internal resistance (Ω)
    pub impedance_ohm: f64,
    /// Current drawn to deliver the requested power at nominal voltage (A)
    pub continuous_current: f64,
    /// Rated continuous power capability (W)
    pub continuous_power_capability: f64,
    /// Rated peak current (A)
    pub peak_current: f64,
    /// Rated peak power (W)
    pub peak_power: f64,
}

impl PackElectrical {
    /// Electrics of `series × parallel` cells asked to supply `required_power` watts.
    pub fn new(cell: &CellSpec, series: u32, parallel: u32, required_power: f64) -> Self {
        let s = f64::from(series);
        let p = f64::from(parallel);

        let voltage = s * cell.nominal_voltage;
        let capacity_ah = p * cell.capacity_ah;
        let peak_current = cell.capacity_ah * cell.peak_discharge_c() * p;
        let continuous_current = if voltage > 0.0 { required_power / voltage } else { 0.0 };

        PackElectrical {
            series,
            parallel,
            voltage,
            charge_voltage: s * cell.charge_voltage,
            capacity_ah,
            energy_wh: voltage * capacity_ah,
            weight_kg: s * p * cell.weight_kg,
            impedance_ohm: if parallel > 0 { s * cell.impedance_mohm * 1e-3 / p } else { f64::INFINITY },
            continuous_current,
            continuous_power_capability: voltage * cell.continuous_current() * p,
            peak_current,
            peak_power: voltage * peak_current,
        }
    }

    pub fn total_cells(&self) -> u32 {
        self.series * self.parallel
    }
}

/// Smallest parallel count that meets both the energy and power floors, never below 1.
pub fn min_parallel_for(cell: &CellSpec, series: u32, min_energy: f64, min_power: f64) -> u32 {
    let s = f64::from(series);
    let string_energy = s * cell.energy_wh();
    let string_power = s * cell.continuous_power_w();

    let by_energy = ceil_ratio(min_energy, string_energy);
    let by_power = ceil_ratio(min_power, string_power);
    by_energy.max(by_power).max(1)
}

fn ceil_ratio(demand: f64, per_string: f64) -> u32 {
    if demand <= 0.0 || per_string <= 0.0 {
        return 0;
    }
    let strings = (demand / per_string).ceil();
    if strings >= f64::from(u32::MAX) { u32::MAX } else { strings as u32 }
}
