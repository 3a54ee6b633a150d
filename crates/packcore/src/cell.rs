//! Cell specifications and the raw datasheet record they are built from.

use serde::{Deserialize, Serialize};

use crate::error::{CatalogueError, require_non_negative, require_ordered, require_positive};

/// Peak discharge multiplier applied to the continuous rate when a datasheet gives none.
pub const DEFAULT_PEAK_FACTOR: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Chemistry {
    Lfp,
    Nmc,
    Lto,
    #[default]
    Unknown,
}

impl Chemistry {
    /// Maps a free-form composition string ("LFP", "nmc", "Li-NMC") onto a chemistry.
    pub fn from_composition(composition: &str) -> Self {
        let upper = composition.to_ascii_uppercase();
        if upper.contains("LFP") || upper.contains("LIFEPO") {
            Chemistry::Lfp
        } else if upper.contains("NMC") || upper.contains("NCM") {
            Chemistry::Nmc
        } else if upper.contains("LTO") {
            Chemistry::Lto
        } else {
            Chemistry::Unknown
        }
    }
}

/// Validated cell datasheet in SI-friendly units.
///
/// Voltages in V, capacity in Ah, C-rates as multipliers of capacity,
/// impedance in mΩ, footprint in mm, mass in kg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSpec {
    pub brand: String,
    pub model: String,
    pub chemistry: Chemistry,
    pub nominal_voltage: f64,
    pub charge_voltage: f64,
    pub capacity_ah: f64,
    pub max_continuous_discharge_c: f64,
    pub max_continuous_charge_c: f64,
    /// Peak discharge rate; `None` means `DEFAULT_PEAK_FACTOR` times the continuous rate
    #[serde(default)]
    pub max_peak_discharge_c: Option<f64>,
    pub impedance_mohm: f64,
    pub thickness_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
    pub weight_kg: f64,
    pub cycle_life: u32,
    pub price: f64,
}

impl CellSpec {
    /// Human readable identifier, e.g. "Gotion IFP20100140A-30Ah"
    pub fn label(&self) -> String {
        if self.brand.is_empty() {
            self.model.clone()
        } else {
            format!("{} {}", self.brand, self.model)
        }
    }

    pub fn peak_discharge_c(&self) -> f64 {
        self.max_peak_discharge_c
            .unwrap_or(self.max_continuous_discharge_c * DEFAULT_PEAK_FACTOR)
    }

    /// Stored energy of one cell at nominal voltage (Wh)
    pub fn energy_wh(&self) -> f64 {
        self.capacity_ah * self.nominal_voltage
    }

    /// Rated continuous discharge current of one cell (A)
    pub fn continuous_current(&self) -> f64 {
        self.capacity_ah * self.max_continuous_discharge_c
    }

    /// Rated continuous discharge power of one cell at nominal voltage (W)
    pub fn continuous_power_w(&self) -> f64 {
        self.continuous_current() * self.nominal_voltage
    }

    pub fn validate(&self) -> Result<(), CatalogueError> {
        let entry = format!("cell `{}`", self.label());
        require_positive(&entry, "nominal_voltage", self.nominal_voltage)?;
        require_positive(&entry, "charge_voltage", self.charge_voltage)?;
        require_ordered(
            &entry,
            "nominal_voltage",
            self.nominal_voltage,
            "charge_voltage",
            self.charge_voltage,
        )?;
        require_positive(&entry, "capacity_ah", self.capacity_ah)?;
        require_positive(&entry, "max_continuous_discharge_c", self.max_continuous_discharge_c)?;
        require_positive(&entry, "max_continuous_charge_c", self.max_continuous_charge_c)?;
        if let Some(peak) = self.max_peak_discharge_c {
            require_positive(&entry, "max_peak_discharge_c", peak)?;
        }
        require_non_negative(&entry, "impedance_mohm", self.impedance_mohm)?;
        require_positive(&entry, "thickness_mm", self.thickness_mm)?;
        require_positive(&entry, "width_mm", self.width_mm)?;
        require_positive(&entry, "height_mm", self.height_mm)?;
        require_positive(&entry, "weight_kg", self.weight_kg)?;
        require_positive(&entry, "cycle_life", f64::from(self.cycle_life))?;
        require_non_negative(&entry, "price", self.price)?;
        Ok(())
    }
}

/// Cell record in the upstream catalogue format.
///
/// Capacity is given in mAh, impedance in mΩ and weight in grams. Fields the
/// engine never reads (tab geometry, densities, origin) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawCellRecord {
    #[serde(default)]
    pub brand: String,
    pub cell_model_no: String,
    #[serde(default)]
    pub composition: String,
    pub max_continuous_discharge_rate: f64,
    pub max_continuous_charge_rate: f64,
    pub nominal_voltage: f64,
    pub charge_voltage: f64,
    pub capacity: f64,
    pub impedance: f64,
    pub weight: f64,
    #[serde(rename = "Cell_Thickness")]
    pub cell_thickness: f64,
    #[serde(rename = "Cell_Width")]
    pub cell_width: f64,
    #[serde(rename = "Cell_Height")]
    pub cell_height: f64,
    pub cycles: u32,
    pub price: f64,
}

impl TryFrom<RawCellRecord> for CellSpec {
    type Error = CatalogueError;

    fn try_from(raw: RawCellRecord) -> Result<Self, Self::Error> {
        let cell = CellSpec {
            chemistry: Chemistry::from_composition(&raw.composition),
            brand: raw.brand,
            model: raw.cell_model_no,
            nominal_voltage: raw.nominal_voltage,
            charge_voltage: raw.charge_voltage,
            capacity_ah: raw.capacity * 1e-3,
            max_continuous_discharge_c: raw.max_continuous_discharge_rate,
            max_continuous_charge_c: raw.max_continuous_charge_rate,
            max_peak_discharge_c: None,
            impedance_mohm: raw.impedance,
            thickness_mm: raw.cell_thickness,
            width_mm: raw.cell_width,
            height_mm: raw.cell_height,
            weight_kg: raw.weight * 1e-3,
            cycle_life: raw.cycles,
            price: raw.price,
        };
        cell.validate()?;
        Ok(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOTION_RECORD: &str = r#"{
        "Brand": "Gotion", "CellModelNo": "IFP20100140A-30Ah", "Composition": "LFP",
        "Cell_Stack": "C", "MaxContinuousDischargeRate": 2, "MaxContinuousChargeRate": 1,
        "NominalVoltage": 3.2, "ChargeVoltage": 3.65, "Capacity": 30000,
        "TheMaxDischargeCurrentOfTheTabs": 60, "Impedance": 1.5, "Weight": 615,
        "Cell_Thickness": 20, "Cell_Width": 100, "Cell_Height": 140, "TabsThickness": 0.15,
        "Cycles": 3000, "Price": 12, "OriginCountry": "China", "Connection": "Solder"
    }"#;

    #[test]
    fn test_raw_record_converts_units() {
        let raw: RawCellRecord = serde_json::from_str(GOTION_RECORD).unwrap();
        let cell = CellSpec::try_from(raw).unwrap();

        assert_eq!(cell.chemistry, Chemistry::Lfp);
        assert!((cell.capacity_ah - 30.0).abs() < 1e-12);
        assert!((cell.weight_kg - 0.615).abs() < 1e-12);
        assert!((cell.energy_wh() - 96.0).abs() < 1e-9);
        // No peak rate on the datasheet -> 5x continuous
        assert!((cell.peak_discharge_c() - 10.0).abs() < 1e-12);
        assert_eq!(cell.label(), "Gotion IFP20100140A-30Ah");
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let mut raw: RawCellRecord = serde_json::from_str(GOTION_RECORD).unwrap();
        raw.capacity = 0.0;

        match CellSpec::try_from(raw) {
            Err(CatalogueError::InvalidField { field, .. }) => assert_eq!(field, "capacity_ah"),
            other => panic!("expected an invalid capacity, got {:?}", other),
        }
    }

    #[test]
    fn test_charge_voltage_below_nominal_is_rejected() {
        let mut raw: RawCellRecord = serde_json::from_str(GOTION_RECORD).unwrap();
        raw.charge_voltage = 3.0;

        assert!(matches!(
            CellSpec::try_from(raw),
            Err(CatalogueError::InvertedRange { .. })
        ));
    }

    #[test]
    fn test_composition_mapping() {
        assert_eq!(Chemistry::from_composition("lfp"), Chemistry::Lfp);
        assert_eq!(Chemistry::from_composition("Li-NMC 811"), Chemistry::Nmc);
        assert_eq!(Chemistry::from_composition("Unknown"), Chemistry::Unknown);
    }
}
