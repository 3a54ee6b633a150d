//! Electrical component specifications (fuses, relays, cables, BMS units, shunts).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogueError, require_non_negative, require_ordered, require_positive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Fuse,
    Relay,
    Cable,
    Bms,
    Shunt,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 5] = [
        ComponentKind::Fuse,
        ComponentKind::Relay,
        ComponentKind::Cable,
        ComponentKind::Bms,
        ComponentKind::Shunt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Fuse => "fuse",
            ComponentKind::Relay => "relay",
            ComponentKind::Cable => "cable",
            ComponentKind::Bms => "bms",
            ComponentKind::Shunt => "shunt",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operating temperature window (°C)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalRange {
    pub min_c: f64,
    pub max_c: f64,
}

impl ThermalRange {
    pub fn contains(&self, temperature_c: f64) -> bool {
        temperature_c >= self.min_c && temperature_c <= self.max_c
    }
}

/// Common view over every component kind used by the selectors.
pub trait RatedComponent {
    /// Maximum DC voltage (V)
    fn vdc_max(&self) -> f64;
    /// Maximum continuous current (A)
    fn a_max(&self) -> f64;
    /// Price used for ranking candidates of the same kind
    fn unit_price(&self) -> f64;
    fn thermal_range(&self) -> Option<ThermalRange>;
}

fn thermal_range_of(temp_min: Option<f64>, temp_max: Option<f64>) -> Option<ThermalRange> {
    match (temp_min, temp_max) {
        (Some(min_c), Some(max_c)) => Some(ThermalRange { min_c, max_c }),
        _ => None,
    }
}

fn validate_thermal(entry: &str, temp_min: Option<f64>, temp_max: Option<f64>) -> Result<(), CatalogueError> {
    if let (Some(min), Some(max)) = (temp_min, temp_max) {
        require_ordered(entry, "temp_min", min, "temp_max", max)?;
    }
    Ok(())
}

/// Fuse, relay or shunt: a voltage/current rated part with a single price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    #[serde(default)]
    pub brand: String,
    pub model: String,
    pub vdc_max: f64,
    pub a_max: f64,
    pub price: f64,
    #[serde(default)]
    pub temp_min: Option<f64>,
    #[serde(default)]
    pub temp_max: Option<f64>,
    #[serde(default)]
    pub link: String,
}

impl ComponentSpec {
    pub fn validate(&self, kind: ComponentKind) -> Result<(), CatalogueError> {
        let entry = format!("{} `{}`", kind, self.model);
        require_positive(&entry, "vdc_max", self.vdc_max)?;
        require_positive(&entry, "a_max", self.a_max)?;
        require_non_negative(&entry, "price", self.price)?;
        validate_thermal(&entry, self.temp_min, self.temp_max)
    }
}

impl RatedComponent for ComponentSpec {
    fn vdc_max(&self) -> f64 {
        self.vdc_max
    }

    fn a_max(&self) -> f64 {
        self.a_max
    }

    fn unit_price(&self) -> f64 {
        self.price
    }

    fn thermal_range(&self) -> Option<ThermalRange> {
        thermal_range_of(self.temp_min, self.temp_max)
    }
}

/// Cable sold by the metre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableSpec {
    #[serde(default)]
    pub brand: String,
    pub model: String,
    /// Copper cross-section (mm²)
    #[serde(rename = "section")]
    pub section_mm2: f64,
    pub vdc_max: f64,
    pub a_max: f64,
    /// Price per metre
    #[serde(rename = "price")]
    pub price_per_m: f64,
    #[serde(default)]
    pub temp_min: Option<f64>,
    #[serde(default)]
    pub temp_max: Option<f64>,
    #[serde(default)]
    pub link: String,
}

impl CableSpec {
    pub fn validate(&self) -> Result<(), CatalogueError> {
        let entry = format!("cable `{}`", self.model);
        require_positive(&entry, "section", self.section_mm2)?;
        require_positive(&entry, "vdc_max", self.vdc_max)?;
        require_positive(&entry, "a_max", self.a_max)?;
        require_non_negative(&entry, "price", self.price_per_m)?;
        validate_thermal(&entry, self.temp_min, self.temp_max)
    }
}

impl RatedComponent for CableSpec {
    fn vdc_max(&self) -> f64 {
        self.vdc_max
    }

    fn a_max(&self) -> f64 {
        self.a_max
    }

    fn unit_price(&self) -> f64 {
        self.price_per_m
    }

    fn thermal_range(&self) -> Option<ThermalRange> {
        thermal_range_of(self.temp_min, self.temp_max)
    }
}

/// Battery management unit. Only the master unit is priced into a pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmsSpec {
    #[serde(default)]
    pub brand: String,
    pub model: String,
    /// Maximum number of series cells the unit can monitor
    pub max_cells: u32,
    #[serde(default)]
    pub vdc_min: f64,
    pub vdc_max: f64,
    pub a_max: f64,
    pub master_price: f64,
    #[serde(default)]
    pub slave_price: f64,
    #[serde(default)]
    pub temp_min: Option<f64>,
    #[serde(default)]
    pub temp_max: Option<f64>,
    #[serde(default)]
    pub link: String,
}

impl BmsSpec {
    pub fn validate(&self) -> Result<(), CatalogueError> {
        let entry = format!("bms `{}`", self.model);
        require_positive(&entry, "max_cells", f64::from(self.max_cells))?;
        require_non_negative(&entry, "vdc_min", self.vdc_min)?;
        require_positive(&entry, "vdc_max", self.vdc_max)?;
        require_positive(&entry, "a_max", self.a_max)?;
        require_non_negative(&entry, "master_price", self.master_price)?;
        require_non_negative(&entry, "slave_price", self.slave_price)?;
        validate_thermal(&entry, self.temp_min, self.temp_max)
    }
}

impl RatedComponent for BmsSpec {
    fn vdc_max(&self) -> f64 {
        self.vdc_max
    }

    fn a_max(&self) -> f64 {
        self.a_max
    }

    fn unit_price(&self) -> f64 {
        self.master_price
    }

    fn thermal_range(&self) -> Option<ThermalRange> {
        thermal_range_of(self.temp_min, self.temp_max)
    }
}

/// Component lists grouped by kind, as found in the upstream `components.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentCatalogue {
    #[serde(default)]
    pub fuses: Vec<ComponentSpec>,
    #[serde(default)]
    pub relays: Vec<ComponentSpec>,
    #[serde(default)]
    pub cables: Vec<CableSpec>,
    #[serde(default)]
    pub bms: Vec<BmsSpec>,
    #[serde(default)]
    pub shunts: Vec<ComponentSpec>,
}

fn sort_by_price<T: RatedComponent>(items: &mut [T]) {
    items.sort_by(|a, b| a.unit_price().total_cmp(&b.unit_price()));
}

impl ComponentCatalogue {
    pub fn validate(&self) -> Result<(), CatalogueError> {
        for fuse in &self.fuses {
            fuse.validate(ComponentKind::Fuse)?;
        }
        for relay in &self.relays {
            relay.validate(ComponentKind::Relay)?;
        }
        for shunt in &self.shunts {
            shunt.validate(ComponentKind::Shunt)?;
        }
        for cable in &self.cables {
            cable.validate()?;
        }
        for bms in &self.bms {
            bms.validate()?;
        }
        Ok(())
    }

    /// Sorts every list by ascending unit price (stable, so catalogue order breaks ties).
    pub fn sort_by_price(&mut self) {
        sort_by_price(&mut self.fuses);
        sort_by_price(&mut self.relays);
        sort_by_price(&mut self.shunts);
        sort_by_price(&mut self.cables);
        sort_by_price(&mut self.bms);
    }
}
