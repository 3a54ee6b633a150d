//! Conditional component sizing and catalogue matching.
//!
//! Fuse, relay and shunt are only fitted when the pack's voltage or current
//! crosses a hardware-need threshold; cable and BMS are always fitted.

use packcore::{
    BmsSpec, CableSpec, ComponentCatalogue, ComponentKind, RatedComponent, SelectedCable, SelectedComponents,
};
use serde::{Deserialize, Serialize};

use crate::battery::PackElectrical;

/// Fuse current rating relative to continuous current
pub const FUSE_CURRENT_FACTOR: f64 = 1.5;
/// Relay voltage rating relative to charged pack voltage
pub const RELAY_VOLTAGE_FACTOR: f64 = 1.1;
/// Relay current rating relative to continuous current
pub const RELAY_CURRENT_FACTOR: f64 = 2.0;
/// Cable design current relative to continuous current
pub const CABLE_CURRENT_FACTOR: f64 = 1.5;

/// Which optional protection parts a pack needs, from its voltage and current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareNeeds {
    pub fuse: bool,
    pub relay: bool,
    pub shunt: bool,
}

impl HardwareNeeds {
    pub fn for_pack(voltage: f64, current: f64) -> Self {
        HardwareNeeds {
            // Common BMS MOSFETs stop coping above 60 V / 80 A
            relay: voltage > 60.0 || current > 80.0,
            fuse: voltage > 24.0 || current > 50.0,
            // The BMS internal sensor is imprecise at high current
            shunt: current > 60.0,
        }
    }

    pub fn needs(&self, kind: ComponentKind) -> bool {
        match kind {
            ComponentKind::Fuse => self.fuse,
            ComponentKind::Relay => self.relay,
            ComponentKind::Shunt => self.shunt,
            ComponentKind::Cable | ComponentKind::Bms => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Cheapest part whose ratings meet the requirement
    #[default]
    CheapestMatch,
    /// First meeting part in a price-sorted list. Greedy: a cheaper match
    /// placed after a non-matching entry can be skipped.
    FirstMatch,
}

/// Picks a part rated for at least `voltage` and `current` whose operating
/// window, when the catalogue gives one, covers `ambient_c`.
pub fn select_component<T: RatedComponent>(
    items: &[T],
    policy: SelectionPolicy,
    voltage: f64,
    current: f64,
    ambient_c: f64,
) -> Option<&T> {
    pick(rated_for(items, ambient_c), policy, voltage, current)
}

/// Parts whose operating window covers `ambient_c`; parts without one always pass
fn rated_for<T: RatedComponent>(items: &[T], ambient_c: f64) -> impl Iterator<Item = &T> {
    items
        .iter()
        .filter(move |item| item.thermal_range().is_none_or(|range| range.contains(ambient_c)))
}

fn pick<'a, T: RatedComponent + 'a>(
    candidates: impl Iterator<Item = &'a T>,
    policy: SelectionPolicy,
    voltage: f64,
    current: f64,
) -> Option<&'a T> {
    let mut matching = candidates.filter(|c| c.vdc_max() >= voltage && c.a_max() >= current);
    match policy {
        SelectionPolicy::FirstMatch => matching.next(),
        SelectionPolicy::CheapestMatch => matching.min_by(|a, b| a.unit_price().total_cmp(&b.unit_price())),
    }
}

/// How a missing catalogue match for one component kind affects a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentRequirement {
    /// Always attempted, fitted when matched, never fatal
    Optional,
    /// Attempted only above the hardware-need threshold; fatal when needed and unmatched
    RequiredIfThreshold,
    /// Always attempted; fatal when unmatched
    RequiredAlways,
}

impl ComponentRequirement {
    pub fn should_attempt(&self, needed: bool) -> bool {
        match self {
            ComponentRequirement::RequiredIfThreshold => needed,
            ComponentRequirement::Optional | ComponentRequirement::RequiredAlways => true,
        }
    }

    pub fn is_fatal_when_missing(&self, needed: bool) -> bool {
        match self {
            ComponentRequirement::Optional => false,
            ComponentRequirement::RequiredIfThreshold => needed,
            ComponentRequirement::RequiredAlways => true,
        }
    }
}

/// Per-kind `ComponentRequirement`, resolved once per search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentPolicies {
    pub fuse: ComponentRequirement,
    pub relay: ComponentRequirement,
    pub cable: ComponentRequirement,
    pub bms: ComponentRequirement,
    pub shunt: ComponentRequirement,
}

impl Default for ComponentPolicies {
    fn default() -> Self {
        Self {
            fuse: ComponentRequirement::RequiredIfThreshold,
            relay: ComponentRequirement::RequiredIfThreshold,
            cable: ComponentRequirement::RequiredAlways,
            bms: ComponentRequirement::RequiredAlways,
            shunt: ComponentRequirement::RequiredIfThreshold,
        }
    }
}

impl ComponentPolicies {
    pub fn for_kind(&self, kind: ComponentKind) -> ComponentRequirement {
        match kind {
            ComponentKind::Fuse => self.fuse,
            ComponentKind::Relay => self.relay,
            ComponentKind::Cable => self.cable,
            ComponentKind::Bms => self.bms,
            ComponentKind::Shunt => self.shunt,
        }
    }

    /// Override the requirement for one component kind
    pub fn with_requirement(mut self, kind: ComponentKind, requirement: ComponentRequirement) -> Self {
        match kind {
            ComponentKind::Fuse => self.fuse = requirement,
            ComponentKind::Relay => self.relay = requirement,
            ComponentKind::Cable => self.cable = requirement,
            ComponentKind::Bms => self.bms = requirement,
            ComponentKind::Shunt => self.shunt = requirement,
        }
        self
    }
}

/// Lumped thermal model sizing the copper section of the main cable run.
///
/// `area = I² · ρ · L² · R_th / ΔT` with ΔT = max cable temperature − ambient,
/// floored at `min_delta_t_k`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CableThermalModel {
    /// Copper resistivity (Ω·m)
    pub resistivity_ohm_m: f64,
    /// One-way run length (m)
    pub run_length_m: f64,
    pub thermal_resistance: f64,
    /// Maximum conductor temperature (°C)
    pub max_temperature_c: f64,
    /// Smallest temperature rise used when ambient is at or above the limit (K)
    pub min_delta_t_k: f64,
}

impl Default for CableThermalModel {
    fn default() -> Self {
        Self {
            resistivity_ohm_m: 1.68e-8,
            run_length_m: 2.0,
            thermal_resistance: 0.5,
            max_temperature_c: 100.0,
            min_delta_t_k: 1.0,
        }
    }
}

impl CableThermalModel {
    pub fn with_run_length(mut self, run_length_m: f64) -> Self {
        self.run_length_m = run_length_m;
        self
    }

    pub fn with_max_temperature(mut self, max_temperature_c: f64) -> Self {
        self.max_temperature_c = max_temperature_c;
        self
    }

    /// Minimum copper section for `current` amps at `ambient_c` (mm²)
    pub fn required_section_mm2(&self, current: f64, ambient_c: f64) -> f64 {
        let mut delta_t = self.max_temperature_c - ambient_c;
        if delta_t <= 0.0 {
            delta_t = self.min_delta_t_k;
        }
        let area_m2 = current.powi(2) * self.resistivity_ohm_m * self.run_length_m.powi(2) * self.thermal_resistance
            / delta_t;
        area_m2 * 1e6
    }

    /// Price of the outbound plus return run
    pub fn run_price(&self, cable: &CableSpec) -> f64 {
        cable.price_per_m * self.run_length_m * 2.0
    }

    pub fn select(
        &self,
        cables: &[CableSpec],
        policy: SelectionPolicy,
        voltage: f64,
        current: f64,
        ambient_c: f64,
    ) -> Option<SelectedCable> {
        let required_section_mm2 = self.required_section_mm2(current, ambient_c);
        let thick_enough = rated_for(cables, ambient_c).filter(|c| c.section_mm2 >= required_section_mm2);
        pick(thick_enough, policy, voltage, current).map(|cable| SelectedCable {
            spec: cable.clone(),
            required_section_mm2,
            run_price: self.run_price(cable),
        })
    }
}

/// BMS able to monitor `series` cells and carry `peak_current` at `ambient_c`.
pub fn select_bms(
    units: &[BmsSpec],
    policy: SelectionPolicy,
    series: u32,
    peak_current: f64,
    ambient_c: f64,
) -> Option<&BmsSpec> {
    let mut matching = rated_for(units, ambient_c).filter(|b| b.max_cells >= series && b.a_max >= peak_current);
    match policy {
        SelectionPolicy::FirstMatch => matching.next(),
        SelectionPolicy::CheapestMatch => matching.min_by(|a, b| a.master_price.total_cmp(&b.master_price)),
    }
}

/// Result of fitting components to one pack.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    Selected(SelectedComponents),
    /// A component whose absence is fatal had no catalogue match
    Missing(ComponentKind),
}

/// Fits every component kind to a pack under the configured policies.
#[derive(Debug, Clone, Copy)]
pub struct ComponentSelector<'a> {
    catalogue: &'a ComponentCatalogue,
    policy: SelectionPolicy,
    policies: ComponentPolicies,
    cable_model: CableThermalModel,
    ambient_c: f64,
}

impl<'a> ComponentSelector<'a> {
    pub fn new(
        catalogue: &'a ComponentCatalogue,
        policy: SelectionPolicy,
        policies: ComponentPolicies,
        cable_model: CableThermalModel,
        ambient_c: f64,
    ) -> Self {
        Self {
            catalogue,
            policy,
            policies,
            cable_model,
            ambient_c,
        }
    }

    pub fn select_for(&self, pack: &PackElectrical) -> SelectionOutcome {
        let needs = HardwareNeeds::for_pack(pack.voltage, pack.continuous_current);
        let current = pack.continuous_current;
        let mut selected = SelectedComponents::default();

        for kind in ComponentKind::ALL {
            let requirement = self.policies.for_kind(kind);
            let needed = needs.needs(kind);
            if !requirement.should_attempt(needed) {
                continue;
            }

            let matched = match kind {
                ComponentKind::Fuse => {
                    selected.fuse = select_component(
                        &self.catalogue.fuses,
                        self.policy,
                        pack.charge_voltage,
                        current * FUSE_CURRENT_FACTOR,
                        self.ambient_c,
                    )
                    .cloned();
                    selected.fuse.is_some()
                }
                ComponentKind::Relay => {
                    selected.relay = select_component(
                        &self.catalogue.relays,
                        self.policy,
                        pack.charge_voltage * RELAY_VOLTAGE_FACTOR,
                        current * RELAY_CURRENT_FACTOR,
                        self.ambient_c,
                    )
                    .cloned();
                    selected.relay.is_some()
                }
                ComponentKind::Shunt => {
                    selected.shunt = select_component(
                        &self.catalogue.shunts,
                        self.policy,
                        pack.charge_voltage,
                        pack.peak_current,
                        self.ambient_c,
                    )
                    .cloned();
                    selected.shunt.is_some()
                }
                ComponentKind::Cable => {
                    selected.cable = self.cable_model.select(
                        &self.catalogue.cables,
                        self.policy,
                        pack.charge_voltage,
                        current * CABLE_CURRENT_FACTOR,
                        self.ambient_c,
                    );
                    selected.cable.is_some()
                }
                ComponentKind::Bms => {
                    selected.bms = select_bms(
                        &self.catalogue.bms,
                        self.policy,
                        pack.series,
                        pack.peak_current,
                        self.ambient_c,
                    )
                    .cloned();
                    selected.bms.is_some()
                }
            };

            if !matched && requirement.is_fatal_when_missing(needed) {
                log::trace!("{}S{}P: no {} match", pack.series, pack.parallel, kind);
                return SelectionOutcome::Missing(kind);
            }
        }

        SelectionOutcome::Selected(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use packcore::ComponentSpec;

    fn part(model: &str, vdc_max: f64, a_max: f64, price: f64) -> ComponentSpec {
        ComponentSpec {
            brand: String::new(),
            model: model.to_string(),
            vdc_max,
            a_max,
            price,
            temp_min: None,
            temp_max: None,
            link: String::new(),
        }
    }

    fn cable(model: &str, section: f64, vdc_max: f64, a_max: f64, price: f64) -> CableSpec {
        CableSpec {
            brand: String::new(),
            model: model.to_string(),
            section_mm2: section,
            vdc_max,
            a_max,
            price_per_m: price,
            temp_min: None,
            temp_max: None,
            link: String::new(),
        }
    }

    #[test]
    fn test_hardware_need_thresholds() {
        assert_eq!(
            HardwareNeeds::for_pack(24.0, 50.0),
            HardwareNeeds { fuse: false, relay: false, shunt: false }
        );
        assert_eq!(
            HardwareNeeds::for_pack(51.2, 39.0),
            HardwareNeeds { fuse: true, relay: false, shunt: false }
        );
        assert_eq!(
            HardwareNeeds::for_pack(12.0, 81.0),
            HardwareNeeds { fuse: true, relay: true, shunt: true }
        );
        assert!(HardwareNeeds::for_pack(0.0, 0.0).needs(ComponentKind::Bms));
    }

    #[test]
    fn test_first_match_can_skip_cheaper_part() {
        // Price-sorted, but the cheapest suitable one sits after an unsuitable one
        let parts = vec![
            part("weak", 30.0, 10.0, 1.0),
            part("ok-expensive", 100.0, 100.0, 9.0),
            part("ok-cheap", 100.0, 100.0, 5.0),
        ];
        let first = select_component(&parts, SelectionPolicy::FirstMatch, 50.0, 50.0, 25.0).unwrap();
        let cheapest = select_component(&parts, SelectionPolicy::CheapestMatch, 50.0, 50.0, 25.0).unwrap();

        assert_eq!(first.model, "ok-expensive");
        assert_eq!(cheapest.model, "ok-cheap");
        assert!(select_component(&parts, SelectionPolicy::CheapestMatch, 500.0, 1.0, 25.0).is_none());
    }

    #[test]
    fn test_operating_window_excludes_parts() {
        let mut indoor = part("indoor", 100.0, 100.0, 1.0);
        indoor.temp_min = Some(0.0);
        indoor.temp_max = Some(40.0);
        let parts = vec![indoor, part("unrated", 100.0, 100.0, 3.0)];

        let warm = select_component(&parts, SelectionPolicy::CheapestMatch, 50.0, 50.0, 25.0).unwrap();
        assert_eq!(warm.model, "indoor");
        let frozen = select_component(&parts, SelectionPolicy::CheapestMatch, 50.0, 50.0, -20.0).unwrap();
        assert_eq!(frozen.model, "unrated");

        let bms = vec![BmsSpec {
            brand: String::new(),
            model: "bms".to_string(),
            max_cells: 24,
            vdc_min: 11.0,
            vdc_max: 120.0,
            a_max: 500.0,
            master_price: 100.0,
            slave_price: 0.0,
            temp_min: Some(-10.0),
            temp_max: Some(60.0),
            link: String::new(),
        }];
        assert!(select_bms(&bms, SelectionPolicy::CheapestMatch, 16, 100.0, 25.0).is_some());
        assert!(select_bms(&bms, SelectionPolicy::CheapestMatch, 16, 100.0, 70.0).is_none());
    }

    #[test]
    fn test_cable_section_from_thermal_model() {
        let model = CableThermalModel::default();
        // 60 A at 25 °C: 3600 * 1.68e-8 * 4 * 0.5 / 75 m²
        let expected = 3600.0 * 1.68e-8 * 4.0 * 0.5 / 75.0 * 1e6;
        assert_relative_eq!(model.required_section_mm2(60.0, 25.0), expected, max_relative = 1e-12);
        // Ambient above the conductor limit falls back to a 1 K rise
        let hot = model.required_section_mm2(60.0, 120.0);
        assert_relative_eq!(hot, expected * 75.0, max_relative = 1e-12);
    }

    #[test]
    fn test_cable_thin_sections_filtered_before_policy() {
        let model = CableThermalModel::default();
        let cables = vec![
            cable("thin", 0.5, 1000.0, 500.0, 0.1),
            cable("thick", 10.0, 1000.0, 80.0, 2.18),
        ];
        let chosen = model
            .select(&cables, SelectionPolicy::CheapestMatch, 58.4, 60.0, 25.0)
            .unwrap();
        assert_eq!(chosen.spec.model, "thick");
        assert_relative_eq!(chosen.run_price, 2.18 * 2.0 * 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_requirement_semantics() {
        assert!(!ComponentRequirement::RequiredIfThreshold.should_attempt(false));
        assert!(ComponentRequirement::Optional.should_attempt(false));
        assert!(!ComponentRequirement::Optional.is_fatal_when_missing(true));
        assert!(ComponentRequirement::RequiredAlways.is_fatal_when_missing(false));

        let policies = ComponentPolicies::default().with_requirement(ComponentKind::Cable, ComponentRequirement::Optional);
        assert_eq!(policies.for_kind(ComponentKind::Cable), ComponentRequirement::Optional);
        assert_eq!(policies.for_kind(ComponentKind::Fuse), ComponentRequirement::RequiredIfThreshold);
    }
}
