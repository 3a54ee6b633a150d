//! Electrical side of a pack: series/parallel electrics, component sizing,
//! thermal/voltage safety scoring and cycle-life estimation.

pub mod battery;
pub mod components;
pub mod durability;
pub mod safety;

pub use battery::{PackElectrical, min_parallel_for};
pub use components::{
    CableThermalModel, ComponentPolicies, ComponentRequirement, ComponentSelector, HardwareNeeds, SelectionOutcome,
    SelectionPolicy, select_bms, select_component,
};
pub use durability::DurabilityModel;
pub use safety::assess_safety;
