//! Shared data model for the pack design engine: catalogue entries,
//! buyer requirements and the result records every stage produces.

pub mod catalogue;
pub mod cell;
pub mod component;
pub mod design;
pub mod error;
pub mod requirements;

pub use catalogue::Catalogue;
pub use cell::{CellSpec, Chemistry, RawCellRecord};
pub use component::{BmsSpec, CableSpec, ComponentCatalogue, ComponentKind, ComponentSpec, RatedComponent, ThermalRange};
pub use design::{
    BatteryDesign, DesignOrigin, DurabilityEstimate, FinancialKpis, GridLayout, PackDimensions, RelaxedCheck,
    SafetyAssessment, SelectedCable, SelectedComponents, SolvePath, Subpack,
};
pub use error::CatalogueError;
pub use requirements::Requirements;
