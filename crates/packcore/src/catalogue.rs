//! Immutable catalogue snapshot handed to each search.
//!
//! Reloading a catalogue means building a new `Catalogue`; a snapshot is
//! never mutated once constructed, so in-flight searches can share it
//! behind an `Arc`.

use std::sync::Arc;

use crate::cell::{CellSpec, RawCellRecord};
use crate::component::ComponentCatalogue;
use crate::error::CatalogueError;

#[derive(Debug, Clone)]
pub struct Catalogue {
    cells: Vec<Arc<CellSpec>>,
    components: ComponentCatalogue,
}

impl Catalogue {
    /// Validates every entry and sorts component lists by price.
    pub fn new(cells: Vec<CellSpec>, mut components: ComponentCatalogue) -> Result<Self, CatalogueError> {
        if cells.is_empty() {
            return Err(CatalogueError::NoCells);
        }
        for cell in &cells {
            cell.validate()?;
        }
        components.validate()?;
        components.sort_by_price();

        log::info!(
            "Catalogue loaded: {} cells, {} fuses, {} relays, {} cables, {} bms, {} shunts",
            cells.len(),
            components.fuses.len(),
            components.relays.len(),
            components.cables.len(),
            components.bms.len(),
            components.shunts.len()
        );

        Ok(Catalogue {
            cells: cells.into_iter().map(Arc::new).collect(),
            components,
        })
    }

    /// Builds a snapshot from records in the upstream milli-unit format.
    pub fn from_raw(records: Vec<RawCellRecord>, components: ComponentCatalogue) -> Result<Self, CatalogueError> {
        let cells = records
            .into_iter()
            .map(CellSpec::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Catalogue::new(cells, components)
    }

    pub fn cells(&self) -> &[Arc<CellSpec>] {
        &self.cells
    }

    pub fn components(&self) -> &ComponentCatalogue {
        &self.components
    }
}
