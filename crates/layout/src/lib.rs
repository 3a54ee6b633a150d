//! Physical placement of cells inside the pack envelope.

pub mod geometry;

pub use geometry::{
    CELL_SPACING_MM, HEIGHT_CLEARANCE_MM, clears_height, estimate_dimensions, factor_pairs, find_layout,
};
