//! Rectangular grid feasibility for a cell count inside a width/length envelope.
//!
//! This is a feasibility oracle: it returns the first grid that fits, not the
//! most compact one.

use packcore::{CellSpec, GridLayout, PackDimensions};

/// Assembly margin added to both footprint axes of every cell (mm)
pub const CELL_SPACING_MM: f64 = 0.2;

/// Room reserved above the cells for busbars and wiring (mm)
pub const HEIGHT_CLEARANCE_MM: f64 = 30.0;

/// Factor pairs `(a, b)` with `a * b == n` and `a <= b`.
///
/// Only divisors up to √n are generated; each pair's complement is implied.
pub fn factor_pairs(n: u32) -> Vec<(u32, u32)> {
    let mut pairs = Vec::new();
    let mut a = 1u32;
    while u64::from(a) * u64::from(a) <= u64::from(n) {
        if n % a == 0 {
            pairs.push((a, n / a));
        }
        a += 1;
    }
    pairs
}

/// Finds a grid of `cell_count` cells that fits in `max_width × max_length`.
///
/// Both cell orientations are tried, and for each factor pair both
/// assignments of the factors to the axes. Returns `None` when nothing fits
/// (or when `cell_count` is zero).
pub fn find_layout(
    cell_thickness_mm: f64,
    cell_width_mm: f64,
    cell_count: u32,
    max_width: f64,
    max_length: f64,
) -> Option<GridLayout> {
    let thickness_pitch = cell_thickness_mm + CELL_SPACING_MM;
    let width_pitch = cell_width_mm + CELL_SPACING_MM;
    let orientations = [(thickness_pitch, width_pitch), (width_pitch, thickness_pitch)];
    let pairs = factor_pairs(cell_count);

    for (pitch_x, pitch_y) in orientations {
        for &(a, b) in &pairs {
            for (columns, rows) in [(a, b), (b, a)] {
                if f64::from(columns) * pitch_x <= max_width && f64::from(rows) * pitch_y <= max_length {
                    return Some(GridLayout {
                        columns,
                        rows,
                        pitch_x_mm: pitch_x,
                        pitch_y_mm: pitch_y,
                    });
                }
            }
        }
    }
    log::trace!("No grid of {cell_count} cells fits {max_width} x {max_length} mm");
    None
}

/// Whether a standing cell plus wiring clearance fits under `max_height`.
pub fn clears_height(cell_height_mm: f64, max_height: f64) -> bool {
    cell_height_mm + HEIGHT_CLEARANCE_MM <= max_height
}

/// Reported pack outline: a `ceil(√n)` square grid of spaced cells, rounded to 0.1 mm.
///
/// This is a presentation estimate and can differ from the layout that
/// proved the pack fits.
pub fn estimate_dimensions(cell: &CellSpec, cell_count: u32) -> PackDimensions {
    let side = f64::from(cell_count).sqrt().ceil();
    PackDimensions {
        length: round_tenth((cell.width_mm + CELL_SPACING_MM) * side),
        width: round_tenth((cell.thickness_mm + CELL_SPACING_MM) * side),
        height: round_tenth(cell.height_mm),
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use packcore::Chemistry;

    #[test]
    fn test_factor_pairs_of_prime() {
        assert_eq!(factor_pairs(13), vec![(1, 13)]);
        assert_eq!(factor_pairs(12), vec![(1, 12), (2, 6), (3, 4)]);
        assert!(factor_pairs(0).is_empty());
    }

    #[test]
    fn test_single_cell_fits_iff_footprint_fits() {
        // 20 x 100 footprint -> 20.2 x 100.2 pitch
        assert!(find_layout(20.0, 100.0, 1, 20.25, 100.25).is_some());
        // Rotated orientation also admissible
        assert!(find_layout(20.0, 100.0, 1, 100.25, 20.25).is_some());
        assert!(find_layout(20.0, 100.0, 1, 20.1, 100.2).is_none());
        assert!(find_layout(20.0, 100.0, 1, 50.0, 50.0).is_none());
    }

    #[test]
    fn test_prime_count_only_uses_single_row() {
        // 7 cells on a 9.9 mm pitch: only 1x7 or 7x1 exist
        let grid = find_layout(9.7, 9.7, 7, 10.0, 70.0).unwrap();
        assert_eq!((grid.columns, grid.rows), (1, 7));

        let grid = find_layout(9.7, 9.7, 7, 70.0, 10.0).unwrap();
        assert_eq!((grid.columns, grid.rows), (7, 1));

        // A 3x3 box would hold 7 cells physically but no 7 = a*b grid fits
        assert!(find_layout(9.7, 9.7, 7, 30.0, 30.0).is_none());
    }

    #[test]
    fn test_layout_within_envelope() {
        let grid = find_layout(20.0, 100.0, 30, 400.0, 300.0).unwrap();
        assert_eq!(grid.columns * grid.rows, 30);
        assert!(grid.width_mm() <= 400.0);
        assert!(grid.length_mm() <= 300.0);
    }

    #[test]
    fn test_height_clearance() {
        assert!(clears_height(140.0, 170.0));
        assert!(!clears_height(140.0, 169.9));
    }

    #[test]
    fn test_estimated_dimensions() {
        let cell = CellSpec {
            brand: String::new(),
            model: "c".to_string(),
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
        };
        // 30 cells -> 6 x 6 estimate
        let dims = estimate_dimensions(&cell, 30);
        assert_abs_diff_eq!(dims.length, 601.2, epsilon = 1e-9);
        assert_abs_diff_eq!(dims.width, 121.2, epsilon = 1e-9);
        assert_abs_diff_eq!(dims.height, 140.0, epsilon = 1e-9);
    }
}
