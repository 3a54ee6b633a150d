//! Lazy enumeration of (cell, series, parallel) candidates.

use std::ops::RangeInclusive;
use std::sync::Arc;

use electrical::min_parallel_for;
use packcore::{CellSpec, Requirements};

use crate::stats::Rejection;

/// Slack for float division landing a hair off a whole series count
const SERIES_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub cell: &'a Arc<CellSpec>,
    pub series: u32,
    pub parallel: u32,
}

/// One step of the enumeration: a candidate, or a cell dropped before any
/// candidate was built
pub type Enumerated<'a> = Result<Candidate<'a>, (&'a Arc<CellSpec>, Rejection)>;

/// Series counts whose nominal voltage lies inside the requested window.
///
/// `ceil(min_V / V_nom) ..= floor(max_V / V_nom)`; `None` when empty.
pub fn series_range(cell: &CellSpec, requirements: &Requirements) -> Option<RangeInclusive<u32>> {
    let low = (requirements.min_voltage / cell.nominal_voltage - SERIES_EPSILON).ceil().max(1.0);
    let high = (requirements.max_voltage / cell.nominal_voltage + SERIES_EPSILON).floor();
    if !(low.is_finite() && high.is_finite()) || high < low || high >= f64::from(u32::MAX) {
        return None;
    }
    Some(low as u32..=high as u32)
}

/// Restartable candidate space: `iter()` can be called any number of times
/// and each call walks the full space from the start.
#[derive(Debug, Clone, Copy)]
pub struct CandidateSpace<'a> {
    cells: &'a [Arc<CellSpec>],
    requirements: &'a Requirements,
    max_parallel: u32,
}

impl<'a> CandidateSpace<'a> {
    pub fn new(cells: &'a [Arc<CellSpec>], requirements: &'a Requirements, max_parallel: u32) -> Self {
        Self {
            cells,
            requirements,
            max_parallel,
        }
    }

    /// Candidates for one cell, or the reason the whole cell is skipped.
    ///
    /// Parallel counts start at the smallest count meeting both the energy
    /// and power floors and run up to `max_parallel` inclusive.
    fn cell_candidates(
        self,
        cell: &'a Arc<CellSpec>,
    ) -> Result<impl Iterator<Item = Candidate<'a>> + 'a, Rejection> {
        let requirements = self.requirements;
        if !layout::clears_height(cell.height_mm, requirements.max_height) {
            return Err(Rejection::Height);
        }
        let series = series_range(cell, requirements).ok_or(Rejection::VoltageWindow)?;
        let max_parallel = self.max_parallel;

        Ok(series.flat_map(move |series| {
            let start = min_parallel_for(cell, series, requirements.min_energy, requirements.min_continuous_power);
            (start..=max_parallel).map(move |parallel| Candidate {
                cell,
                series,
                parallel,
            })
        }))
    }

    /// Walks every cell in catalogue order. A skipped cell shows up once as
    /// `Err` carrying its rejection, in place of its candidates.
    pub fn iter(self) -> impl Iterator<Item = Enumerated<'a>> + 'a {
        self.cells.iter().flat_map(move |cell| {
            let (candidates, skipped) = match self.cell_candidates(cell) {
                Ok(candidates) => (Some(candidates), None),
                Err(rejection) => (None, Some(Err((cell, rejection)))),
            };
            candidates.into_iter().flatten().map(Ok).chain(skipped)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packcore::Chemistry;

    fn cell(nominal: f64, height: f64) -> Arc<CellSpec> {
        Arc::new(CellSpec {
            brand: String::new(),
            model: format!("{nominal}V"),
            chemistry: Chemistry::Lfp,
            nominal_voltage: nominal,
            charge_voltage: nominal + 0.45,
            capacity_ah: 30.0,
            max_continuous_discharge_c: 2.0,
            max_continuous_charge_c: 1.0,
            max_peak_discharge_c: None,
            impedance_mohm: 1.5,
            thickness_mm: 20.0,
            width_mm: 100.0,
            height_mm: height,
            weight_kg: 0.615,
            cycle_life: 3000,
            price: 12.0,
        })
    }

    fn requirements() -> Requirements {
        Requirements {
            min_voltage: 48.0,
            max_voltage: 52.0,
            min_energy: 5000.0,
            min_continuous_power: 2000.0,
            max_weight: 100.0,
            max_price: 5000.0,
            max_width: 1000.0,
            max_length: 1000.0,
            max_height: 500.0,
            ambient_temp: 25.0,
            debug: false,
        }
    }

    #[test]
    fn test_series_range_uses_nominal_bounds() {
        let range = series_range(&cell(3.2, 140.0), &requirements()).unwrap();
        assert_eq!(range, 15..=16);
        // 48 / 3.7 = 12.97, 52 / 3.7 = 14.05
        assert_eq!(series_range(&cell(3.7, 140.0), &requirements()).unwrap(), 13..=14);
    }

    #[test]
    fn test_empty_voltage_window() {
        let mut req = requirements();
        req.min_voltage = 50.0;
        req.max_voltage = 51.0;
        // 50 / 3.2 = 15.6, 51 / 3.2 = 15.9
        assert!(series_range(&cell(3.2, 140.0), &req).is_none());
    }

    #[test]
    fn test_enumeration_is_restartable_and_unique() {
        let cells = vec![cell(3.2, 140.0), cell(3.7, 140.0), cell(3.2, 480.0)];
        let req = requirements();
        let space = CandidateSpace::new(&cells, &req, 5);

        let triple = |c: Candidate<'_>| (c.cell.model.clone(), c.series, c.parallel);
        let first: Vec<_> = space.iter().filter_map(Result::ok).map(triple).collect();
        let second: Vec<_> = space.iter().filter_map(Result::ok).map(triple).collect();
        assert_eq!(first, second);
        assert!(!first.is_empty());

        let mut triples: Vec<_> = space
            .iter()
            .filter_map(Result::ok)
            .map(|c| (Arc::as_ptr(c.cell) as usize, c.series, c.parallel))
            .collect();
        let before = triples.len();
        triples.sort_unstable();
        triples.dedup();
        assert_eq!(before, triples.len());

        // The tall cell is reported once and yields no candidates
        assert!(space.iter().filter_map(Result::ok).all(|c| c.cell.height_mm < 480.0));
        let skipped: Vec<_> = space.iter().filter_map(Result::err).collect();
        assert_eq!(skipped.len(), 1);
        assert!(Arc::ptr_eq(skipped[0].0, &cells[2]));
        assert_eq!(skipped[0].1, Rejection::Height);
    }

    #[test]
    fn test_parallel_starts_at_floor() {
        let cells = vec![cell(3.2, 140.0)];
        let req = requirements();
        let space = CandidateSpace::new(&cells, &req, 5);
        // 15S: 1440 Wh per string -> 4P floor; 16S: 1536 Wh -> 4P floor
        let parallels: Vec<_> = space
            .iter()
            .filter_map(Result::ok)
            .map(|c| (c.series, c.parallel))
            .collect();
        assert_eq!(parallels, vec![(15, 4), (15, 5), (16, 4), (16, 5)]);
    }
}
