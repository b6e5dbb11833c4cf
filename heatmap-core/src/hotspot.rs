//! Hotspot records and their encoding into activation grids.

use crate::error::{InputError, SimError};
use crate::grid::{Dimensions, Grid};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A cell forced to the source level during the inclusive window
/// `start_round..=end_round`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotspot {
    pub x: u32,
    pub y: u32,
    pub start_round: u32,
    pub end_round: u32,
}

impl Hotspot {
    pub fn new(x: u32, y: u32, start_round: u32, end_round: u32) -> Hotspot {
        Hotspot {
            x,
            y,
            start_round,
            end_round,
        }
    }

    /// Hot before the first round is simulated.
    pub fn active_at_start(&self) -> bool {
        self.start_round == 0 && self.end_round > 0
    }
}

/// A cell selected for sparse output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: u32,
    pub y: u32,
}

impl Coordinate {
    pub fn new(x: u32, y: u32) -> Coordinate {
        Coordinate { x, y }
    }
}

/// Returns `true` when `round` falls inside the window. `0..=0` is the
/// "no hotspot" sentinel and never forces.
#[inline]
pub fn is_forced(start: u32, end: u32, round: u32) -> bool {
    !(start == 0 && end == 0) && start <= round && round <= end
}

/// Activation windows plus the seeded initial temperatures.
#[derive(Clone, Debug, PartialEq)]
pub struct HotspotField {
    pub start: Grid<u32>,
    pub end: Grid<u32>,
    pub initial: Grid<f32>,
}

impl HotspotField {
    /// No hotspots: every window inactive, every cell cold.
    pub fn empty(dims: Dimensions) -> Result<HotspotField, SimError> {
        Ok(HotspotField {
            start: Grid::filled(dims, 0)?,
            end: Grid::filled(dims, 0)?,
            initial: Grid::filled(dims, 0.0)?,
        })
    }

    /// Encodes `hotspots` in input order. Every coordinate is checked before any
    /// cell is written, so a rejected table leaves nothing half-loaded.
    pub fn load(dims: Dimensions, hotspots: &[Hotspot]) -> Result<HotspotField, SimError> {
        let indices = hotspots
            .iter()
            .map(|h| dims.check(h.x, h.y))
            .collect::<Result<Vec<_>, _>>()?;

        let mut field = HotspotField::empty(dims)?;
        for (h, idx) in hotspots.iter().zip(indices) {
            field.apply(idx, h);
        }
        debug!(count = hotspots.len(), "loaded hotspots");
        Ok(field)
    }

    /// Adds one more record on top of the existing ones (last write wins).
    pub fn insert(&mut self, hotspot: Hotspot) -> Result<(), InputError> {
        let idx = self.start.dims().check(hotspot.x, hotspot.y)?;
        self.apply(idx, &hotspot);
        Ok(())
    }

    fn apply(&mut self, idx: usize, h: &Hotspot) {
        self.start.as_mut_slice()[idx] = h.start_round;
        self.end.as_mut_slice()[idx] = h.end_round;
        // Only the round-0 branch touches temperature; an earlier 1.0 survives
        // a later record that starts after round 0.
        if h.active_at_start() {
            self.initial.as_mut_slice()[idx] = 1.0;
        }
    }

    pub fn dims(&self) -> Dimensions {
        self.initial.dims()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(w: usize, h: usize) -> Dimensions {
        Dimensions::new(w, h).unwrap()
    }

    #[test]
    fn hotspot_starting_at_zero_seeds_full_heat() {
        let f = HotspotField::load(dims(3, 3), &[Hotspot::new(1, 2, 0, 5)]).unwrap();
        assert_eq!(f.initial.get(1, 2), 1.0);
        assert_eq!(f.start.get(1, 2), 0);
        assert_eq!(f.end.get(1, 2), 5);
    }

    #[test]
    fn later_hotspot_leaves_cell_cold() {
        let f = HotspotField::load(dims(3, 3), &[Hotspot::new(1, 2, 2, 5)]).unwrap();
        assert_eq!(f.initial.get(1, 2), 0.0);
        assert_eq!(f.start.get(1, 2), 2);
    }

    #[test]
    fn zero_window_is_not_seeded() {
        let f = HotspotField::load(dims(2, 2), &[Hotspot::new(0, 0, 0, 0)]).unwrap();
        assert_eq!(f.initial.get(0, 0), 0.0);
    }

    #[test]
    fn last_record_wins_for_windows() {
        let f = HotspotField::load(
            dims(2, 2),
            &[Hotspot::new(1, 1, 3, 9), Hotspot::new(1, 1, 4, 6)],
        )
        .unwrap();
        assert_eq!(f.start.get(1, 1), 4);
        assert_eq!(f.end.get(1, 1), 6);
    }

    #[test]
    fn later_record_does_not_cool_seeded_cell() {
        let f = HotspotField::load(
            dims(2, 2),
            &[Hotspot::new(0, 1, 0, 2), Hotspot::new(0, 1, 5, 8)],
        )
        .unwrap();
        assert_eq!(f.initial.get(0, 1), 1.0);
        assert_eq!(f.start.get(0, 1), 5);
    }

    #[test]
    fn out_of_bounds_record_rejects_whole_table() {
        let err = HotspotField::load(
            dims(2, 2),
            &[Hotspot::new(0, 0, 0, 3), Hotspot::new(2, 0, 0, 3)],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SimError::Input(InputError::OutOfBounds {
                x: 2,
                y: 0,
                width: 2,
                height: 2
            })
        ));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_field_fails_without_panicking() {
        let huge = Dimensions::new(1 << 30, 1 << 30).unwrap();
        assert!(matches!(
            HotspotField::load(huge, &[]),
            Err(SimError::Resource { .. })
        ));
    }

    #[test]
    fn insert_applies_on_top() {
        let mut f = HotspotField::empty(dims(2, 1)).unwrap();
        f.insert(Hotspot::new(1, 0, 0, 1)).unwrap();
        assert_eq!(f.initial.as_slice(), &[0.0, 1.0]);
        assert!(f.insert(Hotspot::new(0, 1, 0, 1)).is_err());
    }

    #[test]
    fn forcing_window_is_inclusive() {
        assert!(is_forced(2, 5, 2));
        assert!(is_forced(2, 5, 5));
        assert!(!is_forced(2, 5, 1));
        assert!(!is_forced(2, 5, 6));
        assert!(is_forced(0, 3, 1));
        assert!(!is_forced(0, 0, 0));
    }
}
