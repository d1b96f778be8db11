//! Client-side application of deltas to a mirrored world.

use tracing::warn;
use world::WorldMirror;

use crate::error::ApplyError;
use crate::set::DeltaSet;
use crate::Delta;

/// Outcome of applying one delta set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub rejected: Vec<ApplyError>,
}

impl ApplyReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Writes the masked fields of `delta` into `mirror`.
///
/// Unmasked fields are left untouched, so applying the same delta twice
/// has the same effect as applying it once.
pub fn apply_delta<M: WorldMirror + ?Sized>(mirror: &mut M, delta: &Delta) -> Result<(), ApplyError> {
    let id = delta.id();
    let counts = mirror.counts();
    if !counts.contains(id) {
        return Err(ApplyError::InvalidReference { id, counts });
    }
    if mirror.apply_fields(id, &delta.state(), delta.fields()) {
        Ok(())
    } else {
        Err(ApplyError::InvalidReference { id, counts })
    }
}

/// Applies every delta of `set`. Invalid deltas are skipped and reported;
/// the rest of the set still applies.
pub fn apply_delta_set<M: WorldMirror + ?Sized>(mirror: &mut M, set: &DeltaSet) -> ApplyReport {
    let mut report = ApplyReport::default();
    for delta in &set.deltas {
        match apply_delta(mirror, delta) {
            Ok(()) => report.applied += 1,
            Err(err) => {
                warn!(sequence = set.sequence.raw(), error = %err, "delta rejected");
                report.rejected.push(err);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sequence;
    use wire::SetFlags;
    use world::{
        ElementCounts, ElementId, ElementState, Fixed, MapState, SectorField, SectorState,
        WorldView,
    };

    fn floor_delta(index: u32, floor: i32) -> Delta {
        let state = SectorState {
            floor_height: Fixed::from_int(floor),
            light_level: 255,
            ..SectorState::default()
        };
        Delta::new(index, SectorField::FloorHeight.into(), ElementState::Sector(state)).unwrap()
    }

    #[test]
    fn apply_touches_only_masked_fields() {
        let mut mirror = MapState::new(ElementCounts::new(2, 0, 0));
        if let Some(sector) = mirror.sector_mut(1) {
            sector.light_level = 100;
        }
        apply_delta(&mut mirror, &floor_delta(1, 16)).unwrap();
        let sector = mirror.sector(1).unwrap();
        assert_eq!(sector.floor_height, Fixed::from_int(16));
        assert_eq!(sector.light_level, 100);
    }

    #[test]
    fn out_of_range_is_invalid_reference() {
        let mut mirror = MapState::new(ElementCounts::new(2, 0, 0));
        let err = apply_delta(&mut mirror, &floor_delta(2, 16)).unwrap_err();
        assert_eq!(
            err,
            ApplyError::InvalidReference {
                id: ElementId::sector(2),
                counts: ElementCounts::new(2, 0, 0)
            }
        );
    }

    #[test]
    fn set_application_is_fail_partial() {
        let mut mirror = MapState::new(ElementCounts::new(3, 0, 0));
        let set = DeltaSet {
            sequence: Sequence::new(4),
            flags: SetFlags::incremental(),
            deltas: vec![floor_delta(0, 8), floor_delta(7, 8), floor_delta(2, -8)],
        };
        let report = apply_delta_set(&mut mirror, &set);
        assert_eq!(report.applied, 2);
        assert_eq!(report.rejected.len(), 1);
        assert!(!report.is_clean());
        assert_eq!(mirror.sector(0).unwrap().floor_height, Fixed::from_int(8));
        assert_eq!(mirror.sector(2).unwrap().floor_height, Fixed::from_int(-8));
    }

    #[test]
    fn applying_twice_matches_applying_once() {
        let set = DeltaSet {
            sequence: Sequence::new(1),
            flags: SetFlags::incremental(),
            deltas: vec![floor_delta(0, 8), floor_delta(1, 24)],
        };
        let mut once = MapState::new(ElementCounts::new(2, 0, 0));
        apply_delta_set(&mut once, &set);
        let mut twice = once.clone();
        apply_delta_set(&mut twice, &set);
        assert_eq!(once, twice);
    }
}
