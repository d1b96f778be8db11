//! Record store: the last-enqueued state of every element for one client.

use world::{
    ElementCounts, ElementId, ElementKind, ElementState, PolyState, SectorState, SideState,
    WorldView,
};

use crate::Delta;

/// Baseline the delta encoder diffs against.
///
/// Captured from the world when a client joins (the same values its initial
/// snapshot carries) and advanced only by committing deltas that were
/// actually enqueued. Discarded with the pool on leave or map change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStore {
    counts: ElementCounts,
    sectors: Vec<SectorState>,
    sides: Vec<SideState>,
    polys: Vec<PolyState>,
}

impl RecordStore {
    /// Copies the current state of every element of `world`.
    #[must_use]
    pub fn capture<W: WorldView + ?Sized>(world: &W) -> Self {
        let counts = world.counts();
        let sectors = (0..counts.sectors)
            .map(|i| world.sector(i).unwrap_or_default())
            .collect();
        let sides = (0..counts.sides)
            .map(|i| world.side(i).unwrap_or_default())
            .collect();
        let polys = (0..counts.polys)
            .map(|i| world.poly(i).unwrap_or_default())
            .collect();
        Self {
            counts,
            sectors,
            sides,
            polys,
        }
    }

    #[must_use]
    pub const fn counts(&self) -> ElementCounts {
        self.counts
    }

    /// Last-enqueued state of `id`.
    #[must_use]
    pub fn state(&self, id: ElementId) -> Option<ElementState> {
        let index = id.index as usize;
        match id.kind {
            ElementKind::Sector => self.sectors.get(index).copied().map(ElementState::Sector),
            ElementKind::Side => self.sides.get(index).copied().map(ElementState::Side),
            ElementKind::Poly => self.polys.get(index).copied().map(ElementState::Poly),
        }
    }

    /// Advances the baseline by the masked fields of `delta`.
    ///
    /// Returns `false` if the delta targets an element this store lacks.
    pub fn commit(&mut self, delta: &Delta) -> bool {
        let index = delta.index() as usize;
        match delta {
            Delta::Sector { fields, state, .. } => self
                .sectors
                .get_mut(index)
                .map(|base| base.copy_fields(state, *fields))
                .is_some(),
            Delta::Side { fields, state, .. } => self
                .sides
                .get_mut(index)
                .map(|base| base.copy_fields(state, *fields))
                .is_some(),
            Delta::Poly { fields, state, .. } => self
                .polys
                .get_mut(index)
                .map(|base| base.copy_fields(state, *fields))
                .is_some(),
        }
    }
}
