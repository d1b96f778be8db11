//! Element counts and an owned map state.

use std::collections::BTreeMap;

use crate::{
    ElementId, ElementKind, ElementState, FieldMask, Point, PolyState, SectorState, SideState,
    WorldMirror, WorldView,
};

/// Number of elements of each kind on a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementCounts {
    pub sectors: u32,
    pub sides: u32,
    pub polys: u32,
}

impl ElementCounts {
    #[must_use]
    pub const fn new(sectors: u32, sides: u32, polys: u32) -> Self {
        Self {
            sectors,
            sides,
            polys,
        }
    }

    #[must_use]
    pub const fn count(&self, kind: ElementKind) -> u32 {
        match kind {
            ElementKind::Sector => self.sectors,
            ElementKind::Side => self.sides,
            ElementKind::Poly => self.polys,
        }
    }

    /// Returns `true` if `id` is in range for this map.
    #[must_use]
    pub const fn contains(&self, id: ElementId) -> bool {
        id.index < self.count(id.kind)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.sectors as usize + self.sides as usize + self.polys as usize
    }

    /// Every element id, sectors first, in ascending order.
    pub fn ids(self) -> impl Iterator<Item = ElementId> {
        ElementKind::ALL.into_iter().flat_map(move |kind| {
            (0..self.count(kind)).map(move |index| ElementId::new(kind, index))
        })
    }
}

/// An owned copy of every tracked element of a map.
///
/// Serves as the authoritative world in simulations and tests, and as the
/// client-side mirror that delta sets are applied to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapState {
    sectors: Vec<SectorState>,
    sides: Vec<SideState>,
    polys: Vec<PolyState>,
    origins: BTreeMap<ElementId, Point>,
}

impl MapState {
    /// Creates a map whose elements all hold default state.
    #[must_use]
    pub fn new(counts: ElementCounts) -> Self {
        Self {
            sectors: vec![SectorState::default(); counts.sectors as usize],
            sides: vec![SideState::default(); counts.sides as usize],
            polys: vec![PolyState::default(); counts.polys as usize],
            origins: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn from_parts(
        sectors: Vec<SectorState>,
        sides: Vec<SideState>,
        polys: Vec<PolyState>,
    ) -> Self {
        Self {
            sectors,
            sides,
            polys,
            origins: BTreeMap::new(),
        }
    }

    pub fn sector_mut(&mut self, index: u32) -> Option<&mut SectorState> {
        self.sectors.get_mut(index as usize)
    }

    pub fn side_mut(&mut self, index: u32) -> Option<&mut SideState> {
        self.sides.get_mut(index as usize)
    }

    pub fn poly_mut(&mut self, index: u32) -> Option<&mut PolyState> {
        self.polys.get_mut(index as usize)
    }

    /// Records where a sector or side sits, for distance throttling.
    pub fn set_origin(&mut self, id: ElementId, point: Point) {
        self.origins.insert(id, point);
    }

    #[must_use]
    pub fn sectors(&self) -> &[SectorState] {
        &self.sectors
    }

    #[must_use]
    pub fn sides(&self) -> &[SideState] {
        &self.sides
    }

    #[must_use]
    pub fn polys(&self) -> &[PolyState] {
        &self.polys
    }

    /// Replaces a whole element. Returns `false` if `id` is out of range or
    /// `state` is of another kind.
    pub fn set_element(&mut self, id: ElementId, state: ElementState) -> bool {
        match (id.kind, state) {
            (ElementKind::Sector, ElementState::Sector(s)) => slot(&mut self.sectors, id.index, s),
            (ElementKind::Side, ElementState::Side(s)) => slot(&mut self.sides, id.index, s),
            (ElementKind::Poly, ElementState::Poly(s)) => slot(&mut self.polys, id.index, s),
            _ => false,
        }
    }
}

fn slot<T>(items: &mut [T], index: u32, value: T) -> bool {
    match items.get_mut(index as usize) {
        Some(item) => {
            *item = value;
            true
        }
        None => false,
    }
}

fn len_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl WorldView for MapState {
    fn counts(&self) -> ElementCounts {
        ElementCounts::new(
            len_u32(self.sectors.len()),
            len_u32(self.sides.len()),
            len_u32(self.polys.len()),
        )
    }

    fn sector(&self, index: u32) -> Option<SectorState> {
        self.sectors.get(index as usize).copied()
    }

    fn side(&self, index: u32) -> Option<SideState> {
        self.sides.get(index as usize).copied()
    }

    fn poly(&self, index: u32) -> Option<PolyState> {
        self.polys.get(index as usize).copied()
    }

    fn origin(&self, id: ElementId) -> Option<Point> {
        if let Some(point) = self.origins.get(&id) {
            return Some(*point);
        }
        match id.kind {
            ElementKind::Poly => self
                .poly(id.index)
                .map(|poly| Point::new(poly.origin_x, poly.origin_y)),
            _ => None,
        }
    }
}

impl WorldMirror for MapState {
    fn apply_fields(&mut self, id: ElementId, from: &ElementState, mask: FieldMask) -> bool {
        match (id.kind, from) {
            (ElementKind::Sector, ElementState::Sector(src)) => self
                .sector_mut(id.index)
                .map(|dst| dst.copy_fields(src, mask))
                .is_some(),
            (ElementKind::Side, ElementState::Side(src)) => self
                .side_mut(id.index)
                .map(|dst| dst.copy_fields(src, mask))
                .is_some(),
            (ElementKind::Poly, ElementState::Poly(src)) => self
                .poly_mut(id.index)
                .map(|dst| dst.copy_fields(src, mask))
                .is_some(),
            _ => false,
        }
    }
}
