//! Read and write access to a world held elsewhere.

use crate::{
    ElementCounts, ElementId, ElementKind, ElementState, FieldMask, Point, PolyState, SectorState,
    SideState,
};

/// Read access to the authoritative world.
///
/// The server's map owns the real sectors, sides and polyobjects; the delta
/// pool only ever reads them through this trait.
pub trait WorldView {
    fn counts(&self) -> ElementCounts;

    fn sector(&self, index: u32) -> Option<SectorState>;

    fn side(&self, index: u32) -> Option<SideState>;

    fn poly(&self, index: u32) -> Option<PolyState>;

    /// Map position of an element, used for distance throttling.
    ///
    /// Elements without a position are updated at the highest rate.
    fn origin(&self, id: ElementId) -> Option<Point> {
        let _ = id;
        None
    }

    fn element(&self, id: ElementId) -> Option<ElementState> {
        match id.kind {
            ElementKind::Sector => self.sector(id.index).map(ElementState::Sector),
            ElementKind::Side => self.side(id.index).map(ElementState::Side),
            ElementKind::Poly => self.poly(id.index).map(ElementState::Poly),
        }
    }
}

/// A client-side world that delta sets are written into.
pub trait WorldMirror: WorldView {
    /// Copies the masked fields of `from` into element `id`.
    ///
    /// Returns `false` if `id` does not exist or `from` is of another kind.
    fn apply_fields(&mut self, id: ElementId, from: &ElementState, mask: FieldMask) -> bool;
}

impl<T: WorldView + ?Sized> WorldView for &T {
    fn counts(&self) -> ElementCounts {
        (**self).counts()
    }

    fn sector(&self, index: u32) -> Option<SectorState> {
        (**self).sector(index)
    }

    fn side(&self, index: u32) -> Option<SideState> {
        (**self).side(index)
    }

    fn poly(&self, index: u32) -> Option<PolyState> {
        (**self).poly(index)
    }

    fn origin(&self, id: ElementId) -> Option<Point> {
        (**self).origin(id)
    }
}
