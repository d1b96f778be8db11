//! Delta records.

use world::{
    ElementId, ElementKind, ElementState, FieldMask, PolyState, SectorState, SideState,
};

/// The changed fields of one element.
///
/// Only fields named in `fields` carry meaning; the rest of `state` is
/// whatever the sender happened to hold and is never serialized. A delta is
/// never built with an empty mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Delta {
    Sector {
        index: u32,
        fields: FieldMask,
        state: SectorState,
    },
    Side {
        index: u32,
        fields: FieldMask,
        state: SideState,
    },
    Poly {
        index: u32,
        fields: FieldMask,
        state: PolyState,
    },
}

impl Delta {
    /// Builds a delta for `index` carrying the masked fields of `state`.
    ///
    /// Returns `None` for an empty mask or one with bits past the field count
    /// of the element kind.
    #[must_use]
    pub fn new(index: u32, fields: FieldMask, state: ElementState) -> Option<Self> {
        if fields.is_empty() || !fields.fits(state.kind()) {
            return None;
        }
        Some(match state {
            ElementState::Sector(state) => Self::Sector {
                index,
                fields,
                state,
            },
            ElementState::Side(state) => Self::Side {
                index,
                fields,
                state,
            },
            ElementState::Poly(state) => Self::Poly {
                index,
                fields,
                state,
            },
        })
    }

    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        match self {
            Self::Sector { .. } => ElementKind::Sector,
            Self::Side { .. } => ElementKind::Side,
            Self::Poly { .. } => ElementKind::Poly,
        }
    }

    #[must_use]
    pub const fn index(&self) -> u32 {
        match self {
            Self::Sector { index, .. } | Self::Side { index, .. } | Self::Poly { index, .. } => {
                *index
            }
        }
    }

    #[must_use]
    pub const fn id(&self) -> ElementId {
        ElementId::new(self.kind(), self.index())
    }

    #[must_use]
    pub const fn fields(&self) -> FieldMask {
        match self {
            Self::Sector { fields, .. } | Self::Side { fields, .. } | Self::Poly { fields, .. } => {
                *fields
            }
        }
    }

    /// The carried state, including the unmasked fields.
    #[must_use]
    pub const fn state(&self) -> ElementState {
        match self {
            Self::Sector { state, .. } => ElementState::Sector(*state),
            Self::Side { state, .. } => ElementState::Side(*state),
            Self::Poly { state, .. } => ElementState::Poly(*state),
        }
    }
}
