//! Delta encoding: comparing an element against its last-sent state.

use world::{ElementId, ElementState, FieldClass, FieldMask, PolyField, SectorField, SideField};

use crate::Delta;

/// Per-class noise thresholds in raw units.
///
/// A numeric change whose absolute difference is at most the threshold of
/// its class is treated as unchanged. Identity-compared fields (textures,
/// light, color, flags) are never thresholded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NoiseThresholds {
    /// Plane heights and targets (16.16 units).
    pub height: u32,
    /// Texture offsets (16.16 units).
    pub offset: u32,
    /// Plane and polyobject speeds (16.16 units).
    pub speed: u32,
    /// Polyobject positions (16.16 units).
    pub position: u32,
    /// Polyobject angles (binary angle units).
    pub angle: u32,
}

impl NoiseThresholds {
    /// Every change counts.
    #[must_use]
    pub const fn exact() -> Self {
        Self {
            height: 0,
            offset: 0,
            speed: 0,
            position: 0,
            angle: 0,
        }
    }

    #[must_use]
    pub const fn threshold(&self, class: FieldClass) -> u32 {
        match class {
            FieldClass::Height => self.height,
            FieldClass::Offset => self.offset,
            FieldClass::Speed => self.speed,
            FieldClass::Position => self.position,
            FieldClass::Angle => self.angle,
            FieldClass::Exact => 0,
        }
    }

    fn changed(&self, class: FieldClass, distance: u32) -> bool {
        distance > self.threshold(class)
    }
}

/// Compares `current` against `last_sent` and returns a delta naming every
/// field that moved past its noise threshold.
///
/// Returns `None` when nothing changed, or when the states do not match the
/// kind of `id`. Never touches any baseline; the caller commits the delta once
/// it has actually been enqueued.
#[must_use]
pub fn encode(
    id: ElementId,
    current: &ElementState,
    last_sent: &ElementState,
    thresholds: &NoiseThresholds,
) -> Option<Delta> {
    if current.kind() != id.kind {
        return None;
    }
    let fields = changed_fields(current, last_sent, thresholds)?;
    Delta::new(id.index, fields, *current)
}

fn changed_fields(
    current: &ElementState,
    last_sent: &ElementState,
    thresholds: &NoiseThresholds,
) -> Option<FieldMask> {
    let mut mask = FieldMask::EMPTY;
    match (current, last_sent) {
        (ElementState::Sector(now), ElementState::Sector(then)) => {
            for field in SectorField::ALL {
                if thresholds.changed(field.class(), now.distance(then, field)) {
                    mask.insert(field.index());
                }
            }
        }
        (ElementState::Side(now), ElementState::Side(then)) => {
            for field in SideField::ALL {
                if thresholds.changed(field.class(), now.distance(then, field)) {
                    mask.insert(field.index());
                }
            }
        }
        (ElementState::Poly(now), ElementState::Poly(then)) => {
            for field in PolyField::ALL {
                if thresholds.changed(field.class(), now.distance(then, field)) {
                    mask.insert(field.index());
                }
            }
        }
        _ => return None,
    }
    Some(mask)
}

/// A delta carrying every tracked field of `state`.
#[must_use]
pub fn full_delta(index: u32, state: ElementState) -> Delta {
    let fields = FieldMask::full(state.kind());
    match state {
        ElementState::Sector(state) => Delta::Sector {
            index,
            fields,
            state,
        },
        ElementState::Side(state) => Delta::Side {
            index,
            fields,
            state,
        },
        ElementState::Poly(state) => Delta::Poly {
            index,
            fields,
            state,
        },
    }
}
