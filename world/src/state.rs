//! Per-element tracked state.

use crate::{Angle, ElementKind, FieldMask, Fixed, PolyField, SectorField, SideField};

/// Material index; compared by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextureId(pub u16);

/// Tracked sector properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectorState {
    pub floor_height: Fixed,
    pub ceiling_height: Fixed,
    pub light_level: u8,
    pub floor_texture: TextureId,
    pub ceiling_texture: TextureId,
    pub color: [u8; 3],
    /// Destination of a moving floor; lets clients predict between deltas.
    pub floor_target: Fixed,
    pub floor_speed: Fixed,
    pub ceiling_target: Fixed,
    pub ceiling_speed: Fixed,
    pub floor_offset: [Fixed; 2],
    pub ceiling_offset: [Fixed; 2],
}

/// Tracked sidedef properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SideState {
    pub top_texture: TextureId,
    pub middle_texture: TextureId,
    pub bottom_texture: TextureId,
    pub offset_x: Fixed,
    pub offset_y: Fixed,
    pub line_flags: u16,
    pub middle_alpha: u8,
}

/// Tracked polyobject properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolyState {
    pub origin_x: Fixed,
    pub origin_y: Fixed,
    pub angle: Angle,
    pub dest_x: Fixed,
    pub dest_y: Fixed,
    pub speed: Fixed,
    pub dest_angle: Angle,
    pub angle_speed: Angle,
}

/// Magnitude of a change for identity-compared fields.
const DISTINCT: u32 = u32::MAX;

fn exact<T: PartialEq>(a: &T, b: &T) -> u32 {
    if a == b {
        0
    } else {
        DISTINCT
    }
}

fn pair_diff(a: [Fixed; 2], b: [Fixed; 2]) -> u32 {
    a[0].abs_diff(b[0]).max(a[1].abs_diff(b[1]))
}

impl SectorState {
    /// Size of the change in `field` between `self` and `other`.
    ///
    /// Numeric fields report the raw absolute difference; identity fields
    /// report `0` or `u32::MAX`.
    #[must_use]
    pub fn distance(&self, other: &Self, field: SectorField) -> u32 {
        match field {
            SectorField::FloorHeight => self.floor_height.abs_diff(other.floor_height),
            SectorField::CeilingHeight => self.ceiling_height.abs_diff(other.ceiling_height),
            SectorField::LightLevel => exact(&self.light_level, &other.light_level),
            SectorField::FloorTexture => exact(&self.floor_texture, &other.floor_texture),
            SectorField::CeilingTexture => exact(&self.ceiling_texture, &other.ceiling_texture),
            SectorField::Color => exact(&self.color, &other.color),
            SectorField::FloorTarget => self.floor_target.abs_diff(other.floor_target),
            SectorField::FloorSpeed => self.floor_speed.abs_diff(other.floor_speed),
            SectorField::CeilingTarget => self.ceiling_target.abs_diff(other.ceiling_target),
            SectorField::CeilingSpeed => self.ceiling_speed.abs_diff(other.ceiling_speed),
            SectorField::FloorOffset => pair_diff(self.floor_offset, other.floor_offset),
            SectorField::CeilingOffset => pair_diff(self.ceiling_offset, other.ceiling_offset),
        }
    }

    /// Copies the fields named in `mask` from `from`.
    pub fn copy_fields(&mut self, from: &Self, mask: FieldMask) {
        for field in SectorField::ALL {
            if !mask.contains(field.index()) {
                continue;
            }
            match field {
                SectorField::FloorHeight => self.floor_height = from.floor_height,
                SectorField::CeilingHeight => self.ceiling_height = from.ceiling_height,
                SectorField::LightLevel => self.light_level = from.light_level,
                SectorField::FloorTexture => self.floor_texture = from.floor_texture,
                SectorField::CeilingTexture => self.ceiling_texture = from.ceiling_texture,
                SectorField::Color => self.color = from.color,
                SectorField::FloorTarget => self.floor_target = from.floor_target,
                SectorField::FloorSpeed => self.floor_speed = from.floor_speed,
                SectorField::CeilingTarget => self.ceiling_target = from.ceiling_target,
                SectorField::CeilingSpeed => self.ceiling_speed = from.ceiling_speed,
                SectorField::FloorOffset => self.floor_offset = from.floor_offset,
                SectorField::CeilingOffset => self.ceiling_offset = from.ceiling_offset,
            }
        }
    }
}

impl SideState {
    /// Size of the change in `field`; see [`SectorState::distance`].
    #[must_use]
    pub fn distance(&self, other: &Self, field: SideField) -> u32 {
        match field {
            SideField::TopTexture => exact(&self.top_texture, &other.top_texture),
            SideField::MiddleTexture => exact(&self.middle_texture, &other.middle_texture),
            SideField::BottomTexture => exact(&self.bottom_texture, &other.bottom_texture),
            SideField::OffsetX => self.offset_x.abs_diff(other.offset_x),
            SideField::OffsetY => self.offset_y.abs_diff(other.offset_y),
            SideField::LineFlags => exact(&self.line_flags, &other.line_flags),
            SideField::MiddleAlpha => exact(&self.middle_alpha, &other.middle_alpha),
        }
    }

    pub fn copy_fields(&mut self, from: &Self, mask: FieldMask) {
        for field in SideField::ALL {
            if !mask.contains(field.index()) {
                continue;
            }
            match field {
                SideField::TopTexture => self.top_texture = from.top_texture,
                SideField::MiddleTexture => self.middle_texture = from.middle_texture,
                SideField::BottomTexture => self.bottom_texture = from.bottom_texture,
                SideField::OffsetX => self.offset_x = from.offset_x,
                SideField::OffsetY => self.offset_y = from.offset_y,
                SideField::LineFlags => self.line_flags = from.line_flags,
                SideField::MiddleAlpha => self.middle_alpha = from.middle_alpha,
            }
        }
    }
}

impl PolyState {
    /// Size of the change in `field`; see [`SectorState::distance`].
    #[must_use]
    pub fn distance(&self, other: &Self, field: PolyField) -> u32 {
        match field {
            PolyField::OriginX => self.origin_x.abs_diff(other.origin_x),
            PolyField::OriginY => self.origin_y.abs_diff(other.origin_y),
            PolyField::Angle => self.angle.abs_diff(other.angle),
            PolyField::DestX => self.dest_x.abs_diff(other.dest_x),
            PolyField::DestY => self.dest_y.abs_diff(other.dest_y),
            PolyField::Speed => self.speed.abs_diff(other.speed),
            PolyField::DestAngle => self.dest_angle.abs_diff(other.dest_angle),
            PolyField::AngleSpeed => self.angle_speed.abs_diff(other.angle_speed),
        }
    }

    pub fn copy_fields(&mut self, from: &Self, mask: FieldMask) {
        for field in PolyField::ALL {
            if !mask.contains(field.index()) {
                continue;
            }
            match field {
                PolyField::OriginX => self.origin_x = from.origin_x,
                PolyField::OriginY => self.origin_y = from.origin_y,
                PolyField::Angle => self.angle = from.angle,
                PolyField::DestX => self.dest_x = from.dest_x,
                PolyField::DestY => self.dest_y = from.dest_y,
                PolyField::Speed => self.speed = from.speed,
                PolyField::DestAngle => self.dest_angle = from.dest_angle,
                PolyField::AngleSpeed => self.angle_speed = from.angle_speed,
            }
        }
    }
}

/// State of any tracked element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElementState {
    Sector(SectorState),
    Side(SideState),
    Poly(PolyState),
}

impl ElementState {
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        match self {
            Self::Sector(_) => ElementKind::Sector,
            Self::Side(_) => ElementKind::Side,
            Self::Poly(_) => ElementKind::Poly,
        }
    }

    /// Copies the masked fields from `from`. Returns `false` on a kind mismatch.
    pub fn copy_fields(&mut self, from: &Self, mask: FieldMask) -> bool {
        match (self, from) {
            (Self::Sector(dst), Self::Sector(src)) => dst.copy_fields(src, mask),
            (Self::Side(dst), Self::Side(src)) => dst.copy_fields(src, mask),
            (Self::Poly(dst), Self::Poly(src)) => dst.copy_fields(src, mask),
            _ => return false,
        }
        true
    }
}
