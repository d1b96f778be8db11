//! Tracked fields and changed-field masks.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::ElementKind;

/// Set of changed fields of one element; bit `i` is field index `i`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldMask(u16);

impl FieldMask {
    pub const EMPTY: Self = Self(0);

    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Every tracked field of `kind`.
    #[must_use]
    pub const fn full(kind: ElementKind) -> Self {
        Self((1u16 << kind.field_count()) - 1)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    #[must_use]
    pub const fn contains(self, index: u8) -> bool {
        index < 16 && self.0 & (1 << index) != 0
    }

    pub fn insert(&mut self, index: u8) {
        if index < 16 {
            self.0 |= 1 << index;
        }
    }

    /// Returns `true` if no bit beyond the field count of `kind` is set.
    #[must_use]
    pub const fn fits(self, kind: ElementKind) -> bool {
        self.0 & !Self::full(kind).0 == 0
    }

    /// Field indices in ascending (wire) order.
    pub fn indices(self) -> impl Iterator<Item = u8> {
        (0u8..16).filter(move |&i| self.contains(i))
    }
}

impl BitOr for FieldMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FieldMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for FieldMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldMask({:#06b})", self.0)
    }
}

/// Noise class of a field, selecting which threshold applies to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    Height,
    Offset,
    Speed,
    Position,
    Angle,
    /// Identity-compared: textures, light, color, flags.
    Exact,
}

/// Tracked sector fields, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SectorField {
    FloorHeight = 0,
    CeilingHeight,
    LightLevel,
    FloorTexture,
    CeilingTexture,
    Color,
    FloorTarget,
    FloorSpeed,
    CeilingTarget,
    CeilingSpeed,
    FloorOffset,
    CeilingOffset,
}

impl SectorField {
    pub const ALL: [Self; 12] = [
        Self::FloorHeight,
        Self::CeilingHeight,
        Self::LightLevel,
        Self::FloorTexture,
        Self::CeilingTexture,
        Self::Color,
        Self::FloorTarget,
        Self::FloorSpeed,
        Self::CeilingTarget,
        Self::CeilingSpeed,
        Self::FloorOffset,
        Self::CeilingOffset,
    ];

    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn class(self) -> FieldClass {
        match self {
            Self::FloorHeight | Self::CeilingHeight | Self::FloorTarget | Self::CeilingTarget => {
                FieldClass::Height
            }
            Self::FloorSpeed | Self::CeilingSpeed => FieldClass::Speed,
            Self::FloorOffset | Self::CeilingOffset => FieldClass::Offset,
            Self::LightLevel | Self::FloorTexture | Self::CeilingTexture | Self::Color => {
                FieldClass::Exact
            }
        }
    }
}

/// Tracked side fields, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SideField {
    TopTexture = 0,
    MiddleTexture,
    BottomTexture,
    OffsetX,
    OffsetY,
    LineFlags,
    MiddleAlpha,
}

impl SideField {
    pub const ALL: [Self; 7] = [
        Self::TopTexture,
        Self::MiddleTexture,
        Self::BottomTexture,
        Self::OffsetX,
        Self::OffsetY,
        Self::LineFlags,
        Self::MiddleAlpha,
    ];

    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn class(self) -> FieldClass {
        match self {
            Self::OffsetX | Self::OffsetY => FieldClass::Offset,
            _ => FieldClass::Exact,
        }
    }
}

/// Tracked polyobject fields, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PolyField {
    OriginX = 0,
    OriginY,
    Angle,
    DestX,
    DestY,
    Speed,
    DestAngle,
    AngleSpeed,
}

impl PolyField {
    pub const ALL: [Self; 8] = [
        Self::OriginX,
        Self::OriginY,
        Self::Angle,
        Self::DestX,
        Self::DestY,
        Self::Speed,
        Self::DestAngle,
        Self::AngleSpeed,
    ];

    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn class(self) -> FieldClass {
        match self {
            Self::OriginX | Self::OriginY | Self::DestX | Self::DestY => FieldClass::Position,
            Self::Speed => FieldClass::Speed,
            Self::Angle | Self::DestAngle | Self::AngleSpeed => FieldClass::Angle,
        }
    }
}

impl From<SectorField> for FieldMask {
    fn from(field: SectorField) -> Self {
        Self(1 << field.index())
    }
}

impl From<SideField> for FieldMask {
    fn from(field: SideField) -> Self {
        Self(1 << field.index())
    }
}

impl From<PolyField> for FieldMask {
    fn from(field: PolyField) -> Self {
        Self(1 << field.index())
    }
}
