//! Element identifiers.

use std::fmt;

/// The kind of map element tracked by the delta pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ElementKind {
    Sector = 0,
    Side = 1,
    Poly = 2,
}

impl ElementKind {
    pub const ALL: [Self; 3] = [Self::Sector, Self::Side, Self::Poly];

    /// Parses a kind from its 2-bit wire tag.
    #[must_use]
    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::Sector),
            1 => Some(Self::Side),
            2 => Some(Self::Poly),
            _ => None,
        }
    }

    /// The 2-bit wire tag.
    #[must_use]
    pub const fn tag(self) -> u32 {
        self as u32
    }

    /// Number of tracked fields; also the width of the field mask on the wire.
    #[must_use]
    pub const fn field_count(self) -> u8 {
        match self {
            Self::Sector => 12,
            Self::Side => 7,
            Self::Poly => 8,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sector => "sector",
            Self::Side => "side",
            Self::Poly => "poly",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifies one element of the current map.
///
/// Ids are only meaningful for the map they were issued on. Ordering is by
/// kind, then index, which gives every pool the same iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementId {
    pub kind: ElementKind,
    pub index: u32,
}

impl ElementId {
    #[must_use]
    pub const fn new(kind: ElementKind, index: u32) -> Self {
        Self { kind, index }
    }

    #[must_use]
    pub const fn sector(index: u32) -> Self {
        Self::new(ElementKind::Sector, index)
    }

    #[must_use]
    pub const fn side(index: u32) -> Self {
        Self::new(ElementKind::Side, index)
    }

    #[must_use]
    pub const fn poly(index: u32) -> Self {
        Self::new(ElementKind::Poly, index)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.index)
    }
}
