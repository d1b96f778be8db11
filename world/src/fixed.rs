//! Fixed-point scalars, binary angles and map points.

use std::fmt;

/// Fractional bits of a [`Fixed`] value.
pub const FRACBITS: u32 = 16;

/// Raw value of 1.0 in 16.16 fixed point.
pub const FRACUNIT: i32 = 1 << FRACBITS;

/// A 16.16 fixed-point map coordinate, height or speed.
///
/// Comparisons are exact on the raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fixed(pub i32);

impl Fixed {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(FRACUNIT);

    /// Creates a value from whole map units.
    #[must_use]
    pub const fn from_int(units: i32) -> Self {
        Self(units.wrapping_shl(FRACBITS))
    }

    /// Creates a value from a raw 16.16 representation.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw 16.16 representation.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Whole map units, rounded toward negative infinity.
    #[must_use]
    pub const fn to_int(self) -> i32 {
        self.0 >> FRACBITS
    }

    /// Absolute difference of the raw values.
    #[must_use]
    pub const fn abs_diff(self, other: Self) -> u32 {
        self.0.abs_diff(other.0)
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.to_int();
        let frac = self.0 & (FRACUNIT - 1);
        if frac == 0 {
            write!(f, "{whole}")
        } else {
            write!(f, "{whole}+{frac}/65536")
        }
    }
}

/// A binary angle: the full turn maps onto the `u32` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Angle(pub u32);

impl Angle {
    pub const ANG90: Self = Self(0x4000_0000);
    pub const ANG180: Self = Self(0x8000_0000);
    pub const ANG270: Self = Self(0xC000_0000);

    /// Raw angle bits.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Shortest distance between two angles in raw units.
    #[must_use]
    pub const fn abs_diff(self, other: Self) -> u32 {
        let forward = self.0.wrapping_sub(other.0);
        let backward = other.0.wrapping_sub(self.0);
        if forward < backward {
            forward
        } else {
            backward
        }
    }
}

/// A point on the map plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: Fixed,
    pub y: Fixed,
}

impl Point {
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Creates a point from whole map units.
    #[must_use]
    pub const fn from_units(x: i32, y: i32) -> Self {
        Self {
            x: Fixed::from_int(x),
            y: Fixed::from_int(y),
        }
    }

    /// Octagonal distance approximation: `dx + dy - min(dx, dy) / 2`.
    ///
    /// Never underestimates the straight-line distance by more than ~12%,
    /// which is plenty for update throttling.
    #[must_use]
    pub fn approx_distance(self, other: Self) -> Fixed {
        let dx = i64::from(self.x.0.abs_diff(other.x.0));
        let dy = i64::from(self.y.0.abs_diff(other.y.0));
        let dist = dx + dy - dx.min(dy) / 2;
        Fixed(i32::try_from(dist).unwrap_or(i32::MAX))
    }
}
