//! Deterministic map instance identity.

use std::fmt;

use blake3::Hasher;

use crate::ElementCounts;

/// Identity of one loaded map instance.
///
/// Every packet carries it; anything stamped with another id belongs to a
/// previous map and is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapId(u64);

impl MapId {
    /// Derives the id from the map name, its element counts and the server's
    /// map epoch (incremented on every map load, including reloads).
    #[must_use]
    pub fn derive(name: &str, counts: ElementCounts, epoch: u32) -> Self {
        let mut hasher = Hasher::new();
        write_u32(&mut hasher, len_u32(name.len()));
        hasher.update(name.as_bytes());
        write_u32(&mut hasher, counts.sectors);
        write_u32(&mut hasher, counts.sides);
        write_u32(&mut hasher, counts.polys);
        write_u32(&mut hasher, epoch);

        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[0..8]);
        Self(u64::from_le_bytes(bytes))
    }

    /// Stamp for one client session on this map.
    ///
    /// A client that leaves and joins again gets a new `generation`, so
    /// packets still in flight from its earlier session no longer match.
    #[must_use]
    pub fn session(self, generation: u32) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(b"session");
        hasher.update(&self.0.to_le_bytes());
        write_u32(&mut hasher, generation);

        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[0..8]);
        Self(u64::from_le_bytes(bytes))
    }

    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

fn len_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

fn write_u32(hasher: &mut Hasher, value: u32) {
    hasher.update(&value.to_le_bytes());
}
