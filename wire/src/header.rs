//! Packet header types and constants.

/// Magic number identifying dsync packets.
///
/// This value is fixed and must never change across versions.
pub const MAGIC: u32 = 0x4453_594E; // "DSYN" in ASCII

/// Current wire format version.
pub const VERSION: u16 = 1;

/// Header size in bytes (24 total).
pub const HEADER_SIZE: usize = 4 + 2 + 1 + 1 + 8 + 4 + 2 + 2;

/// Packet kind carried in every header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    /// Server to client: a batch of deltas.
    DeltaSet = 1,
    /// Client to server: cumulative acknowledgement.
    Ack = 2,
}

impl PacketKind {
    /// Parses a packet kind from its raw byte.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::DeltaSet),
            2 => Some(Self::Ack),
            _ => None,
        }
    }
}

/// Delta set flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SetFlags(u8);

impl SetFlags {
    /// The set carries full element state as part of the join snapshot.
    pub const SNAPSHOT: u8 = 1 << 0;

    /// The set is the last one of the join snapshot.
    pub const SNAPSHOT_END: u8 = 1 << 1;

    /// Reserved bits mask (must be zero in version 1).
    const RESERVED_MASK: u8 = !0b11;

    /// Creates flags from a raw value.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// Returns the raw flag bits.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Flags for an incremental set.
    #[must_use]
    pub const fn incremental() -> Self {
        Self(0)
    }

    /// Flags for a snapshot set; `last` marks the end of the snapshot.
    #[must_use]
    pub const fn snapshot(last: bool) -> Self {
        if last {
            Self(Self::SNAPSHOT | Self::SNAPSHOT_END)
        } else {
            Self(Self::SNAPSHOT)
        }
    }

    /// Returns `true` if the set belongs to the join snapshot.
    #[must_use]
    pub const fn is_snapshot(self) -> bool {
        self.0 & Self::SNAPSHOT != 0
    }

    /// Returns `true` if the set completes the join snapshot.
    #[must_use]
    pub const fn is_snapshot_end(self) -> bool {
        self.0 & Self::SNAPSHOT_END != 0
    }

    /// Returns `true` if no reserved bits are set and `SNAPSHOT_END` only
    /// appears together with `SNAPSHOT`.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        if self.0 & Self::RESERVED_MASK != 0 {
            return false;
        }
        !self.is_snapshot_end() || self.is_snapshot()
    }
}

/// Packet header (version 1).
///
/// The magic number is validated during decoding and is not stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Wire format version.
    pub version: u16,
    /// Packet kind.
    pub kind: PacketKind,
    /// Set flags (zero for acks).
    pub flags: SetFlags,
    /// Identity of the map instance the packet belongs to.
    pub map_id: u64,
    /// Set sequence, or the acknowledged sequence for acks.
    pub sequence: u32,
    /// Number of deltas in the payload (zero for acks).
    pub count: u16,
    /// Payload length in bytes.
    pub payload_len: u16,
}

impl PacketHeader {
    /// Creates a header for a delta set.
    #[must_use]
    pub const fn delta_set(
        map_id: u64,
        sequence: u32,
        flags: SetFlags,
        count: u16,
        payload_len: u16,
    ) -> Self {
        Self {
            version: VERSION,
            kind: PacketKind::DeltaSet,
            flags,
            map_id,
            sequence,
            count,
            payload_len,
        }
    }

    /// Creates a header for a cumulative acknowledgement.
    #[must_use]
    pub const fn ack(map_id: u64, sequence: u32) -> Self {
        Self {
            version: VERSION,
            kind: PacketKind::Ack,
            flags: SetFlags::incremental(),
            map_id,
            sequence,
            count: 0,
            payload_len: 0,
        }
    }
}
