//! Limits for delta set encoding and decoding.

/// Codec-level budgets shared by the server and the client.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CodecLimits {
    /// Maximum payload bytes in one delta set (header excluded).
    pub max_set_bytes: usize,
    /// Maximum number of deltas in one delta set.
    pub max_deltas_per_set: usize,
    /// Out-of-order sets a client holds while waiting for a gap to fill.
    pub max_buffered_sets: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_set_bytes: 1400 - wire::HEADER_SIZE,
            max_deltas_per_set: 256,
            max_buffered_sets: 32,
        }
    }
}

impl CodecLimits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_set_bytes: 512 - wire::HEADER_SIZE,
            max_deltas_per_set: 64,
            max_buffered_sets: 8,
        }
    }

    /// Creates limits with no restrictions beyond the header field widths.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_set_bytes: u16::MAX as usize,
            max_deltas_per_set: u16::MAX as usize,
            max_buffered_sets: usize::MAX,
        }
    }

    /// Wire limits that accept every set these limits can produce.
    #[must_use]
    pub fn wire_limits(&self) -> wire::Limits {
        let payload = self.max_set_bytes.min(u16::MAX as usize);
        wire::Limits {
            max_packet_bytes: payload + wire::HEADER_SIZE,
            max_deltas_per_set: self.max_deltas_per_set.min(u16::MAX as usize),
        }
    }
}
