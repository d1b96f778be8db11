//! Configurable limits for bounded decoding.

/// Wire-level limits for packet decoding.
///
/// A delta set must fit in a single unreliable datagram, so the packet byte
/// limit doubles as the set size budget on the encoding side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum packet size in bytes, header included.
    pub max_packet_bytes: usize,

    /// Maximum number of deltas announced in one set.
    pub max_deltas_per_set: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            // Stays under a typical 1500 byte MTU after IP/UDP headers.
            max_packet_bytes: 1400,
            max_deltas_per_set: 256,
        }
    }
}

impl Limits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_packet_bytes: 512,
            max_deltas_per_set: 64,
        }
    }

    /// Creates limits with no restrictions beyond the header field widths.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_packet_bytes: usize::MAX,
            max_deltas_per_set: u16::MAX as usize,
        }
    }

    /// Largest payload that fits under `max_packet_bytes`.
    #[must_use]
    pub const fn max_payload_bytes(&self) -> usize {
        let payload = self.max_packet_bytes.saturating_sub(crate::HEADER_SIZE);
        if payload > u16::MAX as usize {
            u16::MAX as usize
        } else {
            payload
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fits_a_datagram() {
        let limits = Limits::default();
        assert!(limits.max_packet_bytes <= 1472);
        assert_eq!(limits.max_payload_bytes(), 1400 - crate::HEADER_SIZE);
    }

    #[test]
    fn testing_limits_smaller() {
        let test_limits = Limits::for_testing();
        let default_limits = Limits::default();
        assert!(test_limits.max_packet_bytes < default_limits.max_packet_bytes);
        assert!(test_limits.max_deltas_per_set < default_limits.max_deltas_per_set);
    }

    #[test]
    fn unlimited_payload_is_capped_by_length_field() {
        assert_eq!(Limits::unlimited().max_payload_bytes(), u16::MAX as usize);
    }

    #[test]
    fn limits_const_constructible() {
        const LIMITS: Limits = Limits::for_testing();
        assert_eq!(LIMITS.max_packet_bytes, 512);
    }
}
