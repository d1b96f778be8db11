//! Error types for bitstream operations.

use std::fmt;

/// Result type for bitstream operations.
pub type BitResult<T> = Result<T, BitError>;

/// Errors that can occur while packing or unpacking bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitError {
    /// Attempted to read past the end of the buffer.
    UnexpectedEof {
        /// Number of bits requested.
        requested: usize,
        /// Number of bits available.
        available: usize,
    },

    /// Bit count outside of `0..=32`.
    InvalidBitCount { bits: u8, max_bits: u8 },

    /// Value does not fit in the requested number of bits.
    ValueOutOfRange { value: u32, bits: u8 },

    /// Byte-aligned access attempted at a non-aligned position.
    MisalignedAccess { bit_position: usize },

    /// Varint longer than five bytes.
    InvalidVarint,
}

impl fmt::Display for BitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof {
                requested,
                available,
            } => write!(
                f,
                "attempted to read {requested} bits but only {available} bits available"
            ),
            Self::InvalidBitCount { bits, max_bits } => {
                write!(f, "invalid bit count {bits}, maximum allowed is {max_bits}")
            }
            Self::ValueOutOfRange { value, bits } => {
                write!(f, "value {value} cannot be represented in {bits} bits")
            }
            Self::MisalignedAccess { bit_position } => {
                write!(f, "aligned access at bit position {bit_position}")
            }
            Self::InvalidVarint => write!(f, "varint exceeds 5 bytes"),
        }
    }
}

impl std::error::Error for BitError {}
