//! Error types for wire format operations.

use std::fmt;

/// Result type for wire format operations.
pub type WireResult<T> = Result<T, DecodeError>;

/// Framing errors raised while decoding a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// Packet is too small to contain the required header.
    PacketTooSmall { actual: usize, required: usize },

    /// Invalid magic number in packet header.
    InvalidMagic { found: u32 },

    /// Unsupported wire version.
    UnsupportedVersion { found: u16 },

    /// Unknown packet kind byte.
    UnknownKind { found: u8 },

    /// Invalid flags for the packet kind.
    InvalidFlags { flags: u8 },

    /// Delta sets are numbered from 1; sequence 0 is reserved.
    InvalidSequence { sequence: u32 },

    /// Payload length mismatch.
    PayloadLengthMismatch { header_len: u16, actual_len: usize },

    /// Limits exceeded.
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// Acknowledgements carry no deltas.
    NonEmptyAck { count: u16, payload_len: u16 },
}

/// Specific wire limits that can be exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    PacketBytes,
    DeltaCount,
}

/// Errors that can occur during encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    BufferTooSmall { needed: usize, available: usize },
    LengthOverflow { length: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PacketTooSmall { actual, required } => {
                write!(
                    f,
                    "packet too small: {actual} bytes, need at least {required}"
                )
            }
            Self::InvalidMagic { found } => {
                write!(f, "invalid magic number: 0x{found:08X}")
            }
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported wire version: {found}")
            }
            Self::UnknownKind { found } => write!(f, "unknown packet kind: {found}"),
            Self::InvalidFlags { flags } => {
                write!(f, "invalid flags: 0x{flags:02X}")
            }
            Self::InvalidSequence { sequence } => {
                write!(f, "invalid delta set sequence {sequence}")
            }
            Self::PayloadLengthMismatch {
                header_len,
                actual_len,
            } => {
                write!(
                    f,
                    "payload length mismatch: header {header_len} bytes but {actual_len} available"
                )
            }
            Self::LimitsExceeded {
                kind,
                limit,
                actual,
            } => {
                write!(f, "{kind} limit exceeded: {actual} > {limit}")
            }
            Self::NonEmptyAck { count, payload_len } => {
                write!(
                    f,
                    "ack carries {count} deltas in {payload_len} payload bytes"
                )
            }
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PacketBytes => "packet bytes",
            Self::DeltaCount => "delta count",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall { needed, available } => {
                write!(f, "buffer too small: need {needed}, have {available}")
            }
            Self::LengthOverflow { length } => {
                write!(f, "payload length {length} does not fit the header field")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

impl std::error::Error for EncodeError {}
