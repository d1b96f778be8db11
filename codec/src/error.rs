//! Error types for codec operations.

use std::fmt;

use world::{ElementCounts, ElementId};

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding or decoding delta sets and acks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Wire framing error.
    Wire(wire::DecodeError),

    /// Packet assembly error.
    Encode(wire::EncodeError),

    /// Bitstream error.
    Bitstream(bitstream::BitError),

    /// Adding a delta would exceed a set budget. The delta was not added.
    EncodingOverflow {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// Packet kind is not the one expected here.
    UnexpectedKind { found: wire::PacketKind },

    /// Element kind tag outside the known kinds.
    UnknownElementKind { tag: u32 },

    /// A delta record with no changed fields.
    EmptyFieldMask { id: ElementId },

    /// Header count disagrees with the records in the payload.
    CountMismatch { header: u16, actual: usize },

    /// Bytes left over after the announced records.
    TrailingData { bytes: usize },

    /// The sequence space of a pool is exhausted.
    SequenceExhausted,
}

/// Set budget that was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    SetBytes,
    DeltasPerSet,
}

/// Rejection of a single delta by the client applier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyError {
    /// The delta targets an element the current map does not have.
    InvalidReference { id: ElementId, counts: ElementCounts },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wire(e) => write!(f, "wire error: {e}"),
            Self::Encode(e) => write!(f, "packet encode error: {e}"),
            Self::Bitstream(e) => write!(f, "bitstream error: {e}"),
            Self::EncodingOverflow {
                kind,
                limit,
                actual,
            } => {
                write!(f, "delta set {kind} budget exceeded: {actual} > {limit}")
            }
            Self::UnexpectedKind { found } => write!(f, "unexpected packet kind {found:?}"),
            Self::UnknownElementKind { tag } => write!(f, "unknown element kind tag {tag}"),
            Self::EmptyFieldMask { id } => write!(f, "delta for {id} has no changed fields"),
            Self::CountMismatch { header, actual } => {
                write!(f, "header announces {header} deltas, payload holds {actual}")
            }
            Self::TrailingData { bytes } => write!(f, "{bytes} trailing bytes after deltas"),
            Self::SequenceExhausted => write!(f, "delta set sequence space exhausted"),
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SetBytes => "byte",
            Self::DeltasPerSet => "delta count",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidReference { id, counts } => write!(
                f,
                "delta targets {id} but the map has {} {}s",
                counts.count(id.kind),
                id.kind
            ),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Wire(e) => Some(e),
            Self::Encode(e) => Some(e),
            Self::Bitstream(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ApplyError {}

impl From<wire::DecodeError> for CodecError {
    fn from(err: wire::DecodeError) -> Self {
        Self::Wire(err)
    }
}

impl From<wire::EncodeError> for CodecError {
    fn from(err: wire::EncodeError) -> Self {
        Self::Encode(err)
    }
}

impl From<bitstream::BitError> for CodecError {
    fn from(err: bitstream::BitError) -> Self {
        Self::Bitstream(err)
    }
}
