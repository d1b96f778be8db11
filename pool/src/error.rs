//! Error types for pool operations.

use std::fmt;

use codec::{CodecError, Sequence};
use world::MapId;

use crate::ClientId;

/// Result type for packets handled by the server.
pub type PoolResult<T> = Result<T, PacketError>;

/// An acknowledgement that retires nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckError {
    /// Already retired by an earlier ack, or never issued.
    Stale {
        sequence: Sequence,
        highest_acked: Sequence,
        highest_issued: Sequence,
    },
}

/// Reasons an inbound packet was ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// The packet is not a well-formed ack.
    Decode(CodecError),

    /// No pool exists for the sender.
    UnknownClient { client: ClientId },

    /// The ack was stamped for a previous map, or for an earlier session
    /// of the same client.
    ForeignMap { expected: MapId, found: MapId },

    /// The ack retired nothing.
    Ack(AckError),
}

impl fmt::Display for AckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stale {
                sequence,
                highest_acked,
                highest_issued,
            } => write!(
                f,
                "stale acknowledgement {sequence} (acked {highest_acked}, issued {highest_issued})"
            ),
        }
    }
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(e) => write!(f, "malformed ack: {e}"),
            Self::UnknownClient { client } => write!(f, "no pool for {client}"),
            Self::ForeignMap { expected, found } => {
                write!(f, "ack stamped {found}, pool expects {expected}")
            }
            Self::Ack(e) => write!(f, "{e}"),
        }
    }
}

/// A [`PoolConfig`](crate::PoolConfig) no pool could make progress with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A budget that must allow at least one item is zero.
    ZeroBudget { name: &'static str },

    /// `max_set_bytes` cannot hold the widest single delta record, so a
    /// snapshot could stall on one element.
    SetTooSmall { max_set_bytes: usize, required: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroBudget { name } => write!(f, "{name} must be at least 1"),
            Self::SetTooSmall {
                max_set_bytes,
                required,
            } => write!(
                f,
                "max_set_bytes {max_set_bytes} cannot hold a {required}-byte delta record"
            ),
        }
    }
}

impl std::error::Error for AckError {}

impl std::error::Error for ConfigError {}

impl std::error::Error for PacketError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(e) => Some(e),
            Self::Ack(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CodecError> for PacketError {
    fn from(err: CodecError) -> Self {
        Self::Decode(err)
    }
}

impl From<AckError> for PacketError {
    fn from(err: AckError) -> Self {
        Self::Ack(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_ack_display() {
        let err = AckError::Stale {
            sequence: Sequence::new(3),
            highest_acked: Sequence::new(4),
            highest_issued: Sequence::new(6),
        };
        assert_eq!(
            err.to_string(),
            "stale acknowledgement #3 (acked #4, issued #6)"
        );
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::SetTooSmall {
            max_set_bytes: 40,
            required: 67,
        };
        assert_eq!(
            err.to_string(),
            "max_set_bytes 40 cannot hold a 67-byte delta record"
        );
    }

    #[test]
    fn packet_error_sources() {
        use std::error::Error;
        let err = PacketError::from(AckError::Stale {
            sequence: Sequence::ZERO,
            highest_acked: Sequence::ZERO,
            highest_issued: Sequence::ZERO,
        });
        assert!(err.source().is_some());
        assert!(PacketError::UnknownClient { client: ClientId(1) }
            .source()
            .is_none());
    }
}
