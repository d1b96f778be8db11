//! Wire framing for dsync delta sets and acknowledgements.
//!
//! Every datagram starts with a fixed 24-byte little-endian header carrying
//! the packet kind, set flags, map identity, sequence and payload length. This
//! crate validates that header and hands the payload to the codec. It knows
//! nothing about sectors, sides or polyobjects.
//!
//! # Design Principles
//!
//! - **Stable wire format** - The format is versioned and changes are documented.
//! - **Bounded decoding** - Length and count fields are checked against limits.
//! - **No domain knowledge** - This crate handles framing, not map state.

mod error;
mod header;
mod limits;
mod packet;

pub use error::{DecodeError, EncodeError, LimitKind, WireResult};
pub use header::{PacketHeader, PacketKind, SetFlags, HEADER_SIZE, MAGIC, VERSION};
pub use limits::Limits;
pub use packet::{decode_packet, encode_header, encode_packet, WirePacket};
