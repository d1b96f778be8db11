//! Cumulative acknowledgements.

use wire::{decode_packet, encode_packet, PacketHeader, PacketKind};
use world::MapId;

use crate::error::{CodecError, CodecResult};
use crate::limits::CodecLimits;
use crate::types::Sequence;

/// A decoded acknowledgement.
///
/// `sequence` is the highest set the client has applied in order; it
/// acknowledges every set up to and including it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub map_id: MapId,
    pub sequence: Sequence,
}

/// Encodes an ack packet.
pub fn encode_ack(map_id: MapId, sequence: Sequence) -> CodecResult<Vec<u8>> {
    let header = PacketHeader::ack(map_id.get(), sequence.raw());
    Ok(encode_packet(&header, &[])?)
}

/// Decodes an ack packet.
pub fn decode_ack(bytes: &[u8], limits: &CodecLimits) -> CodecResult<Ack> {
    let packet = decode_packet(bytes, &limits.wire_limits())?;
    if packet.header.kind != PacketKind::Ack {
        return Err(CodecError::UnexpectedKind {
            found: packet.header.kind,
        });
    }
    Ok(Ack {
        map_id: MapId::from_raw(packet.header.map_id),
        sequence: Sequence::new(packet.header.sequence),
    })
}
