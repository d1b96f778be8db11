//! Packet decoding and encoding.

use crate::error::{DecodeError, EncodeError, LimitKind, WireResult};
use crate::header::{PacketHeader, PacketKind, SetFlags, HEADER_SIZE, MAGIC, VERSION};
use crate::limits::Limits;

/// A decoded wire packet: validated header plus the raw delta payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WirePacket<'a> {
    pub header: PacketHeader,
    pub payload: &'a [u8],
}

/// Decodes and validates a packet header, returning the payload slice.
///
/// The payload itself is opaque here; the codec crate parses the delta
/// records it contains.
pub fn decode_packet<'a>(buf: &'a [u8], limits: &Limits) -> WireResult<WirePacket<'a>> {
    if buf.len() < HEADER_SIZE {
        return Err(DecodeError::PacketTooSmall {
            actual: buf.len(),
            required: HEADER_SIZE,
        });
    }
    if buf.len() > limits.max_packet_bytes {
        return Err(DecodeError::LimitsExceeded {
            kind: LimitKind::PacketBytes,
            limit: limits.max_packet_bytes,
            actual: buf.len(),
        });
    }

    let magic = read_u32(buf, 0);
    if magic != MAGIC {
        return Err(DecodeError::InvalidMagic { found: magic });
    }

    let version = read_u16(buf, 4);
    if version != VERSION {
        return Err(DecodeError::UnsupportedVersion { found: version });
    }

    let kind = PacketKind::from_raw(buf[6]).ok_or(DecodeError::UnknownKind { found: buf[6] })?;

    let flags_raw = buf[7];
    let flags = SetFlags::from_raw(flags_raw);
    let flags_ok = match kind {
        PacketKind::DeltaSet => flags.is_valid(),
        PacketKind::Ack => flags_raw == 0,
    };
    if !flags_ok {
        return Err(DecodeError::InvalidFlags { flags: flags_raw });
    }

    let map_id = read_u64(buf, 8);
    let sequence = read_u32(buf, 16);
    let count = read_u16(buf, 20);
    let payload_len = read_u16(buf, 22);

    match kind {
        PacketKind::DeltaSet => {
            if sequence == 0 {
                return Err(DecodeError::InvalidSequence { sequence });
            }
            if usize::from(count) > limits.max_deltas_per_set {
                return Err(DecodeError::LimitsExceeded {
                    kind: LimitKind::DeltaCount,
                    limit: limits.max_deltas_per_set,
                    actual: usize::from(count),
                });
            }
        }
        // Ack 0 is legal: it tells the server nothing has been applied yet.
        PacketKind::Ack => {
            if count != 0 || payload_len != 0 {
                return Err(DecodeError::NonEmptyAck { count, payload_len });
            }
        }
    }

    let actual_payload_len = buf.len() - HEADER_SIZE;
    if usize::from(payload_len) != actual_payload_len {
        return Err(DecodeError::PayloadLengthMismatch {
            header_len: payload_len,
            actual_len: actual_payload_len,
        });
    }

    let header = PacketHeader {
        version,
        kind,
        flags,
        map_id,
        sequence,
        count,
        payload_len,
    };

    Ok(WirePacket {
        header,
        payload: &buf[HEADER_SIZE..],
    })
}

/// Encodes a packet header into the provided output buffer.
pub fn encode_header(header: &PacketHeader, out: &mut [u8]) -> Result<usize, EncodeError> {
    if out.len() < HEADER_SIZE {
        return Err(EncodeError::BufferTooSmall {
            needed: HEADER_SIZE,
            available: out.len(),
        });
    }

    out[0..4].copy_from_slice(&MAGIC.to_le_bytes());
    out[4..6].copy_from_slice(&header.version.to_le_bytes());
    out[6] = header.kind as u8;
    out[7] = header.flags.raw();
    out[8..16].copy_from_slice(&header.map_id.to_le_bytes());
    out[16..20].copy_from_slice(&header.sequence.to_le_bytes());
    out[20..22].copy_from_slice(&header.count.to_le_bytes());
    out[22..24].copy_from_slice(&header.payload_len.to_le_bytes());

    Ok(HEADER_SIZE)
}

/// Builds a complete packet from a header and payload.
///
/// `header.payload_len` is overwritten with the actual payload length.
pub fn encode_packet(header: &PacketHeader, payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let payload_len = u16::try_from(payload.len()).map_err(|_| EncodeError::LengthOverflow {
        length: payload.len(),
    })?;
    let header = PacketHeader {
        payload_len,
        ..*header
    };
    let mut buf = vec![0u8; HEADER_SIZE + payload.len()];
    encode_header(&header, &mut buf)?;
    buf[HEADER_SIZE..].copy_from_slice(payload);
    Ok(buf)
}

fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_header(kind: u8, flags: u8, sequence: u32) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        buf[4..6].copy_from_slice(&VERSION.to_le_bytes());
        buf[6] = kind;
        buf[7] = flags;
        buf[16..20].copy_from_slice(&sequence.to_le_bytes());
        buf
    }

    #[test]
    fn encode_header_roundtrip_empty_payload() {
        let header = PacketHeader::delta_set(0xABCD, 42, SetFlags::incremental(), 0, 0);
        let mut buf = [0u8; HEADER_SIZE];
        let written = encode_header(&header, &mut buf).unwrap();
        assert_eq!(written, HEADER_SIZE);

        let packet = decode_packet(&buf, &Limits::for_testing()).unwrap();
        assert_eq!(packet.header, header);
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn encode_packet_fills_payload_len() {
        let header = PacketHeader::delta_set(1, 5, SetFlags::snapshot(true), 2, 0);
        let buf = encode_packet(&header, &[9, 8, 7]).unwrap();
        let packet = decode_packet(&buf, &Limits::for_testing()).unwrap();
        assert_eq!(packet.header.payload_len, 3);
        assert_eq!(packet.payload, &[9, 8, 7]);
        assert!(packet.header.flags.is_snapshot_end());
    }

    #[test]
    fn encode_header_buffer_too_small() {
        let header = PacketHeader::ack(0, 0);
        let mut buf = [0u8; 8];
        assert_eq!(
            encode_header(&header, &mut buf).unwrap_err(),
            EncodeError::BufferTooSmall {
                needed: HEADER_SIZE,
                available: 8
            }
        );
    }

    #[test]
    fn encode_packet_rejects_oversized_payload() {
        let header = PacketHeader::delta_set(0, 1, SetFlags::incremental(), 0, 0);
        let payload = vec![0u8; usize::from(u16::MAX) + 1];
        assert!(matches!(
            encode_packet(&header, &payload),
            Err(EncodeError::LengthOverflow { .. })
        ));
    }

    #[test]
    fn decode_rejects_short_buffer() {
        let err = decode_packet(&[0u8; 10], &Limits::for_testing()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::PacketTooSmall {
                actual: 10,
                required: HEADER_SIZE
            }
        );
    }

    #[test]
    fn decode_rejects_invalid_magic() {
        let mut buf = raw_header(1, 0, 1);
        buf[0..4].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        let err = decode_packet(&buf, &Limits::for_testing()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidMagic { .. }));
    }

    #[test]
    fn decode_rejects_unsupported_version() {
        let mut buf = raw_header(1, 0, 1);
        buf[4..6].copy_from_slice(&0u16.to_le_bytes());
        let err = decode_packet(&buf, &Limits::for_testing()).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedVersion { found: 0 }));
    }

    #[test]
    fn decode_rejects_unknown_kind() {
        let buf = raw_header(9, 0, 1);
        let err = decode_packet(&buf, &Limits::for_testing()).unwrap_err();
        assert_eq!(err, DecodeError::UnknownKind { found: 9 });
    }

    #[test]
    fn decode_rejects_reserved_flag_bits() {
        let buf = raw_header(1, 0b100, 1);
        let err = decode_packet(&buf, &Limits::for_testing()).unwrap_err();
        assert_eq!(err, DecodeError::InvalidFlags { flags: 0b100 });
    }

    #[test]
    fn decode_rejects_flagged_ack() {
        let buf = raw_header(2, SetFlags::SNAPSHOT, 3);
        let err = decode_packet(&buf, &Limits::for_testing()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFlags { .. }));
    }

    #[test]
    fn decode_rejects_sequence_zero_set() {
        let buf = raw_header(1, 0, 0);
        let err = decode_packet(&buf, &Limits::for_testing()).unwrap_err();
        assert_eq!(err, DecodeError::InvalidSequence { sequence: 0 });
    }

    #[test]
    fn decode_accepts_ack_zero() {
        let buf = encode_packet(&PacketHeader::ack(77, 0), &[]).unwrap();
        let packet = decode_packet(&buf, &Limits::for_testing()).unwrap();
        assert_eq!(packet.header.kind, PacketKind::Ack);
        assert_eq!(packet.header.sequence, 0);
        assert_eq!(packet.header.map_id, 77);
    }

    #[test]
    fn decode_rejects_ack_with_payload() {
        let header = PacketHeader {
            count: 1,
            ..PacketHeader::ack(0, 4)
        };
        let buf = encode_packet(&header, &[0]).unwrap();
        let err = decode_packet(&buf, &Limits::for_testing()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::NonEmptyAck {
                count: 1,
                payload_len: 1
            }
        );
    }

    #[test]
    fn decode_payload_length_mismatch() {
        let header = PacketHeader::delta_set(0, 1, SetFlags::incremental(), 1, 10);
        let mut buf = [0u8; HEADER_SIZE];
        encode_header(&header, &mut buf).unwrap();
        let err = decode_packet(&buf, &Limits::for_testing()).unwrap_err();
        assert!(matches!(err, DecodeError::PayloadLengthMismatch { .. }));
    }

    #[test]
    fn decode_payload_length_mismatch_with_extra_bytes() {
        let header = PacketHeader::delta_set(0, 1, SetFlags::incremental(), 0, 0);
        let mut buf = vec![0u8; HEADER_SIZE + 4];
        encode_header(&header, &mut buf).unwrap();
        let err = decode_packet(&buf, &Limits::for_testing()).unwrap_err();
        assert!(matches!(err, DecodeError::PayloadLengthMismatch { .. }));
    }

    #[test]
    fn decode_enforces_packet_bytes_limit() {
        let header = PacketHeader::delta_set(0, 1, SetFlags::incremental(), 1, 0);
        let buf = encode_packet(&header, &[0u8; 600]).unwrap();
        let err = decode_packet(&buf, &Limits::for_testing()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::LimitsExceeded {
                kind: LimitKind::PacketBytes,
                limit: 512,
                ..
            }
        ));
    }

    #[test]
    fn decode_enforces_delta_count_limit() {
        let header = PacketHeader::delta_set(0, 1, SetFlags::incremental(), 65, 0);
        let buf = encode_packet(&header, &[]).unwrap();
        let err = decode_packet(&buf, &Limits::for_testing()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::LimitsExceeded {
                kind: LimitKind::DeltaCount,
                limit: 64,
                actual: 65
            }
        ));
    }
}
