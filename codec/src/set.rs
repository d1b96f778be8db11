//! Delta set serialization.
//!
//! Each delta record is bit packed and then byte aligned:
//!
//! ```text
//! kind      2 bits   (0 sector, 1 side, 2 poly)
//! mask      12/7/8 bits, one per tracked field
//! <align>
//! index     varu32
//! fields    changed fields in field order
//! ```
//!
//! Fixed-point values are zigzag varints, textures varu32, angles u32,
//! line flags u16, light/alpha one byte and colors three bytes.

use bitstream::{BitReader, BitVecWriter};
use wire::{decode_packet, encode_packet, PacketHeader, PacketKind, SetFlags};
use world::{
    Angle, ElementId, ElementKind, ElementState, FieldMask, Fixed, MapId, PolyField, PolyState,
    SectorField, SectorState, SideField, SideState, TextureId,
};

use crate::encode::full_delta;
use crate::error::{CodecError, CodecResult, LimitKind};
use crate::limits::CodecLimits;
use crate::types::Sequence;
use crate::Delta;

const KIND_BITS: u8 = 2;

/// A batch of deltas transmitted together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaSet {
    pub sequence: Sequence,
    pub flags: SetFlags,
    pub deltas: Vec<Delta>,
}

/// A delta set decoded from the wire, with the map it was stamped for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSet {
    pub map_id: MapId,
    pub set: DeltaSet,
}

/// Accumulates delta records for one set under byte and count budgets.
#[derive(Debug, Clone)]
pub struct SetEncoder {
    payload: Vec<u8>,
    count: usize,
    max_bytes: usize,
    max_deltas: usize,
}

impl SetEncoder {
    #[must_use]
    pub fn new(limits: &CodecLimits) -> Self {
        Self {
            payload: Vec::with_capacity(limits.max_set_bytes.min(2048)),
            count: 0,
            max_bytes: limits.max_set_bytes.min(u16::MAX as usize),
            max_deltas: limits.max_deltas_per_set.min(u16::MAX as usize),
        }
    }

    /// Appends `delta` if it fits.
    ///
    /// On `EncodingOverflow` the encoder is left unchanged and the delta
    /// should be deferred to another set.
    pub fn push(&mut self, delta: &Delta) -> CodecResult<()> {
        if self.count >= self.max_deltas {
            return Err(CodecError::EncodingOverflow {
                kind: LimitKind::DeltasPerSet,
                limit: self.max_deltas,
                actual: self.count + 1,
            });
        }
        let record = encode_record(delta)?;
        let needed = self.payload.len() + record.len();
        if needed > self.max_bytes {
            return Err(CodecError::EncodingOverflow {
                kind: LimitKind::SetBytes,
                limit: self.max_bytes,
                actual: needed,
            });
        }
        self.payload.extend_from_slice(&record);
        self.count += 1;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.payload.len()
    }

    /// Frames the records into a complete delta-set packet.
    pub fn finish(self, map_id: MapId, sequence: Sequence, flags: SetFlags) -> CodecResult<Vec<u8>> {
        if sequence.is_zero() {
            return Err(CodecError::Wire(wire::DecodeError::InvalidSequence { sequence: 0 }));
        }
        let count = u16::try_from(self.count).map_err(|_| CodecError::EncodingOverflow {
            kind: LimitKind::DeltasPerSet,
            limit: u16::MAX as usize,
            actual: self.count,
        })?;
        let header = PacketHeader::delta_set(map_id.get(), sequence.raw(), flags, count, 0);
        Ok(encode_packet(&header, &self.payload)?)
    }
}

/// Encodes a whole set in one go, failing if it exceeds `limits`.
pub fn encode_delta_set(
    map_id: MapId,
    set: &DeltaSet,
    limits: &CodecLimits,
) -> CodecResult<Vec<u8>> {
    let mut encoder = SetEncoder::new(limits);
    for delta in &set.deltas {
        encoder.push(delta)?;
    }
    encoder.finish(map_id, set.sequence, set.flags)
}

/// Decodes and validates a delta-set packet.
pub fn decode_delta_set(bytes: &[u8], limits: &CodecLimits) -> CodecResult<DecodedSet> {
    let packet = decode_packet(bytes, &limits.wire_limits())?;
    if packet.header.kind != PacketKind::DeltaSet {
        return Err(CodecError::UnexpectedKind {
            found: packet.header.kind,
        });
    }

    let announced = usize::from(packet.header.count);
    let mut reader = BitReader::new(packet.payload);
    let mut deltas = Vec::with_capacity(announced);
    while !reader.is_empty() {
        if deltas.len() == announced {
            return Err(CodecError::TrailingData {
                bytes: reader.bits_remaining() / 8,
            });
        }
        deltas.push(read_delta(&mut reader)?);
    }
    if deltas.len() != announced {
        return Err(CodecError::CountMismatch {
            header: packet.header.count,
            actual: deltas.len(),
        });
    }

    Ok(DecodedSet {
        map_id: MapId::from_raw(packet.header.map_id),
        set: DeltaSet {
            sequence: Sequence::new(packet.header.sequence),
            flags: packet.header.flags,
            deltas,
        },
    })
}

/// Encoded size of one delta record in bytes.
pub fn record_len(delta: &Delta) -> CodecResult<usize> {
    Ok(encode_record(delta)?.len())
}

/// Size of the largest record any single delta can encode to: every field
/// set, each at its widest varint.
///
/// A set budget smaller than this can stall a snapshot on one element.
#[must_use]
pub fn max_record_len() -> usize {
    let wide = Fixed::from_raw(i32::MIN);
    let texture = TextureId(u16::MAX);
    let worst = [
        ElementState::Sector(SectorState {
            floor_height: wide,
            ceiling_height: wide,
            light_level: u8::MAX,
            floor_texture: texture,
            ceiling_texture: texture,
            color: [u8::MAX; 3],
            floor_target: wide,
            floor_speed: wide,
            ceiling_target: wide,
            ceiling_speed: wide,
            floor_offset: [wide; 2],
            ceiling_offset: [wide; 2],
        }),
        ElementState::Side(SideState {
            top_texture: texture,
            middle_texture: texture,
            bottom_texture: texture,
            offset_x: wide,
            offset_y: wide,
            line_flags: u16::MAX,
            middle_alpha: u8::MAX,
        }),
        ElementState::Poly(PolyState {
            origin_x: wide,
            origin_y: wide,
            angle: Angle(u32::MAX),
            dest_x: wide,
            dest_y: wide,
            speed: wide,
            dest_angle: Angle(u32::MAX),
            angle_speed: Angle(u32::MAX),
        }),
    ];
    worst
        .into_iter()
        .map(|state| record_len(&full_delta(u32::MAX, state)).unwrap_or(usize::MAX))
        .max()
        .unwrap_or(0)
}

fn encode_record(delta: &Delta) -> CodecResult<Vec<u8>> {
    let mut writer = BitVecWriter::with_capacity(32);
    write_delta(&mut writer, delta)?;
    Ok(writer.finish())
}

/// Writes one delta record, leaving the writer byte aligned.
pub fn write_delta(writer: &mut BitVecWriter, delta: &Delta) -> CodecResult<()> {
    let kind = delta.kind();
    let fields = delta.fields();
    if fields.is_empty() {
        return Err(CodecError::EmptyFieldMask { id: delta.id() });
    }
    writer.write_bits(kind.tag(), KIND_BITS)?;
    writer.write_bits(u32::from(fields.bits()), kind.field_count())?;
    writer.align_to_byte();
    writer.write_varu32(delta.index())?;

    match delta {
        Delta::Sector { fields, state, .. } => write_sector(writer, *fields, state),
        Delta::Side { fields, state, .. } => write_side(writer, *fields, state),
        Delta::Poly { fields, state, .. } => write_poly(writer, *fields, state),
    }
}

/// Reads one delta record written by [`write_delta`].
///
/// Unmasked fields of the returned state hold defaults.
pub fn read_delta(reader: &mut BitReader<'_>) -> CodecResult<Delta> {
    let tag = reader.read_bits(KIND_BITS)?;
    let kind = ElementKind::from_tag(tag).ok_or(CodecError::UnknownElementKind { tag })?;
    let raw_mask = reader.read_bits(kind.field_count())?;
    reader.align_to_byte()?;
    let index = reader.read_varu32()?;

    // Mask width equals the field count, so only emptiness needs checking.
    let fields = FieldMask::from_bits(u16::try_from(raw_mask).unwrap_or(u16::MAX));
    if fields.is_empty() {
        return Err(CodecError::EmptyFieldMask {
            id: ElementId::new(kind, index),
        });
    }

    Ok(match kind {
        ElementKind::Sector => Delta::Sector {
            index,
            fields,
            state: read_sector(reader, fields)?,
        },
        ElementKind::Side => Delta::Side {
            index,
            fields,
            state: read_side(reader, fields)?,
        },
        ElementKind::Poly => Delta::Poly {
            index,
            fields,
            state: read_poly(reader, fields)?,
        },
    })
}

fn write_fixed(writer: &mut BitVecWriter, value: Fixed) -> CodecResult<()> {
    Ok(writer.write_vars32(value.raw())?)
}

fn read_fixed(reader: &mut BitReader<'_>) -> CodecResult<Fixed> {
    Ok(Fixed::from_raw(reader.read_vars32()?))
}

fn write_texture(writer: &mut BitVecWriter, texture: TextureId) -> CodecResult<()> {
    Ok(writer.write_varu32(u32::from(texture.0))?)
}

fn read_texture(reader: &mut BitReader<'_>) -> CodecResult<TextureId> {
    let raw = reader.read_varu32()?;
    let id = u16::try_from(raw).map_err(|_| bitstream::BitError::ValueOutOfRange {
        value: raw,
        bits: 16,
    })?;
    Ok(TextureId(id))
}

fn write_sector(writer: &mut BitVecWriter, fields: FieldMask, s: &SectorState) -> CodecResult<()> {
    for field in SectorField::ALL {
        if !fields.contains(field.index()) {
            continue;
        }
        match field {
            SectorField::FloorHeight => write_fixed(writer, s.floor_height)?,
            SectorField::CeilingHeight => write_fixed(writer, s.ceiling_height)?,
            SectorField::LightLevel => writer.write_u8_aligned(s.light_level)?,
            SectorField::FloorTexture => write_texture(writer, s.floor_texture)?,
            SectorField::CeilingTexture => write_texture(writer, s.ceiling_texture)?,
            SectorField::Color => {
                for channel in s.color {
                    writer.write_u8_aligned(channel)?;
                }
            }
            SectorField::FloorTarget => write_fixed(writer, s.floor_target)?,
            SectorField::FloorSpeed => write_fixed(writer, s.floor_speed)?,
            SectorField::CeilingTarget => write_fixed(writer, s.ceiling_target)?,
            SectorField::CeilingSpeed => write_fixed(writer, s.ceiling_speed)?,
            SectorField::FloorOffset => {
                write_fixed(writer, s.floor_offset[0])?;
                write_fixed(writer, s.floor_offset[1])?;
            }
            SectorField::CeilingOffset => {
                write_fixed(writer, s.ceiling_offset[0])?;
                write_fixed(writer, s.ceiling_offset[1])?;
            }
        }
    }
    Ok(())
}

fn read_sector(reader: &mut BitReader<'_>, fields: FieldMask) -> CodecResult<SectorState> {
    let mut s = SectorState::default();
    for field in SectorField::ALL {
        if !fields.contains(field.index()) {
            continue;
        }
        match field {
            SectorField::FloorHeight => s.floor_height = read_fixed(reader)?,
            SectorField::CeilingHeight => s.ceiling_height = read_fixed(reader)?,
            SectorField::LightLevel => s.light_level = reader.read_u8_aligned()?,
            SectorField::FloorTexture => s.floor_texture = read_texture(reader)?,
            SectorField::CeilingTexture => s.ceiling_texture = read_texture(reader)?,
            SectorField::Color => {
                for channel in &mut s.color {
                    *channel = reader.read_u8_aligned()?;
                }
            }
            SectorField::FloorTarget => s.floor_target = read_fixed(reader)?,
            SectorField::FloorSpeed => s.floor_speed = read_fixed(reader)?,
            SectorField::CeilingTarget => s.ceiling_target = read_fixed(reader)?,
            SectorField::CeilingSpeed => s.ceiling_speed = read_fixed(reader)?,
            SectorField::FloorOffset => {
                s.floor_offset = [read_fixed(reader)?, read_fixed(reader)?];
            }
            SectorField::CeilingOffset => {
                s.ceiling_offset = [read_fixed(reader)?, read_fixed(reader)?];
            }
        }
    }
    Ok(s)
}

fn write_side(writer: &mut BitVecWriter, fields: FieldMask, s: &SideState) -> CodecResult<()> {
    for field in SideField::ALL {
        if !fields.contains(field.index()) {
            continue;
        }
        match field {
            SideField::TopTexture => write_texture(writer, s.top_texture)?,
            SideField::MiddleTexture => write_texture(writer, s.middle_texture)?,
            SideField::BottomTexture => write_texture(writer, s.bottom_texture)?,
            SideField::OffsetX => write_fixed(writer, s.offset_x)?,
            SideField::OffsetY => write_fixed(writer, s.offset_y)?,
            SideField::LineFlags => writer.write_u16_aligned(s.line_flags)?,
            SideField::MiddleAlpha => writer.write_u8_aligned(s.middle_alpha)?,
        }
    }
    Ok(())
}

fn read_side(reader: &mut BitReader<'_>, fields: FieldMask) -> CodecResult<SideState> {
    let mut s = SideState::default();
    for field in SideField::ALL {
        if !fields.contains(field.index()) {
            continue;
        }
        match field {
            SideField::TopTexture => s.top_texture = read_texture(reader)?,
            SideField::MiddleTexture => s.middle_texture = read_texture(reader)?,
            SideField::BottomTexture => s.bottom_texture = read_texture(reader)?,
            SideField::OffsetX => s.offset_x = read_fixed(reader)?,
            SideField::OffsetY => s.offset_y = read_fixed(reader)?,
            SideField::LineFlags => s.line_flags = reader.read_u16_aligned()?,
            SideField::MiddleAlpha => s.middle_alpha = reader.read_u8_aligned()?,
        }
    }
    Ok(s)
}

fn write_poly(writer: &mut BitVecWriter, fields: FieldMask, p: &PolyState) -> CodecResult<()> {
    for field in PolyField::ALL {
        if !fields.contains(field.index()) {
            continue;
        }
        match field {
            PolyField::OriginX => write_fixed(writer, p.origin_x)?,
            PolyField::OriginY => write_fixed(writer, p.origin_y)?,
            PolyField::Angle => writer.write_u32_aligned(p.angle.raw())?,
            PolyField::DestX => write_fixed(writer, p.dest_x)?,
            PolyField::DestY => write_fixed(writer, p.dest_y)?,
            PolyField::Speed => write_fixed(writer, p.speed)?,
            PolyField::DestAngle => writer.write_u32_aligned(p.dest_angle.raw())?,
            PolyField::AngleSpeed => writer.write_u32_aligned(p.angle_speed.raw())?,
        }
    }
    Ok(())
}

fn read_poly(reader: &mut BitReader<'_>, fields: FieldMask) -> CodecResult<PolyState> {
    let mut p = PolyState::default();
    for field in PolyField::ALL {
        if !fields.contains(field.index()) {
            continue;
        }
        match field {
            PolyField::OriginX => p.origin_x = read_fixed(reader)?,
            PolyField::OriginY => p.origin_y = read_fixed(reader)?,
            PolyField::Angle => p.angle = Angle(reader.read_u32_aligned()?),
            PolyField::DestX => p.dest_x = read_fixed(reader)?,
            PolyField::DestY => p.dest_y = read_fixed(reader)?,
            PolyField::Speed => p.speed = read_fixed(reader)?,
            PolyField::DestAngle => p.dest_angle = Angle(reader.read_u32_aligned()?),
            PolyField::AngleSpeed => p.angle_speed = Angle(reader.read_u32_aligned()?),
        }
    }
    Ok(p)
}
