//! Inspection and decoding tools for dsync packets.
//!
//! This crate explains captured packets:
//!
//! - Decode and print the packet header
//! - Break a delta set down by element, changed field and record size
//! - Dump the decoded deltas as JSON

use std::fmt::Write as _;

use codec::{
    decode_ack, decode_delta_set, record_len, CodecError, CodecLimits, Delta, DeltaSet,
};
use serde::Serialize;
use wire::{decode_packet, PacketHeader, PacketKind};
use world::{ElementKind, FieldMask, MapId, PolyField, SectorField, SideField};

/// Header fields in a printable form.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HeaderReport {
    pub version: u16,
    pub kind: &'static str,
    pub flags: u8,
    pub snapshot: bool,
    pub snapshot_end: bool,
    pub map_id: String,
    pub sequence: u32,
    pub count: u16,
    pub payload_len: u16,
}

impl HeaderReport {
    fn from_header(header: &PacketHeader) -> Self {
        Self {
            version: header.version,
            kind: match header.kind {
                PacketKind::DeltaSet => "delta_set",
                PacketKind::Ack => "ack",
            },
            flags: header.flags.raw(),
            snapshot: header.flags.is_snapshot(),
            snapshot_end: header.flags.is_snapshot_end(),
            map_id: MapId::from_raw(header.map_id).to_string(),
            sequence: header.sequence,
            count: header.count,
            payload_len: header.payload_len,
        }
    }
}

/// One delta record.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeltaSummary {
    pub element: String,
    pub fields: Vec<&'static str>,
    pub record_bytes: usize,
}

/// Per-kind totals within one set.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct KindTotal {
    pub kind: &'static str,
    pub deltas: usize,
    pub bytes: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InspectReport {
    pub header: HeaderReport,
    pub packet_bytes: usize,
    pub deltas: Vec<DeltaSummary>,
    pub totals: Vec<KindTotal>,
}

/// Full decode of a packet.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DecodeOutput {
    pub header: HeaderReport,
    pub deltas: Vec<Delta>,
}

/// Names of the fields set in `mask`, in wire order.
#[must_use]
pub fn field_names(kind: ElementKind, mask: FieldMask) -> Vec<&'static str> {
    let names: &[(u8, &'static str)] = match kind {
        ElementKind::Sector => &SECTOR_FIELDS,
        ElementKind::Side => &SIDE_FIELDS,
        ElementKind::Poly => &POLY_FIELDS,
    };
    names
        .iter()
        .filter(|(index, _)| mask.contains(*index))
        .map(|(_, name)| *name)
        .collect()
}

const SECTOR_FIELDS: [(u8, &str); 12] = [
    (SectorField::FloorHeight.index(), "floor_height"),
    (SectorField::CeilingHeight.index(), "ceiling_height"),
    (SectorField::LightLevel.index(), "light_level"),
    (SectorField::FloorTexture.index(), "floor_texture"),
    (SectorField::CeilingTexture.index(), "ceiling_texture"),
    (SectorField::Color.index(), "color"),
    (SectorField::FloorTarget.index(), "floor_target"),
    (SectorField::FloorSpeed.index(), "floor_speed"),
    (SectorField::CeilingTarget.index(), "ceiling_target"),
    (SectorField::CeilingSpeed.index(), "ceiling_speed"),
    (SectorField::FloorOffset.index(), "floor_offset"),
    (SectorField::CeilingOffset.index(), "ceiling_offset"),
];

const SIDE_FIELDS: [(u8, &str); 7] = [
    (SideField::TopTexture.index(), "top_texture"),
    (SideField::MiddleTexture.index(), "middle_texture"),
    (SideField::BottomTexture.index(), "bottom_texture"),
    (SideField::OffsetX.index(), "offset_x"),
    (SideField::OffsetY.index(), "offset_y"),
    (SideField::LineFlags.index(), "line_flags"),
    (SideField::MiddleAlpha.index(), "middle_alpha"),
];

const POLY_FIELDS: [(u8, &str); 8] = [
    (PolyField::OriginX.index(), "origin_x"),
    (PolyField::OriginY.index(), "origin_y"),
    (PolyField::Angle.index(), "angle"),
    (PolyField::DestX.index(), "dest_x"),
    (PolyField::DestY.index(), "dest_y"),
    (PolyField::Speed.index(), "speed"),
    (PolyField::DestAngle.index(), "dest_angle"),
    (PolyField::AngleSpeed.index(), "angle_speed"),
];

/// Decodes a delta set or ack packet into a structural report.
pub fn inspect_packet(bytes: &[u8], limits: &CodecLimits) -> Result<InspectReport, CodecError> {
    let (header, set) = decode_any(bytes, limits)?;
    let mut deltas = Vec::new();
    let mut totals: Vec<KindTotal> = ElementKind::ALL
        .iter()
        .map(|kind| KindTotal {
            kind: kind.name(),
            deltas: 0,
            bytes: 0,
        })
        .collect();
    if let Some(set) = &set {
        for delta in &set.deltas {
            let record_bytes = record_len(delta)?;
            let total = &mut totals[delta.kind().tag() as usize];
            total.deltas += 1;
            total.bytes += record_bytes;
            deltas.push(DeltaSummary {
                element: delta.id().to_string(),
                fields: field_names(delta.kind(), delta.fields()),
                record_bytes,
            });
        }
    }
    Ok(InspectReport {
        header: HeaderReport::from_header(&header),
        packet_bytes: bytes.len(),
        deltas,
        totals,
    })
}

/// Decodes a delta set or ack packet including every field value.
pub fn decode_packet_json(bytes: &[u8], limits: &CodecLimits) -> Result<DecodeOutput, CodecError> {
    let (header, set) = decode_any(bytes, limits)?;
    Ok(DecodeOutput {
        header: HeaderReport::from_header(&header),
        deltas: set.map(|set| set.deltas).unwrap_or_default(),
    })
}

fn decode_any(
    bytes: &[u8],
    limits: &CodecLimits,
) -> Result<(PacketHeader, Option<DeltaSet>), CodecError> {
    let header = decode_packet(bytes, &limits.wire_limits())?.header;
    match header.kind {
        PacketKind::DeltaSet => Ok((header, Some(decode_delta_set(bytes, limits)?.set))),
        PacketKind::Ack => {
            decode_ack(bytes, limits)?;
            Ok((header, None))
        }
    }
}

/// Human-readable rendering of [`DecodeOutput`].
#[must_use]
pub fn format_decode_pretty(output: &DecodeOutput) -> String {
    let header = &output.header;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} map {} ({} deltas, {} payload bytes){}",
        header.kind,
        header.sequence,
        header.map_id,
        header.count,
        header.payload_len,
        match (header.snapshot, header.snapshot_end) {
            (true, true) => " [snapshot end]",
            (true, false) => " [snapshot]",
            _ => "",
        }
    );
    for delta in &output.deltas {
        let names = field_names(delta.kind(), delta.fields());
        let _ = writeln!(out, "  {}: {}", delta.id(), names.join(", "));
        let _ = writeln!(out, "    {:?}", delta.state());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec::{encode_ack, encode_delta_set, Sequence, SetFlags};
    use world::{ElementState, Fixed, SectorState, SideState};

    const MAP: MapId = MapId::from_raw(0x1234_5678_9ABC_DEF0);

    fn sample_set() -> Vec<u8> {
        let sector = SectorState {
            floor_height: Fixed::from_int(24),
            light_level: 200,
            ..SectorState::default()
        };
        let side = SideState {
            offset_x: Fixed::from_int(-8),
            ..SideState::default()
        };
        let mut floor_and_light = FieldMask::from(SectorField::FloorHeight);
        floor_and_light |= FieldMask::from(SectorField::LightLevel);
        let set = DeltaSet {
            sequence: Sequence::new(12),
            flags: SetFlags::incremental(),
            deltas: vec![
                Delta::new(3, floor_and_light, ElementState::Sector(sector)).unwrap(),
                Delta::new(40, SideField::OffsetX.into(), ElementState::Side(side)).unwrap(),
            ],
        };
        encode_delta_set(MAP, &set, &CodecLimits::default()).unwrap()
    }

    #[test]
    fn inspect_breaks_down_a_delta_set() {
        let bytes = sample_set();
        let report = inspect_packet(&bytes, &CodecLimits::default()).unwrap();
        assert_eq!(report.header.kind, "delta_set");
        assert_eq!(report.header.sequence, 12);
        assert_eq!(report.header.map_id, "123456789abcdef0");
        assert_eq!(report.packet_bytes, bytes.len());
        assert_eq!(report.deltas.len(), 2);
        assert_eq!(report.deltas[0].element, "sector#3");
        assert_eq!(report.deltas[0].fields, vec!["floor_height", "light_level"]);
        assert_eq!(report.deltas[1].fields, vec!["offset_x"]);
        let record_total: usize = report.totals.iter().map(|total| total.bytes).sum();
        assert_eq!(record_total, usize::from(report.header.payload_len));
        assert_eq!(report.totals[2].deltas, 0);
    }

    #[test]
    fn inspect_accepts_acks() {
        let bytes = encode_ack(MAP, Sequence::new(7)).unwrap();
        let report = inspect_packet(&bytes, &CodecLimits::default()).unwrap();
        assert_eq!(report.header.kind, "ack");
        assert_eq!(report.header.sequence, 7);
        assert!(report.deltas.is_empty());
    }

    #[test]
    fn decode_output_serializes() {
        let output = decode_packet_json(&sample_set(), &CodecLimits::default()).unwrap();
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["header"]["count"], 2);
        assert_eq!(json["deltas"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn pretty_output_names_fields() {
        let output = decode_packet_json(&sample_set(), &CodecLimits::default()).unwrap();
        let pretty = format_decode_pretty(&output);
        assert!(pretty.starts_with("delta_set 12 map 123456789abcdef0"));
        assert!(pretty.contains("sector#3: floor_height, light_level"));
        assert!(pretty.contains("side#40: offset_x"));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(inspect_packet(&[0u8; 3], &CodecLimits::default()).is_err());
    }
}
