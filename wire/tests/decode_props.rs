use proptest::prelude::*;
use wire::{decode_packet, encode_packet, Limits, PacketHeader, PacketKind, SetFlags};

proptest! {
    #[test]
    fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
        let _ = decode_packet(&bytes, &Limits::for_testing());
    }

    #[test]
    fn valid_set_headers_survive(
        map_id in any::<u64>(),
        sequence in 1u32..,
        snapshot in any::<bool>(),
        last in any::<bool>(),
        count in 0u16..64,
        payload in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let flags = if snapshot { SetFlags::snapshot(last) } else { SetFlags::incremental() };
        let header = PacketHeader::delta_set(map_id, sequence, flags, count, 0);
        let buf = encode_packet(&header, &payload).unwrap();
        let packet = decode_packet(&buf, &Limits::for_testing()).unwrap();
        prop_assert_eq!(packet.header.kind, PacketKind::DeltaSet);
        prop_assert_eq!(packet.header.map_id, map_id);
        prop_assert_eq!(packet.header.sequence, sequence);
        prop_assert_eq!(packet.header.flags, flags);
        prop_assert_eq!(packet.payload, &payload[..]);
    }
}
