#![no_main]

use codec::{encode_delta_set, initial_snapshot_set, CodecLimits, Sequence, Tick};
use libfuzzer_sys::fuzz_target;
use pool::{ClientId, DeltaServer, PoolConfig};
use world::{ElementCounts, MapId, MapState};

fuzz_target!(|data: &[u8]| {
    let map = MapState::new(ElementCounts::new(4, 2, 1));
    let map_id = MapId::from_raw(1);
    let Ok(mut server) = DeltaServer::new(map_id, PoolConfig::for_testing()) else {
        return;
    };
    let stamp = server.on_client_joined(ClientId(1), &map);
    let mut sent: Vec<(ClientId, Vec<u8>)> = Vec::new();
    server.tick(Tick::new(0), &map, &mut sent);

    let _ = wire::decode_packet(data, &wire::Limits::for_testing());
    let _ = codec::decode_ack(data, &CodecLimits::for_testing());
    let _ = server.handle_packet(ClientId(1), data);
    let _ = server.handle_packet(ClientId(2), data);
    server.tick(Tick::new(1), &map, &mut sent);

    let set = initial_snapshot_set(&map, Sequence::FIRST);
    let _ = encode_delta_set(stamp, &set, &CodecLimits::for_testing());
});
