#![no_main]

use codec::{ClientReceiver, CodecLimits};
use libfuzzer_sys::fuzz_target;
use world::{ElementCounts, MapId, MapState};

fuzz_target!(|data: &[u8]| {
    let limits = CodecLimits::for_testing();
    let mut mirror = MapState::new(ElementCounts::new(8, 8, 2));

    if let Ok(decoded) = codec::decode_delta_set(data, &limits) {
        let _ = codec::apply_delta_set(&mut mirror, &decoded.set);
        let mut receiver = ClientReceiver::new(decoded.map_id, limits.clone());
        let _ = receiver.accept(&mut mirror, decoded);
    }

    // Split the input into frames and feed them through one receive window.
    let mut receiver = ClientReceiver::new(MapId::from_raw(0), limits);
    let mut idx = 0usize;
    while idx < data.len() && idx < 4096 {
        let len = (data[idx] as usize % 200).saturating_add(1);
        idx += 1;
        let end = (idx + len).min(data.len());
        let _ = receiver.receive(&mut mirror, &data[idx..end]);
        idx = end;
    }
});
