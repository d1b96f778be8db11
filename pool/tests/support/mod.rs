//! Server and client wired back to back.

#![allow(dead_code)]

use codec::{decode_delta_set, ClientReceiver, DecodedSet, Tick};
use pool::{ClientId, DeltaServer, PoolConfig, TickReport};
use world::{MapId, MapState, WorldView};

pub const MAP: MapId = MapId::from_raw(0x00D0_0D5E);
pub const CLIENT: ClientId = ClientId(1);

pub struct Loopback {
    pub server: DeltaServer,
    pub world: MapState,
    pub receiver: ClientReceiver,
    pub mirror: MapState,
    pub now: u32,
}

impl Loopback {
    pub fn new(world: MapState, config: PoolConfig) -> Self {
        let limits = config.limits.clone();
        let mirror = MapState::new(world.counts());
        let mut server = DeltaServer::new(MAP, config).expect("valid pool config");
        let stamp = server.on_client_joined(CLIENT, &world);
        Self {
            server,
            world,
            receiver: ClientReceiver::new(stamp, limits),
            mirror,
            now: 0,
        }
    }

    /// Runs one server tick and returns what it sent.
    pub fn tick(&mut self) -> (TickReport, Vec<Vec<u8>>) {
        let mut sent: Vec<(ClientId, Vec<u8>)> = Vec::new();
        let report = self.server.tick(Tick::new(self.now), &self.world, &mut sent);
        self.now += 1;
        let datagrams = sent
            .into_iter()
            .map(|(client, bytes)| {
                assert_eq!(client, CLIENT);
                bytes
            })
            .collect();
        (report, datagrams)
    }

    /// Feeds one datagram to the client and returns its ack.
    pub fn deliver(&mut self, bytes: &[u8]) -> Option<Vec<u8>> {
        self.receiver
            .receive(&mut self.mirror, bytes)
            .expect("server packets decode")
            .ack
    }

    pub fn ack(&mut self, ack: &[u8]) {
        let _ = self.server.handle_packet(CLIENT, ack);
    }

    /// Delivers every datagram and every ack.
    pub fn round_trip(&mut self) -> TickReport {
        let (report, datagrams) = self.tick();
        for bytes in datagrams {
            if let Some(ack) = self.deliver(&bytes) {
                self.ack(&ack);
            }
        }
        report
    }

    /// Leaves and joins again with the current world, resetting the client.
    pub fn rejoin(&mut self) {
        assert!(self.server.on_client_left(CLIENT));
        let stamp = self.server.on_client_joined(CLIENT, &self.world);
        self.receiver.reset(stamp);
        self.mirror = MapState::new(self.world.counts());
    }

    pub fn decode(&self, bytes: &[u8]) -> DecodedSet {
        decode_delta_set(bytes, &self.server.config().limits).expect("valid delta set")
    }
}
