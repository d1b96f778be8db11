//! Map-scoped registry of client pools and the transport boundary.

use std::collections::BTreeMap;

use codec::{decode_ack, Sequence, Tick};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, info, warn};
use world::{ElementId, MapId, Point, WorldView};

use crate::builder::build_sets_for_tick;
use crate::config::PoolConfig;
use crate::error::{ConfigError, PacketError, PoolResult};
use crate::pool::Pool;
use crate::stats::PoolStats;
use crate::tracker::ResendPolicy;
use crate::ClientId;

/// Outbound datagram sink. Implementations must not block.
pub trait Transport {
    fn send(&mut self, client: ClientId, bytes: &[u8]);
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, client: ClientId, bytes: &[u8]) {
        (**self).send(client, bytes);
    }
}

/// Collects datagrams in memory.
impl Transport for Vec<(ClientId, Vec<u8>)> {
    fn send(&mut self, client: ClientId, bytes: &[u8]) {
        self.push((client, bytes.to_vec()));
    }
}

/// Hands datagrams to a socket thread. A full or closed channel drops the
/// datagram, which the resend timer repairs.
impl Transport for Sender<(ClientId, Vec<u8>)> {
    fn send(&mut self, client: ClientId, bytes: &[u8]) {
        if let Err(err) = self.try_send((client, bytes.to_vec())) {
            let reason = match err {
                TrySendError::Full(_) => "full",
                TrySendError::Disconnected(_) => "disconnected",
            };
            debug!(client = client.0, reason, "outbound datagram dropped");
        }
    }
}

/// A datagram received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundPacket {
    pub client: ClientId,
    pub bytes: Vec<u8>,
}

/// Handoff from the socket thread to the tick loop.
///
/// The socket side holds [`InboundSender`]s; the server drains the queue at
/// the start of each tick with [`DeltaServer::drain_inbound`].
#[derive(Debug)]
pub struct InboundQueue {
    sender: Sender<InboundPacket>,
    receiver: Receiver<InboundPacket>,
}

impl Default for InboundQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InboundQueue {
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    /// A queue that drops datagrams once `capacity` are waiting.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Self { sender, receiver }
    }

    #[must_use]
    pub fn sender(&self) -> InboundSender {
        InboundSender(self.sender.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// Cloneable producer end of an [`InboundQueue`].
#[derive(Debug, Clone)]
pub struct InboundSender(Sender<InboundPacket>);

impl InboundSender {
    /// Queues a datagram. Returns `false` if it was dropped.
    pub fn send(&self, client: ClientId, bytes: Vec<u8>) -> bool {
        self.0.try_send(InboundPacket { client, bytes }).is_ok()
    }
}

/// Conditions surfaced to the connection layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolEvent {
    /// Too many unacknowledged sets; building is paused for this client.
    PoolSaturated { client: ClientId, outstanding: usize },
    /// A set was resent too often and dropped. Whether to disconnect is
    /// the caller's decision.
    ClientUnresponsive { client: ClientId, sequence: Sequence },
}

/// Summary of one [`DeltaServer::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub sets_built: usize,
    pub sets_sent: usize,
    pub sets_resent: usize,
    pub bytes_sent: usize,
    pub deltas_deferred: usize,
    pub events: Vec<PoolEvent>,
}

/// Server side of the delta pool: one pool per joined client, all scoped
/// to the current map.
///
/// Each join opens a session with its own packet stamp, derived from the
/// map id and a join counter. Acks carrying any other stamp are refused.
#[derive(Debug, Clone)]
pub struct DeltaServer {
    map_id: MapId,
    config: PoolConfig,
    pools: BTreeMap<ClientId, Pool>,
    joins: u32,
}

impl DeltaServer {
    /// Fails if `config` would leave pools unable to make progress.
    pub fn new(map_id: MapId, config: PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            map_id,
            config,
            pools: BTreeMap::new(),
            joins: 0,
        })
    }

    #[must_use]
    pub const fn map_id(&self) -> MapId {
        self.map_id
    }

    #[must_use]
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    #[must_use]
    pub fn client_count(&self) -> usize {
        self.pools.len()
    }

    pub fn clients(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.pools.keys().copied()
    }

    /// Stamp the client's current session puts on every packet.
    #[must_use]
    pub fn session(&self, client: ClientId) -> Option<MapId> {
        self.pools.get(&client).map(Pool::stamp)
    }

    /// Read-only view of a client's pool.
    #[must_use]
    pub fn pool(&self, client: ClientId) -> Option<&Pool> {
        self.pools.get(&client)
    }

    /// Totals over every pool.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let mut total = PoolStats::default();
        for pool in self.pools.values() {
            total += pool.stats();
        }
        total
    }

    /// Marks `id` dirty in every pool.
    pub fn notify_element_changed(&mut self, id: ElementId) {
        for pool in self.pools.values_mut() {
            pool.mark_dirty(id);
        }
    }

    /// Creates a fresh pool for `client`, replacing any previous one, and
    /// returns the session stamp. The client's receiver must be created
    /// (or reset) with it; packets of an earlier session are then ignored
    /// on both ends.
    pub fn on_client_joined<W: WorldView + ?Sized>(
        &mut self,
        client: ClientId,
        world: &W,
    ) -> MapId {
        self.joins = self.joins.wrapping_add(1);
        let stamp = self.map_id.session(self.joins);
        let pool = Pool::new(client, stamp, world);
        if self.pools.insert(client, pool).is_some() {
            info!(client = client.0, %stamp, "client rejoined, previous pool discarded");
        } else {
            info!(client = client.0, map = %self.map_id, %stamp, "client joined");
        }
        stamp
    }

    /// Drops the client's pool and everything in flight for it.
    pub fn on_client_left(&mut self, client: ClientId) -> bool {
        let removed = self.pools.remove(&client).is_some();
        if removed {
            info!(client = client.0, "client left");
        }
        removed
    }

    /// Discards every pool. Clients join again on the new map.
    pub fn on_map_changed(&mut self, map_id: MapId) {
        info!(
            from = %self.map_id,
            to = %map_id,
            pools = self.pools.len(),
            "map changed, pools discarded"
        );
        self.map_id = map_id;
        self.pools.clear();
    }

    /// Sets the point distances are measured from for `client`.
    pub fn set_viewpoint(&mut self, client: ClientId, viewpoint: Option<Point>) -> bool {
        let Some(pool) = self.pools.get_mut(&client) else {
            return false;
        };
        pool.set_viewpoint(viewpoint);
        true
    }

    /// Handles one datagram from `client`. Returns how many sets the ack
    /// retired. Every error means the packet was ignored.
    pub fn handle_packet(&mut self, client: ClientId, bytes: &[u8]) -> PoolResult<usize> {
        let ack = decode_ack(bytes, &self.config.limits)?;
        let Some(pool) = self.pools.get_mut(&client) else {
            return Err(PacketError::UnknownClient { client });
        };
        if ack.map_id != pool.stamp() {
            return Err(PacketError::ForeignMap {
                expected: pool.stamp(),
                found: ack.map_id,
            });
        }
        Ok(pool.acknowledge(ack.sequence)?)
    }

    /// Handles every datagram waiting in `queue`. Returns how many were
    /// processed.
    pub fn drain_inbound(&mut self, queue: &InboundQueue) -> usize {
        let mut handled = 0;
        for packet in queue.receiver.try_iter() {
            if let Err(err) = self.handle_packet(packet.client, &packet.bytes) {
                debug!(client = packet.client.0, error = %err, "inbound packet ignored");
            }
            handled += 1;
        }
        handled
    }

    /// Runs one server tick: builds new sets for every pool, then sends
    /// pending sets and resends timed-out ones.
    pub fn tick<W, T>(&mut self, now: Tick, world: &W, transport: &mut T) -> TickReport
    where
        W: WorldView + ?Sized,
        T: Transport + ?Sized,
    {
        let mut report = TickReport::default();
        let policy = ResendPolicy {
            resend_ticks: self.config.resend_ticks,
            max_resends: self.config.max_resends,
        };
        for (&client, pool) in &mut self.pools {
            let was_unresponsive = pool.tracker().is_unresponsive();

            let built = build_sets_for_tick(pool, world, now, &self.config);
            report.sets_built += built.sets.len();
            report.deltas_deferred += built.deferred;
            if pool.note_saturation(built.saturated) {
                let outstanding = pool.tracker().outstanding();
                debug!(client = client.0, outstanding, "pool saturated");
                report.events.push(PoolEvent::PoolSaturated {
                    client,
                    outstanding,
                });
            }

            let polled = pool.poll(now, policy, |bytes| transport.send(client, bytes));
            report.sets_sent += polled.sent.len();
            report.sets_resent += polled.resent.len();
            report.bytes_sent += polled.bytes;
            if let Some(sequence) = polled.dropped {
                if !was_unresponsive {
                    warn!(client = client.0, sequence = sequence.raw(), "client unresponsive");
                    report
                        .events
                        .push(PoolEvent::ClientUnresponsive { client, sequence });
                }
            }
        }
        report
    }
}
