//! One client's delta pool.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use codec::{initial_snapshot, Delta, RecordStore, Sequence, Tick};
use tracing::{debug, info};
use world::{ElementId, MapId, Point, WorldView};

use crate::error::AckError;
use crate::stats::PoolStats;
use crate::tracker::{PollOutcome, ResendPolicy, SetTracker};
use crate::ClientId;

/// Whether a pool may build incremental sets yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PoolPhase {
    /// The initial snapshot is queued or in flight.
    AwaitingSnapshot,
    /// The client acknowledged the snapshot.
    Live,
}

/// Everything the server tracks for one joined client on the current map.
///
/// Dropped as a whole on leave or map change: there is no drain of sets
/// still in flight, since the baseline they were diffed against goes too.
#[derive(Debug, Clone)]
pub struct Pool {
    pub(crate) client: ClientId,
    /// Packet stamp of this session: the map id mixed with the join
    /// generation.
    pub(crate) stamp: MapId,
    pub(crate) phase: PoolPhase,
    pub(crate) records: RecordStore,
    /// Snapshot deltas not packed into a set yet.
    pub(crate) snapshot: VecDeque<Delta>,
    pub(crate) snapshot_end: Option<Sequence>,
    pub(crate) dirty: BTreeSet<ElementId>,
    pub(crate) last_sent: BTreeMap<ElementId, Tick>,
    pub(crate) viewpoint: Option<Point>,
    pub(crate) tracker: SetTracker,
    pub(crate) stats: PoolStats,
    saturated: bool,
}

impl Pool {
    /// Captures the baseline from `world` and queues the initial snapshot
    /// carrying those same values. Every set is stamped with `stamp`.
    pub fn new<W: WorldView + ?Sized>(client: ClientId, stamp: MapId, world: &W) -> Self {
        let records = RecordStore::capture(world);
        let snapshot: VecDeque<Delta> = initial_snapshot(world).into();
        debug!(
            client = client.0,
            stamp = %stamp,
            elements = snapshot.len(),
            "pool created"
        );
        Self {
            client,
            stamp,
            phase: PoolPhase::AwaitingSnapshot,
            records,
            snapshot,
            snapshot_end: None,
            dirty: BTreeSet::new(),
            last_sent: BTreeMap::new(),
            viewpoint: None,
            tracker: SetTracker::new(),
            stats: PoolStats::default(),
            saturated: false,
        }
    }

    #[must_use]
    pub const fn client(&self) -> ClientId {
        self.client
    }

    #[must_use]
    pub const fn stamp(&self) -> MapId {
        self.stamp
    }

    #[must_use]
    pub const fn phase(&self) -> PoolPhase {
        self.phase
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.phase == PoolPhase::Live
    }

    /// Sequence of the last snapshot set, once it has been built.
    #[must_use]
    pub const fn snapshot_end(&self) -> Option<Sequence> {
        self.snapshot_end
    }

    /// Snapshot deltas still waiting for a set.
    #[must_use]
    pub fn snapshot_remaining(&self) -> usize {
        self.snapshot.len()
    }

    #[must_use]
    pub const fn records(&self) -> &RecordStore {
        &self.records
    }

    #[must_use]
    pub const fn tracker(&self) -> &SetTracker {
        &self.tracker
    }

    #[must_use]
    pub const fn stats(&self) -> PoolStats {
        self.stats
    }

    #[must_use]
    pub const fn viewpoint(&self) -> Option<Point> {
        self.viewpoint
    }

    pub fn set_viewpoint(&mut self, viewpoint: Option<Point>) {
        self.viewpoint = viewpoint;
    }

    #[must_use]
    pub fn is_dirty(&self, id: ElementId) -> bool {
        self.dirty.contains(&id)
    }

    #[must_use]
    pub fn dirty_len(&self) -> usize {
        self.dirty.len()
    }

    /// Tick the element's last delta was enqueued.
    #[must_use]
    pub fn last_sent(&self, id: ElementId) -> Option<Tick> {
        self.last_sent.get(&id).copied()
    }

    /// Marks `id` for the next build pass. Ids outside the map are ignored.
    pub fn mark_dirty(&mut self, id: ElementId) -> bool {
        if !self.records.counts().contains(id) {
            return false;
        }
        self.dirty.insert(id);
        true
    }

    /// Applies a cumulative ack from the client.
    ///
    /// Acknowledging the last snapshot set switches the pool live.
    pub fn acknowledge(&mut self, sequence: Sequence) -> Result<usize, AckError> {
        match self.tracker.acknowledge(sequence) {
            Ok(retired) => {
                self.stats.sets_acked += retired as u64;
                if self.phase == PoolPhase::AwaitingSnapshot
                    && self.snapshot_end.is_some_and(|end| sequence >= end)
                {
                    info!(
                        client = self.client.0,
                        sequence = sequence.raw(),
                        "snapshot acknowledged, pool live"
                    );
                    self.phase = PoolPhase::Live;
                }
                Ok(retired)
            }
            Err(err) => {
                self.stats.stale_acks += 1;
                debug!(client = self.client.0, error = %err, "stale ack ignored");
                Err(err)
            }
        }
    }

    /// Hands pending and timed-out sets to `send`.
    pub fn poll<F>(&mut self, now: Tick, policy: ResendPolicy, send: F) -> PollOutcome
    where
        F: FnMut(&[u8]),
    {
        let outcome = self.tracker.poll(now, policy, send);
        self.stats.sets_sent += outcome.sent.len() as u64;
        self.stats.sets_resent += outcome.resent.len() as u64;
        self.stats.bytes_sent += outcome.bytes as u64;
        if outcome.dropped.is_some() {
            self.stats.sets_dropped += 1;
        }
        outcome
    }

    /// Records whether the last build hit the outstanding bound. Returns
    /// `true` only when the pool just became saturated.
    pub(crate) fn note_saturation(&mut self, saturated: bool) -> bool {
        let rising = saturated && !self.saturated;
        self.saturated = saturated;
        rising
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use world::{ElementCounts, MapState};

    fn pool() -> Pool {
        let map = MapState::new(ElementCounts::new(3, 2, 0));
        Pool::new(ClientId(1), MapId::from_raw(9), &map)
    }

    #[test]
    fn new_pool_awaits_snapshot() {
        let pool = pool();
        assert_eq!(pool.phase(), PoolPhase::AwaitingSnapshot);
        assert_eq!(pool.snapshot_remaining(), 5);
        assert_eq!(pool.snapshot_end(), None);
        assert_eq!(pool.dirty_len(), 0);
    }

    #[test]
    fn out_of_map_ids_are_not_marked() {
        let mut pool = pool();
        assert!(pool.mark_dirty(ElementId::sector(2)));
        assert!(!pool.mark_dirty(ElementId::sector(3)));
        assert!(!pool.mark_dirty(ElementId::poly(0)));
        assert_eq!(pool.dirty_len(), 1);
    }

    #[test]
    fn acking_the_snapshot_end_goes_live() {
        let mut pool = pool();
        pool.tracker.enqueue(vec![0; 8], 5, Tick::new(0)).unwrap();
        pool.snapshot.clear();
        pool.snapshot_end = Some(Sequence::FIRST);

        assert_eq!(pool.acknowledge(Sequence::FIRST), Ok(1));
        assert!(pool.is_live());
        assert_eq!(pool.stats().sets_acked, 1);
    }

    #[test]
    fn stale_acks_are_counted() {
        let mut pool = pool();
        assert!(pool.acknowledge(Sequence::new(4)).is_err());
        assert_eq!(pool.stats().stale_acks, 1);
        assert!(!pool.is_live());
    }

    #[test]
    fn saturation_reports_rising_edge_only() {
        let mut pool = pool();
        assert!(pool.note_saturation(true));
        assert!(!pool.note_saturation(true));
        assert!(!pool.note_saturation(false));
        assert!(pool.note_saturation(true));
    }
}
