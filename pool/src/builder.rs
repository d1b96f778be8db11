//! Delta set builder: turns a pool's dirty elements into encoded sets.

use codec::{encode, Delta, Sequence, SetEncoder, SetFlags, Tick};
use tracing::{debug, error, trace, warn};
use world::{ElementId, Fixed, WorldView};

use crate::config::PoolConfig;
use crate::pool::{Pool, PoolPhase};

/// What one build pass produced for a pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Sequences of the sets enqueued, in order.
    pub sets: Vec<Sequence>,
    /// Deltas packed into those sets.
    pub deltas: usize,
    /// Encoded deltas that did not fit this tick and stay dirty.
    pub deferred: usize,
    /// Dirty elements whose state matched the baseline after all.
    pub cleared: usize,
    /// The outstanding-set bound stopped the pass.
    pub saturated: bool,
}

/// Builds this tick's sets for `pool` and enqueues them as pending.
///
/// While the pool awaits its snapshot, only snapshot sets are built. Once
/// live, due dirty elements are encoded against the pool's baseline,
/// nearest first, and packed into at most `max_sets_per_tick` sets. A delta
/// is committed to the baseline only after its set was enqueued; anything
/// that does not fit stays dirty for a later tick.
pub fn build_sets_for_tick<W: WorldView + ?Sized>(
    pool: &mut Pool,
    world: &W,
    now: Tick,
    config: &PoolConfig,
) -> BuildOutcome {
    if pool.tracker.is_unresponsive() {
        return BuildOutcome::default();
    }
    let outcome = match pool.phase {
        PoolPhase::AwaitingSnapshot => build_snapshot_sets(pool, now, config),
        PoolPhase::Live => build_incremental_sets(pool, world, now, config),
    };
    pool.stats.sets_built += outcome.sets.len() as u64;
    pool.stats.deltas_built += outcome.deltas as u64;
    pool.stats.deltas_deferred += outcome.deferred as u64;
    outcome
}

fn build_snapshot_sets(pool: &mut Pool, now: Tick, config: &PoolConfig) -> BuildOutcome {
    let mut outcome = BuildOutcome::default();
    while pool.snapshot_end.is_none() {
        if pool.tracker.outstanding() >= config.max_outstanding_sets {
            outcome.saturated = true;
            break;
        }
        let Some(sequence) = pool.tracker.next_sequence() else {
            warn!(client = pool.client.0, "sequence space exhausted");
            break;
        };

        let mut encoder = SetEncoder::new(&config.limits);
        let mut taken = 0;
        for delta in &pool.snapshot {
            if encoder.push(delta).is_err() {
                break;
            }
            taken += 1;
        }
        if taken == 0 && !pool.snapshot.is_empty() {
            error!(
                client = pool.client.0,
                max_set_bytes = config.limits.max_set_bytes,
                "snapshot delta larger than a whole set"
            );
            break;
        }

        let last = taken == pool.snapshot.len();
        let Some(sequence) = enqueue(pool, encoder, sequence, SetFlags::snapshot(last), now) else {
            break;
        };
        pool.snapshot.drain(..taken);
        if last {
            pool.snapshot_end = Some(sequence);
        }
        trace!(
            client = pool.client.0,
            sequence = sequence.raw(),
            deltas = taken,
            last,
            "snapshot set built"
        );
        outcome.sets.push(sequence);
        outcome.deltas += taken;
    }
    outcome
}

fn build_incremental_sets<W: WorldView + ?Sized>(
    pool: &mut Pool,
    world: &W,
    now: Tick,
    config: &PoolConfig,
) -> BuildOutcome {
    let mut outcome = BuildOutcome::default();

    let mut candidates: Vec<(Option<Fixed>, ElementId)> = pool
        .dirty
        .iter()
        .filter_map(|&id| {
            let distance = pool
                .viewpoint
                .zip(world.origin(id))
                .map(|(viewpoint, origin)| viewpoint.approx_distance(origin));
            let last_sent = pool.last_sent.get(&id).copied();
            config
                .throttle
                .is_due(distance, last_sent, now)
                .then_some((distance, id))
        })
        .collect();
    candidates.sort_by_key(|&(distance, id)| (distance.map_or(0, Fixed::raw), id));

    let mut pending: Vec<Delta> = Vec::with_capacity(candidates.len());
    for (_, id) in candidates {
        let delta = world
            .element(id)
            .zip(pool.records.state(id))
            .and_then(|(current, baseline)| encode(id, &current, &baseline, &config.thresholds));
        match delta {
            Some(delta) => pending.push(delta),
            None => {
                pool.dirty.remove(&id);
                outcome.cleared += 1;
            }
        }
    }

    let mut next = 0;
    while next < pending.len() && outcome.sets.len() < config.max_sets_per_tick {
        if pool.tracker.outstanding() >= config.max_outstanding_sets {
            outcome.saturated = true;
            break;
        }
        let Some(sequence) = pool.tracker.next_sequence() else {
            warn!(client = pool.client.0, "sequence space exhausted");
            break;
        };

        let start = next;
        let mut encoder = SetEncoder::new(&config.limits);
        while next < pending.len() && encoder.push(&pending[next]).is_ok() {
            next += 1;
        }
        if encoder.is_empty() {
            error!(
                client = pool.client.0,
                element = %pending[next].id(),
                max_set_bytes = config.limits.max_set_bytes,
                "delta larger than a whole set"
            );
            break;
        }

        let Some(sequence) = enqueue(pool, encoder, sequence, SetFlags::incremental(), now) else {
            next = start;
            break;
        };
        for delta in &pending[start..next] {
            let id = delta.id();
            pool.records.commit(delta);
            pool.last_sent.insert(id, now);
            pool.dirty.remove(&id);
        }
        outcome.sets.push(sequence);
        outcome.deltas += next - start;
    }

    outcome.deferred = pending.len() - next;
    if outcome.deferred > 0 {
        debug!(
            client = pool.client.0,
            deferred = outcome.deferred,
            saturated = outcome.saturated,
            "deltas deferred to a later tick"
        );
    }
    outcome
}

fn enqueue(
    pool: &mut Pool,
    encoder: SetEncoder,
    sequence: Sequence,
    flags: SetFlags,
    now: Tick,
) -> Option<Sequence> {
    let count = encoder.len();
    let payload = match encoder.finish(pool.stamp, sequence, flags) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(client = pool.client.0, error = %err, "failed to frame delta set");
            return None;
        }
    };
    pool.tracker.enqueue(payload, count, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::ResendPolicy;
    use crate::ClientId;
    use codec::decode_delta_set;
    use world::{ElementCounts, FieldMask, MapId, MapState, Point, SectorField};

    const MAP: MapId = MapId::from_raw(0xABCD);

    fn live_pool(map: &MapState, config: &PoolConfig) -> Pool {
        let mut pool = Pool::new(ClientId(7), MAP, map);
        let outcome = build_sets_for_tick(&mut pool, map, Tick::new(0), config);
        let last = *outcome.sets.last().unwrap();
        assert_eq!(pool.snapshot_end(), Some(last));
        pool.poll(Tick::new(0), policy(config), |_| {});
        pool.acknowledge(last).unwrap();
        assert!(pool.is_live());
        pool
    }

    fn policy(config: &PoolConfig) -> ResendPolicy {
        ResendPolicy {
            resend_ticks: config.resend_ticks,
            max_resends: config.max_resends,
        }
    }

    fn raise_floor(map: &mut MapState, index: u32, units: i32) {
        let sector = map.sector_mut(index).unwrap();
        sector.floor_height = Fixed::from_int(sector.floor_height.to_int() + units);
    }

    fn payload(pool: &Pool, sequence: Sequence) -> Vec<u8> {
        pool.tracker().get(sequence).unwrap().payload.clone()
    }

    #[test]
    fn awaiting_pool_only_builds_snapshot() {
        let mut map = MapState::new(ElementCounts::new(3, 0, 0));
        let config = PoolConfig::for_testing();
        let mut pool = Pool::new(ClientId(1), MAP, &map);
        raise_floor(&mut map, 1, 8);
        pool.mark_dirty(ElementId::sector(1));

        let outcome = build_sets_for_tick(&mut pool, &map, Tick::new(0), &config);
        assert_eq!(outcome.sets, vec![Sequence::FIRST]);
        assert_eq!(outcome.deltas, 3);
        assert!(pool.is_dirty(ElementId::sector(1)));

        let decoded = decode_delta_set(&payload(&pool, Sequence::FIRST), &config.limits).unwrap();
        assert!(decoded.set.flags.is_snapshot_end());

        let outcome = build_sets_for_tick(&mut pool, &map, Tick::new(1), &config);
        assert!(outcome.sets.is_empty());
    }

    #[test]
    fn large_snapshot_spans_several_sets() {
        let map = MapState::new(ElementCounts::new(40, 0, 0));
        let mut config = PoolConfig::for_testing();
        config.limits.max_deltas_per_set = 16;
        let mut pool = Pool::new(ClientId(1), MAP, &map);

        let outcome = build_sets_for_tick(&mut pool, &map, Tick::new(0), &config);
        assert_eq!(outcome.sets.len(), 3);
        assert_eq!(pool.snapshot_end(), Some(Sequence::new(3)));
        let flags: Vec<_> = outcome
            .sets
            .iter()
            .map(|&seq| decode_delta_set(&payload(&pool, seq), &config.limits).unwrap().set.flags)
            .collect();
        assert!(flags.iter().all(|f| f.is_snapshot()));
        assert_eq!(
            flags.iter().map(|f| f.is_snapshot_end()).collect::<Vec<_>>(),
            vec![false, false, true]
        );

        pool.poll(Tick::new(0), policy(&config), |_| {});
        pool.acknowledge(Sequence::new(2)).unwrap();
        assert!(!pool.is_live());
        pool.acknowledge(Sequence::new(3)).unwrap();
        assert!(pool.is_live());
    }

    #[test]
    fn empty_map_still_gets_a_snapshot_end() {
        let map = MapState::new(ElementCounts::default());
        let config = PoolConfig::for_testing();
        let pool = live_pool(&map, &config);
        assert_eq!(pool.snapshot_end(), Some(Sequence::FIRST));
    }

    #[test]
    fn unchanged_dirty_elements_are_cleared() {
        let map = MapState::new(ElementCounts::new(3, 0, 0));
        let config = PoolConfig::for_testing();
        let mut pool = live_pool(&map, &config);
        pool.mark_dirty(ElementId::sector(0));

        let outcome = build_sets_for_tick(&mut pool, &map, Tick::new(1), &config);
        assert!(outcome.sets.is_empty());
        assert_eq!(outcome.cleared, 1);
        assert_eq!(pool.dirty_len(), 0);
    }

    #[test]
    fn enqueued_deltas_advance_the_baseline() {
        let mut map = MapState::new(ElementCounts::new(3, 0, 0));
        let config = PoolConfig::for_testing();
        let mut pool = live_pool(&map, &config);
        raise_floor(&mut map, 2, 1);
        pool.mark_dirty(ElementId::sector(2));

        let outcome = build_sets_for_tick(&mut pool, &map, Tick::new(5), &config);
        assert_eq!(outcome.sets, vec![Sequence::new(2)]);
        assert_eq!(pool.last_sent(ElementId::sector(2)), Some(Tick::new(5)));
        assert_eq!(
            pool.records().state(ElementId::sector(2)),
            map.element(ElementId::sector(2))
        );

        let decoded = decode_delta_set(&payload(&pool, Sequence::new(2)), &config.limits).unwrap();
        assert_eq!(decoded.set.deltas.len(), 1);
        assert_eq!(decoded.set.deltas[0].fields(), FieldMask::from(SectorField::FloorHeight));
    }

    #[test]
    fn overflow_is_deferred_not_dropped() {
        let mut map = MapState::new(ElementCounts::new(10, 0, 0));
        let mut config = PoolConfig::for_testing();
        config.limits.max_deltas_per_set = 4;
        let mut pool = live_pool(&map, &config);
        for index in 0..10 {
            raise_floor(&mut map, index, 2);
            pool.mark_dirty(ElementId::sector(index));
        }

        let outcome = build_sets_for_tick(&mut pool, &map, Tick::new(1), &config);
        assert_eq!(outcome.deltas, 4);
        assert_eq!(outcome.deferred, 6);
        assert_eq!(pool.dirty_len(), 6);
        assert_eq!(pool.stats().deltas_deferred, 6);
        // Ten snapshot deltas, then the four that fit.
        assert_eq!(pool.stats().deltas_built, 14);
        // Deferred elements keep their old baseline.
        assert_ne!(
            pool.records().state(ElementId::sector(9)),
            map.element(ElementId::sector(9))
        );
    }

    #[test]
    fn saturated_pool_builds_nothing() {
        let mut map = MapState::new(ElementCounts::new(4, 0, 0));
        let mut config = PoolConfig::for_testing();
        config.max_outstanding_sets = 2;
        let mut pool = live_pool(&map, &config);

        for tick in 1..=4 {
            raise_floor(&mut map, 0, 1);
            pool.mark_dirty(ElementId::sector(0));
            let outcome = build_sets_for_tick(&mut pool, &map, Tick::new(tick), &config);
            assert_eq!(outcome.saturated, tick > 2);
        }
        assert_eq!(pool.tracker().outstanding(), 2);
        assert!(pool.is_dirty(ElementId::sector(0)));

        pool.poll(Tick::new(4), policy(&config), |_| {});
        pool.acknowledge(Sequence::new(3)).unwrap();
        let outcome = build_sets_for_tick(&mut pool, &map, Tick::new(5), &config);
        assert_eq!(outcome.sets, vec![Sequence::new(4)]);
    }

    #[test]
    fn nearest_elements_are_packed_first() {
        let mut map = MapState::new(ElementCounts::new(3, 0, 0));
        map.set_origin(ElementId::sector(0), Point::from_units(900, 0));
        map.set_origin(ElementId::sector(1), Point::from_units(10, 0));
        map.set_origin(ElementId::sector(2), Point::from_units(300, 0));
        let mut config = PoolConfig::for_testing();
        config.limits.max_deltas_per_set = 1;
        config.max_sets_per_tick = 3;
        let mut pool = live_pool(&map, &config);
        pool.set_viewpoint(Some(Point::from_units(0, 0)));
        for index in 0..3 {
            raise_floor(&mut map, index, 4);
            pool.mark_dirty(ElementId::sector(index));
        }

        let outcome = build_sets_for_tick(&mut pool, &map, Tick::new(1), &config);
        let order: Vec<u32> = outcome
            .sets
            .iter()
            .map(|&seq| {
                decode_delta_set(&payload(&pool, seq), &config.limits).unwrap().set.deltas[0].index()
            })
            .collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn distant_elements_are_throttled() {
        let mut map = MapState::new(ElementCounts::new(2, 0, 0));
        map.set_origin(ElementId::sector(0), Point::from_units(10, 0));
        map.set_origin(ElementId::sector(1), Point::from_units(8000, 0));
        let mut config = PoolConfig::for_testing();
        config.throttle = crate::ThrottleConfig::default();
        config.max_outstanding_sets = 64;
        let mut pool = live_pool(&map, &config);
        pool.set_viewpoint(Some(Point::from_units(0, 0)));

        let mut sent_far = Vec::new();
        for tick in 1..=40 {
            raise_floor(&mut map, 0, 1);
            raise_floor(&mut map, 1, 1);
            pool.mark_dirty(ElementId::sector(0));
            pool.mark_dirty(ElementId::sector(1));
            build_sets_for_tick(&mut pool, &map, Tick::new(tick), &config);
            if pool.last_sent(ElementId::sector(1)) == Some(Tick::new(tick)) {
                sent_far.push(tick);
            }
        }
        assert_eq!(pool.last_sent(ElementId::sector(0)), Some(Tick::new(40)));
        assert_eq!(sent_far, vec![1, 36]);
    }
}
