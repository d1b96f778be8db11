//! Initial world snapshot for joining clients.

use wire::SetFlags;
use world::WorldView;

use crate::encode::full_delta;
use crate::set::DeltaSet;
use crate::types::Sequence;
use crate::Delta;

/// One full delta per element of `world`, in element id order.
///
/// Sent before any incremental traffic so the client's mirror matches the
/// baseline the server captured for it.
#[must_use]
pub fn initial_snapshot<W: WorldView + ?Sized>(world: &W) -> Vec<Delta> {
    world
        .counts()
        .ids()
        .filter_map(|id| world.element(id).map(|state| full_delta(id.index, state)))
        .collect()
}

/// The whole snapshot as a single set flagged as the snapshot's end.
///
/// Large maps do not fit one datagram; the pool splits the deltas of
/// [`initial_snapshot`] over several sets instead.
#[must_use]
pub fn initial_snapshot_set<W: WorldView + ?Sized>(world: &W, sequence: Sequence) -> DeltaSet {
    DeltaSet {
        sequence,
        flags: SetFlags::snapshot(true),
        deltas: initial_snapshot(world),
    }
}
