//! Per-pool counters.

use std::ops::AddAssign;

/// Running totals for one pool, or summed over a server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolStats {
    pub sets_built: u64,
    pub sets_sent: u64,
    pub sets_resent: u64,
    pub sets_acked: u64,
    pub sets_dropped: u64,
    pub deltas_built: u64,
    /// Encoded deltas left dirty because the tick's sets were full.
    pub deltas_deferred: u64,
    pub bytes_sent: u64,
    pub stale_acks: u64,
}

impl AddAssign for PoolStats {
    fn add_assign(&mut self, other: Self) {
        self.sets_built += other.sets_built;
        self.sets_sent += other.sets_sent;
        self.sets_resent += other.sets_resent;
        self.sets_acked += other.sets_acked;
        self.sets_dropped += other.sets_dropped;
        self.deltas_built += other.deltas_built;
        self.deltas_deferred += other.deltas_deferred;
        self.bytes_sent += other.bytes_sent;
        self.stale_acks += other.stale_acks;
    }
}
