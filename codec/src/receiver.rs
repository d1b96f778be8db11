//! Client-side receive window.

use std::collections::BTreeMap;

use tracing::{debug, trace};
use world::{MapId, WorldMirror};

use crate::ack::encode_ack;
use crate::apply::{apply_delta_set, ApplyReport};
use crate::error::{CodecError, CodecResult};
use crate::limits::CodecLimits;
use crate::set::{decode_delta_set, DecodedSet, DeltaSet};
use crate::types::Sequence;

/// What happened to one received delta set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetDisposition {
    /// It was next in line and has been applied.
    Applied,
    /// It arrived ahead of a gap and waits in the window.
    Buffered,
    /// Already applied or already buffered.
    Duplicate,
    /// Too far ahead to buffer; the server will resend it.
    BeyondWindow,
    /// Stamped for another map; ignored without an ack.
    ForeignMap,
}

/// Client-side view of one set sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientSetState {
    Unseen,
    Buffered,
    Applied,
}

/// Result of [`ClientReceiver::receive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveOutcome {
    pub disposition: SetDisposition,
    /// Sets applied by this call in order: the received set and any
    /// buffered successors it unblocked.
    pub applied: Vec<Sequence>,
    pub report: ApplyReport,
    /// Cumulative ack to send back, if any.
    pub ack: Option<Vec<u8>>,
}

/// Orders incoming delta sets and applies them strictly by sequence.
///
/// Applying in order keeps last-delta-wins safe under reordering: a stale
/// field value can never overwrite a newer one. Every set received for the
/// current map is answered with the highest in-order applied sequence, so a
/// lost ack is repaired by the next duplicate.
///
/// `map_id` is the stamp the server handed out for this session; sets with
/// any other stamp are dropped unacknowledged.
#[derive(Debug, Clone)]
pub struct ClientReceiver {
    map_id: MapId,
    limits: CodecLimits,
    last_applied: Sequence,
    buffered: BTreeMap<Sequence, DeltaSet>,
    synced: bool,
}

impl ClientReceiver {
    #[must_use]
    pub fn new(map_id: MapId, limits: CodecLimits) -> Self {
        Self {
            map_id,
            limits,
            last_applied: Sequence::ZERO,
            buffered: BTreeMap::new(),
            synced: false,
        }
    }

    #[must_use]
    pub const fn map_id(&self) -> MapId {
        self.map_id
    }

    /// Highest sequence applied in order.
    #[must_use]
    pub const fn last_applied(&self) -> Sequence {
        self.last_applied
    }

    /// `true` once the last set of the initial snapshot has been applied.
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        self.synced
    }

    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffered.len()
    }

    #[must_use]
    pub fn set_state(&self, sequence: Sequence) -> ClientSetState {
        if !sequence.is_zero() && sequence <= self.last_applied {
            ClientSetState::Applied
        } else if self.buffered.contains_key(&sequence) {
            ClientSetState::Buffered
        } else {
            ClientSetState::Unseen
        }
    }

    /// Forgets everything about the previous map or session.
    pub fn reset(&mut self, map_id: MapId) {
        self.map_id = map_id;
        self.last_applied = Sequence::ZERO;
        self.buffered.clear();
        self.synced = false;
    }

    /// The current cumulative ack packet.
    pub fn ack_packet(&self) -> CodecResult<Vec<u8>> {
        encode_ack(self.map_id, self.last_applied)
    }

    /// Decodes a delta-set packet and feeds it through the window.
    ///
    /// Malformed packets return an error and are not acknowledged.
    pub fn receive<M: WorldMirror + ?Sized>(
        &mut self,
        mirror: &mut M,
        bytes: &[u8],
    ) -> CodecResult<ReceiveOutcome> {
        let decoded = decode_delta_set(bytes, &self.limits)?;
        self.accept(mirror, decoded)
    }

    /// Feeds an already decoded set through the window.
    pub fn accept<M: WorldMirror + ?Sized>(
        &mut self,
        mirror: &mut M,
        decoded: DecodedSet,
    ) -> CodecResult<ReceiveOutcome> {
        let DecodedSet { map_id, set } = decoded;
        if map_id != self.map_id {
            debug!(
                expected = %self.map_id,
                found = %map_id,
                sequence = set.sequence.raw(),
                "delta set for another map dropped"
            );
            return Ok(ReceiveOutcome {
                disposition: SetDisposition::ForeignMap,
                applied: Vec::new(),
                report: ApplyReport::default(),
                ack: None,
            });
        }

        let expected = self.last_applied.next().ok_or(CodecError::SequenceExhausted)?;
        let mut applied = Vec::new();
        let mut report = ApplyReport::default();

        let disposition = if set.sequence < expected || self.buffered.contains_key(&set.sequence) {
            trace!(sequence = set.sequence.raw(), "duplicate delta set");
            SetDisposition::Duplicate
        } else if set.sequence == expected {
            self.apply_in_order(mirror, &set, &mut applied, &mut report);
            self.drain_buffered(mirror, &mut applied, &mut report);
            SetDisposition::Applied
        } else if self.within_window(set.sequence, expected) {
            debug!(
                sequence = set.sequence.raw(),
                expected = expected.raw(),
                "delta set buffered ahead of gap"
            );
            self.buffered.insert(set.sequence, set);
            SetDisposition::Buffered
        } else {
            debug!(
                sequence = set.sequence.raw(),
                expected = expected.raw(),
                window = self.limits.max_buffered_sets,
                "delta set beyond receive window dropped"
            );
            SetDisposition::BeyondWindow
        };

        Ok(ReceiveOutcome {
            disposition,
            applied,
            report,
            ack: Some(self.ack_packet()?),
        })
    }

    fn within_window(&self, sequence: Sequence, expected: Sequence) -> bool {
        let ahead = u64::from(sequence.raw() - expected.raw());
        ahead <= self.limits.max_buffered_sets as u64
    }

    fn apply_in_order<M: WorldMirror + ?Sized>(
        &mut self,
        mirror: &mut M,
        set: &DeltaSet,
        applied: &mut Vec<Sequence>,
        report: &mut ApplyReport,
    ) {
        let set_report = apply_delta_set(mirror, set);
        report.applied += set_report.applied;
        report.rejected.extend(set_report.rejected);
        self.last_applied = set.sequence;
        applied.push(set.sequence);
        if set.flags.is_snapshot_end() && !self.synced {
            debug!(sequence = set.sequence.raw(), "initial snapshot applied");
            self.synced = true;
        }
    }

    fn drain_buffered<M: WorldMirror + ?Sized>(
        &mut self,
        mirror: &mut M,
        applied: &mut Vec<Sequence>,
        report: &mut ApplyReport,
    ) {
        while let Some(next) = self.last_applied.next() {
            let Some(set) = self.buffered.remove(&next) else {
                break;
            };
            self.apply_in_order(mirror, &set, applied, report);
        }
    }
}
