//! Transmission and acknowledgement tracking for one pool.
//!
//! Sets move `Pending -> InFlight -> Acknowledged`, or end `Dropped` once
//! they have been resent too often. Payloads are stored encoded and resent
//! byte for byte; they are never rebuilt from newer world state.

use std::collections::BTreeMap;

use codec::{Sequence, Tick};
use tracing::{debug, warn};

use crate::error::AckError;

/// Lifecycle of one delta set on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SetState {
    /// Built this tick, not yet handed to the transport.
    Pending,
    /// Sent at least once, awaiting an ack.
    InFlight,
    /// Retired by an ack.
    Acknowledged,
    /// Resent too often; the client is presumed gone.
    Dropped,
}

/// A delta set the client has not acknowledged yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutstandingSet {
    pub sequence: Sequence,
    /// The complete encoded packet.
    pub payload: Vec<u8>,
    pub created: Tick,
    pub last_sent: Option<Tick>,
    pub state: SetState,
    pub resend_count: u32,
    pub delta_count: usize,
}

/// Resend policy applied by [`SetTracker::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResendPolicy {
    pub resend_ticks: u32,
    pub max_resends: u32,
}

/// What one [`SetTracker::poll`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// First transmissions, in sequence order.
    pub sent: Vec<Sequence>,
    pub resent: Vec<Sequence>,
    pub dropped: Option<Sequence>,
    pub bytes: usize,
}

/// Issues sequence numbers and tracks sets until they are acknowledged.
#[derive(Debug, Clone, Default)]
pub struct SetTracker {
    sets: BTreeMap<Sequence, OutstandingSet>,
    highest_issued: Sequence,
    highest_acked: Sequence,
    unresponsive: bool,
}

impl SetTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence the next enqueued set will carry, or `None` once the
    /// sequence space is exhausted.
    #[must_use]
    pub const fn next_sequence(&self) -> Option<Sequence> {
        self.highest_issued.next()
    }

    #[must_use]
    pub const fn highest_issued(&self) -> Sequence {
        self.highest_issued
    }

    #[must_use]
    pub const fn highest_acked(&self) -> Sequence {
        self.highest_acked
    }

    /// Set once a set has been dropped. No further sends happen.
    #[must_use]
    pub const fn is_unresponsive(&self) -> bool {
        self.unresponsive
    }

    /// Pending and in-flight sets.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.sets
            .values()
            .filter(|set| matches!(set.state, SetState::Pending | SetState::InFlight))
            .count()
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.sets
            .values()
            .filter(|set| set.state == SetState::InFlight)
            .count()
    }

    #[must_use]
    pub fn get(&self, sequence: Sequence) -> Option<&OutstandingSet> {
        self.sets.get(&sequence)
    }

    /// State of any issued sequence, including retired ones.
    #[must_use]
    pub fn state(&self, sequence: Sequence) -> Option<SetState> {
        if let Some(set) = self.sets.get(&sequence) {
            return Some(set.state);
        }
        (!sequence.is_zero() && sequence <= self.highest_acked).then_some(SetState::Acknowledged)
    }

    /// Unretired sets in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = &OutstandingSet> {
        self.sets.values()
    }

    /// Stores an encoded set as `Pending` under the next sequence.
    ///
    /// `payload` must have been encoded with [`Self::next_sequence`].
    pub fn enqueue(&mut self, payload: Vec<u8>, delta_count: usize, now: Tick) -> Option<Sequence> {
        let sequence = self.next_sequence()?;
        self.highest_issued = sequence;
        self.sets.insert(
            sequence,
            OutstandingSet {
                sequence,
                payload,
                created: now,
                last_sent: None,
                state: SetState::Pending,
                resend_count: 0,
                delta_count,
            },
        );
        Some(sequence)
    }

    /// Applies a cumulative ack: every set up to and including `sequence`
    /// is retired. Returns how many outstanding sets it retired.
    pub fn acknowledge(&mut self, sequence: Sequence) -> Result<usize, AckError> {
        if sequence <= self.highest_acked || sequence > self.highest_issued {
            return Err(AckError::Stale {
                sequence,
                highest_acked: self.highest_acked,
                highest_issued: self.highest_issued,
            });
        }
        self.highest_acked = sequence;
        let later = match sequence.next() {
            Some(first_later) => self.sets.split_off(&first_later),
            None => BTreeMap::new(),
        };
        let retired = std::mem::replace(&mut self.sets, later);
        let count = retired
            .values()
            .filter(|set| set.state != SetState::Dropped)
            .count();
        Ok(count)
    }

    /// Sends pending sets and resends timed-out ones through `send`, in
    /// sequence order.
    ///
    /// A set that would exceed `max_resends` is dropped instead, the tracker
    /// turns unresponsive and nothing else is sent.
    pub fn poll<F>(&mut self, now: Tick, policy: ResendPolicy, mut send: F) -> PollOutcome
    where
        F: FnMut(&[u8]),
    {
        let mut outcome = PollOutcome::default();
        if self.unresponsive {
            return outcome;
        }
        for set in self.sets.values_mut() {
            match set.state {
                SetState::Pending => {
                    send(&set.payload);
                    set.state = SetState::InFlight;
                    set.last_sent = Some(now);
                    outcome.sent.push(set.sequence);
                    outcome.bytes += set.payload.len();
                }
                SetState::InFlight => {
                    let last = set.last_sent.unwrap_or(set.created);
                    if now.since(last) < policy.resend_ticks {
                        continue;
                    }
                    if set.resend_count >= policy.max_resends {
                        warn!(
                            sequence = set.sequence.raw(),
                            resends = set.resend_count,
                            "delta set dropped after too many resends"
                        );
                        set.state = SetState::Dropped;
                        self.unresponsive = true;
                        outcome.dropped = Some(set.sequence);
                        break;
                    }
                    send(&set.payload);
                    set.resend_count += 1;
                    set.last_sent = Some(now);
                    debug!(
                        sequence = set.sequence.raw(),
                        resend = set.resend_count,
                        "delta set resent"
                    );
                    outcome.resent.push(set.sequence);
                    outcome.bytes += set.payload.len();
                }
                SetState::Acknowledged | SetState::Dropped => {}
            }
        }
        outcome
    }
}
