//! Delta encoding, delta sets and client-side application for dsync.
//!
//! This is the main codec crate tying together bitstream, wire and world:
//!
//! # Features
//!
//! - Field-level delta encoding with per-class noise thresholds
//! - Per-client record store (the baseline deltas are computed against)
//! - Delta-set serialization under byte and count budgets
//! - Cumulative acknowledgements
//! - Initial world snapshot for joining clients
//! - Client-side ordered receive window and idempotent application
//!
//! # Design Principles
//!
//! - **Correctness first** - A baseline only advances for deltas that were enqueued.
//! - **Fail partial** - One bad delta never discards the rest of its set.
//! - **Deterministic** - Same inputs produce same bytes.

mod ack;
mod apply;
mod delta;
mod encode;
mod error;
mod limits;
mod receiver;
mod record;
mod set;
mod snapshot;
mod types;

pub use ack::{decode_ack, encode_ack, Ack};
pub use apply::{apply_delta, apply_delta_set, ApplyReport};
pub use delta::Delta;
pub use encode::{encode, full_delta, NoiseThresholds};
pub use error::{ApplyError, CodecError, CodecResult, LimitKind};
pub use limits::CodecLimits;
pub use receiver::{ClientReceiver, ClientSetState, ReceiveOutcome, SetDisposition};
pub use record::RecordStore;
pub use set::{
    decode_delta_set, encode_delta_set, max_record_len, read_delta, record_len, write_delta,
    DecodedSet, DeltaSet, SetEncoder,
};
pub use snapshot::{initial_snapshot, initial_snapshot_set};
pub use types::{Sequence, Tick};
pub use wire::{Limits as WireLimits, SetFlags};
