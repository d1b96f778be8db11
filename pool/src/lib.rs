//! Server-side delta pools for dsync.
//!
//! This crate decides what each client is sent and tracks it until the
//! client acknowledges it:
//!
//! - [`DeltaServer`] holds one [`Pool`] per joined client, scoped to the
//!   current map.
//! - [`build_sets_for_tick`] encodes dirty elements against a pool's
//!   baseline and packs them into budgeted delta sets.
//! - [`SetTracker`] sends, resends and retires those sets.
//!
//! Everything runs on the server's tick. The only cross-thread handoff is
//! the [`InboundQueue`] fed by the socket thread.

mod builder;
mod client;
mod config;
mod error;
mod pool;
mod server;
mod stats;
mod tracker;

pub use builder::{build_sets_for_tick, BuildOutcome};
pub use client::ClientId;
pub use config::{PoolConfig, ThrottleConfig};
pub use error::{AckError, ConfigError, PacketError, PoolResult};
pub use pool::{Pool, PoolPhase};
pub use server::{
    DeltaServer, InboundPacket, InboundQueue, InboundSender, PoolEvent, TickReport, Transport,
};
pub use stats::PoolStats;
pub use tracker::{OutstandingSet, PollOutcome, ResendPolicy, SetState, SetTracker};
