//! Map element model for the dsync delta pool.
//!
//! This crate defines what gets replicated:
//! - Element identifiers for sectors, sides and polyobjects
//! - 16.16 fixed-point scalars and binary angles
//! - The tracked state of each element kind and its field masks
//! - The [`WorldView`] / [`WorldMirror`] access traits
//! - Deterministic map identity ([`MapId`])
//!
//! # Design Principles
//!
//! - **Explicit fields** - Every replicated field is named; field order is wire order.
//! - **Read-only access** - The pool reads the world, it never owns it.
//! - **Deterministic hashing** - A map id is stable given the same map and epoch.

mod element;
mod field;
mod fixed;
mod map;
mod map_id;
mod state;
mod view;

pub use element::{ElementId, ElementKind};
pub use field::{FieldClass, FieldMask, PolyField, SectorField, SideField};
pub use fixed::{Angle, Fixed, Point, FRACBITS, FRACUNIT};
pub use map::{ElementCounts, MapState};
pub use map_id::MapId;
pub use state::{ElementState, PolyState, SectorState, SideState, TextureId};
pub use view::{WorldMirror, WorldView};

/// Fixed server tick rate.
pub const TICRATE: u32 = 35;
