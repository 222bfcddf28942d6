//! # VERDANT Shared
//!
//! Types that cross the simulation boundary.
//!
//! The simulation worker produces [`Snapshot`]s made of [`RawEntityRecord`]s.
//! The renderer normalizes every raw record into an [`EntityRecord`] exactly
//! once, at ingest, so nothing downstream needs fallback lookups.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on `wgpu` or any window-related crate.

#![deny(unsafe_code)]

pub mod math;
pub mod protocol;
pub mod snapshot;

pub use math::{Quaternion, Transform, Vec3};
pub use protocol::{SimRequest, SimResponse};
pub use snapshot::{
    Activity, CorpseTraits, CreatureTraits, Diet, EntityClass, EntityId, EntityKey, EntityRecord,
    Habitat, PlantTraits, RawEntityRecord, RecordError, RemovedIds, Snapshot, Traits,
};
