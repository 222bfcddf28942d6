//! Detailed renderers for nearby creatures.
//!
//! ## Key Concepts
//!
//! - **Feature descriptors**: a pure part list derived from traits
//! - **Asset registry**: quantized geometry/material ids shared by handles
//! - **Factory**: turns a record into a bound [`DetailHandle`]
//! - **Pool**: hard active cap plus a bounded recycle list

mod factory;
mod features;
mod handle;
mod pool;
mod registry;

pub use factory::{DetailFactory, ProceduralFactory};
pub use features::{describe, FeatureDescriptor, FeatureKind, Tint, MAX_EYES, MAX_LEGS};
pub use handle::{AnimationState, DetailHandle, MeshPart, TransientFlags};
pub use pool::{DetailPool, DetailPoolStats};
pub use registry::{
    AssetRegistry, GeometryId, GeometryKey, MaterialId, MaterialKey, HUE_BUCKETS, SIZE_STEP,
};
