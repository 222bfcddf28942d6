//! # VERDANT Rendering
//!
//! Tiered population renderer for the ecosystem simulation:
//! - thousands of creatures, thousands of plants, hundreds of corpses
//! - bounded per-entity cost regardless of population size
//! - detailed renderers recycled, never churned
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      FRAME PIPELINE                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Snapshot → Removal → Classification → Reconciliation        │
//! │                           ↓                  ↓               │
//! │                  Culling Evaluator   Detail Pool / Proxies   │
//! │                                              ↓               │
//! │                                   Flush (one upload/buffer)  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tiers
//!
//! - **Detailed**: nearest creatures, up to `max_detailed`
//! - **Proxy**: batched instance inside cull distance and the frustum
//! - **Culled**: nothing drawn, still tracked

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod culling;
pub mod detail;
pub mod error;
pub mod gpu;
pub mod instancing;
pub mod integration;
pub mod lod;
pub mod picking;
pub mod pipeline;

pub use config::RenderConfig;
pub use culling::{Camera, CullStats, CullingEvaluator, Frustum, Visibility};
pub use detail::{
    describe, AssetRegistry, DetailFactory, DetailHandle, DetailPool, FeatureDescriptor,
    ProceduralFactory,
};
pub use error::{RenderError, RenderResult};
pub use gpu::{InstanceUploader, RecordingUploader, WgpuInstanceUploader};
pub use instancing::{InstanceBuffer, ProxyBuffer, ProxyInstance, ProxyKind};
pub use integration::UpdateOrchestrator;
pub use lod::{RenderTier, Thresholds, TierClassifier, TierDecision};
pub use picking::{Ray, Selection};
pub use pipeline::{FrameReport, RenderStats};
