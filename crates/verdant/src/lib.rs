//! # VERDANT
//!
//! Integration crate: connects the population renderer to a simulation
//! running on its own thread.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                             VERDANT                                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐  SimRequest   ┌─────────────────┐                  │
//! │  │  Simulation     │<──────────────│  Simulation     │                  │
//! │  │  worker thread  │──────────────>│  Link           │                  │
//! │  │                 │  SimResponse  │  • coalescing   │                  │
//! │  └─────────────────┘               └────────┬────────┘                  │
//! │                                             │ Snapshot                  │
//! │                                    ┌────────v────────┐                  │
//! │                                    │  Frame Loop     │                  │
//! │                                    │  • orchestrator │                  │
//! │                                    │  • uploads      │                  │
//! │                                    │  • animation    │                  │
//! │                                    └─────────────────┘                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `sim_link`: single-in-flight worker channel
//! - `frame_loop`: per-frame driver and timing
//! - `demo`: deterministic wandering population
//! - `config`: headless run configuration

pub mod config;
pub mod demo;
pub mod error;
pub mod frame_loop;
pub mod sim_link;

// Re-export the layers
pub use verdant_core as core;
pub use verdant_rendering as rendering;
pub use verdant_shared as shared;

pub use config::AppConfig;
pub use demo::{DemoConfig, WanderSimulation};
pub use error::{VerdantError, VerdantResult};
pub use frame_loop::{FrameLoop, FrameStatsAccumulator, FrameTiming, MAX_FRAME_TIME, TARGET_FRAME_TIME};
pub use sim_link::{LinkStats, Simulation, SimulationLink};
