//! # Frame Integration
//!
//! ## Data Flow
//!
//! ```text
//! simulation worker ──► Snapshot ──► UpdateOrchestrator ──► TierClassifier
//!                                          │                      │
//!                                          ▼                      ▼
//!                                  DetailPool / ProxyBuffers ◄── decisions
//!                                          │
//!                                          ▼
//!                                  InstanceUploader (once per dirty buffer)
//! ```
//!
//! ## Rules
//!
//! 1. One snapshot is applied at most once; frames without one only refresh
//! 2. No id ever holds more than one slot or handle
//! 3. Nothing here aborts the frame loop

mod orchestrator;

pub use orchestrator::UpdateOrchestrator;
