//! # Memory Management
//!
//! Pre-allocated index and object pools.
//!
//! ## Design Philosophy
//!
//! All capacity is reserved once at startup. During rendering:
//! - No growth
//! - Free lists only
//! - Predictable, flat latency

mod pool;
mod slots;

pub use pool::{PoolAllocator, PoolHandle};
pub use slots::SlotAllocator;
