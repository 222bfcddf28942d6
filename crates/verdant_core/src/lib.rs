//! # VERDANT Core
//!
//! Fixed-capacity allocators and frame synchronization used by the renderer.
//!
//! ## Architecture Rules
//!
//! 1. **Capacity is decided at construction** - nothing grows at runtime
//! 2. **Exhaustion is a value, not an error** - callers degrade gracefully
//! 3. **Double release is harmless** - stale handles are ignored
//!
//! ## Example
//!
//! ```rust
//! use verdant_core::SlotAllocator;
//!
//! let mut slots = SlotAllocator::new(2);
//! let a = slots.acquire().unwrap();
//! let _b = slots.acquire().unwrap();
//! assert!(slots.acquire().is_none());
//! assert!(slots.release(a));
//! assert!(!slots.release(a));
//! ```

#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod memory;
pub mod sync;

pub use memory::{PoolAllocator, PoolHandle, SlotAllocator};
pub use sync::StepCoalescer;
