//! Batched proxy rendering.
//!
//! Distant entities are drawn as instances of a cheap shared mesh. Each
//! category owns a fixed-capacity instance buffer whose slots are handed
//! out by partitioned slot allocators.
//!
//! ## Key Concepts
//!
//! - **Instance Buffer**: CPU staging copy of a GPU buffer, allocated once
//! - **Partition**: a sub-category's fixed share of a buffer
//! - **Dirty Range**: slots written this frame, uploaded once at flush

mod buffer;
mod instance_data;
mod proxy;

pub use buffer::InstanceBuffer;
pub use instance_data::{hsv_to_rgb, ProxyInstance};
pub use proxy::{ProxyBuffer, ProxyKind, ProxyStats};
