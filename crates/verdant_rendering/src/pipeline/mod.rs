//! Per-frame reporting.

mod stats;

pub use stats::{FrameReport, RenderStats};
