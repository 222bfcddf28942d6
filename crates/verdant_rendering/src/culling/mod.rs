//! Visibility for the population renderer.
//!
//! Frustum extraction, camera matrices, and the per-point evaluator used by
//! tier classification and proxy visibility refresh.

mod camera;
mod evaluator;
mod frustum;

pub use camera::{look_at, multiply, perspective, Camera, Mat4, IDENTITY};
pub use evaluator::{CullStats, CullingEvaluator, Visibility};
pub use frustum::{Frustum, Plane, Side};
