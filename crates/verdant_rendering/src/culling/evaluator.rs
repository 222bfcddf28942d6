//! Per-point visibility test shared by classification and proxy refresh.

use verdant_shared::Vec3;

use super::{Camera, Frustum};

/// Result of a visibility test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    /// Whether the point should be drawn.
    pub visible: bool,
}

/// Counters for one evaluator. Reset with [`CullingEvaluator::take_stats`];
/// saturate instead of wrapping when never drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CullStats {
    /// Points reported visible.
    pub visible: u32,
    /// Points reported hidden.
    pub hidden: u32,
    /// Visible points that skipped the frustum test.
    pub near_overrides: u32,
}

/// Frustum + distance test against the current camera.
#[derive(Debug, Clone)]
pub struct CullingEvaluator {
    frustum: Frustum,
    cull_distance: f32,
    near_override: f32,
    stats: CullStats,
}

impl CullingEvaluator {
    /// Creates an evaluator. Call [`Self::update`] before the first test.
    #[must_use]
    pub fn new(cull_distance: f32, near_override: f32) -> Self {
        Self {
            frustum: Frustum::default(),
            cull_distance,
            near_override,
            stats: CullStats::default(),
        }
    }

    /// Re-extracts the frustum from the camera.
    pub fn update(&mut self, camera: &Camera) {
        self.frustum = Frustum::from_view_projection(&camera.view_projection());
    }

    /// Tests a point at `distance` from the camera.
    ///
    /// Anything at or past the cull distance is hidden. Anything closer than
    /// the near override is visible without consulting the frustum.
    pub fn classify(&mut self, position: Vec3, distance: f32) -> Visibility {
        let visible = if distance >= self.cull_distance {
            false
        } else if distance < self.near_override {
            self.stats.near_overrides = self.stats.near_overrides.saturating_add(1);
            true
        } else {
            self.frustum.contains_point(position)
        };

        let counter = if visible { &mut self.stats.visible } else { &mut self.stats.hidden };
        *counter = counter.saturating_add(1);
        Visibility { visible }
    }

    /// Current frustum.
    #[must_use]
    pub const fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Counters since the last call, then resets them.
    pub fn take_stats(&mut self) -> CullStats {
        std::mem::take(&mut self.stats)
    }
}
