//! # Tier Classifier
//!
//! One ordered pass per frame:
//!
//! 1. distance to camera for every entity
//! 2. stable sort, nearest first
//! 3. walk in order: `Detailed` while inside detail range and budget
//!    remains, else `Proxy` while inside cull range and visible, else
//!    `Culled`
//!
//! Proximity always wins the scarce Detailed tier, so the nearest
//! `max_detailed` eligible entities are Detailed regardless of the order
//! the snapshot delivered them in.

use verdant_shared::{EntityKey, Vec3};

use crate::config::RenderConfig;
use crate::culling::{Camera, CullingEvaluator};

/// Rendering representation for one entity this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RenderTier {
    /// Full detailed renderer.
    Detailed,
    /// Batched proxy instance.
    Proxy,
    /// Not drawn.
    #[default]
    Culled,
}

/// Classification thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Detailed only below this distance.
    pub detail_distance: f32,
    /// Culled at or beyond this distance.
    pub cull_distance: f32,
    /// Detailed budget per frame.
    pub max_detailed: usize,
}

impl Thresholds {
    /// Thresholds from a render configuration.
    #[must_use]
    pub const fn from_config(config: &RenderConfig) -> Self {
        Self {
            detail_distance: config.lod.detail_distance,
            cull_distance: config.lod.cull_distance,
            max_detailed: config.detail.max_detailed,
        }
    }
}

/// Desired tier for one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierDecision {
    /// Entity.
    pub key: EntityKey,
    /// Position used for the decision.
    pub position: Vec3,
    /// Distance to the camera.
    pub distance: f32,
    /// Desired tier.
    pub tier: RenderTier,
}

/// Tier counts from one classification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierCounts {
    /// Entities classified Detailed.
    pub detailed: usize,
    /// Entities classified Proxy.
    pub proxy: usize,
    /// Entities classified Culled.
    pub culled: usize,
}

impl TierCounts {
    /// Adds one entity of `tier`.
    pub fn add(&mut self, tier: RenderTier) {
        match tier {
            RenderTier::Detailed => self.detailed += 1,
            RenderTier::Proxy => self.proxy += 1,
            RenderTier::Culled => self.culled += 1,
        }
    }

    /// Sum of all tiers.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.detailed + self.proxy + self.culled
    }
}

/// Assigns desired tiers. Keeps its decision buffer between frames.
#[derive(Debug, Clone)]
pub struct TierClassifier {
    thresholds: Thresholds,
    decisions: Vec<TierDecision>,
}

impl TierClassifier {
    /// Creates a classifier.
    #[must_use]
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            decisions: Vec::new(),
        }
    }

    /// Current thresholds.
    #[must_use]
    pub const fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Classifies `entities` against `camera`.
    ///
    /// `evaluator` must already be updated for `camera`. Only classes that
    /// support detail may be Detailed. Returns decisions sorted nearest
    /// first; ties keep input order.
    pub fn classify<I>(
        &mut self,
        entities: I,
        camera: &Camera,
        evaluator: &mut CullingEvaluator,
    ) -> &[TierDecision]
    where
        I: IntoIterator<Item = (EntityKey, Vec3)>,
    {
        self.decisions.clear();
        self.decisions.extend(entities.into_iter().map(|(key, position)| TierDecision {
            key,
            position,
            distance: camera.position.distance(position),
            tier: RenderTier::Culled,
        }));
        // Stable: equal distances keep input order.
        self.decisions.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let Thresholds { detail_distance, cull_distance, max_detailed } = self.thresholds;
        let mut budget = max_detailed;
        for decision in &mut self.decisions {
            decision.tier = if budget > 0
                && decision.key.class.supports_detail()
                && decision.distance < detail_distance
            {
                budget -= 1;
                RenderTier::Detailed
            } else if decision.distance < cull_distance
                && evaluator.classify(decision.position, decision.distance).visible
            {
                RenderTier::Proxy
            } else {
                RenderTier::Culled
            };
        }

        &self.decisions
    }

    /// Decisions from the last pass.
    #[must_use]
    pub fn decisions(&self) -> &[TierDecision] {
        &self.decisions
    }

    /// Tier counts from the last pass.
    #[must_use]
    pub fn counts(&self) -> TierCounts {
        let mut counts = TierCounts::default();
        for decision in &self.decisions {
            counts.add(decision.tier);
        }
        counts
    }
}
