//! Level-of-detail classification.

mod classifier;

pub use classifier::{RenderTier, Thresholds, TierClassifier, TierCounts, TierDecision};
