//! Creature feature descriptors.
//!
//! [`describe`] is a pure function from traits to a part list. The factory
//! resolves each descriptor to registry ids; nothing here touches GPU state.

use verdant_shared::{CreatureTraits, Diet, Vec3};

/// Most eyes drawn on one creature.
pub const MAX_EYES: u8 = 8;
/// Most legs drawn on one creature.
pub const MAX_LEGS: u8 = 12;
/// Aggression at which spikes appear.
pub const SPIKE_AGGRESSION: f32 = 0.6;
/// Speed at which a tail appears.
pub const TAIL_SPEED: f32 = 0.5;

/// Kind of body part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKind {
    /// Main body volume.
    Body,
    /// Single eye.
    Eye,
    /// Single leg.
    Leg,
    /// Swimming fin, for limbless creatures.
    Fin,
    /// Flat grinding beak.
    Beak,
    /// Jaw with fangs.
    FangedJaw,
    /// Plain jaw.
    Jaw,
    /// Dorsal spike.
    Spike,
    /// Tail.
    Tail,
}

/// Which material variant a part uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tint {
    /// Body hue.
    Base,
    /// Darker variant of the body hue.
    Shade,
    /// Hue-independent bone/ivory.
    Bone,
    /// Hue-independent eye material.
    Eye,
}

/// One part of a detailed creature, in body-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureDescriptor {
    /// Part kind.
    pub kind: FeatureKind,
    /// Offset from the body center; +Z is forward.
    pub offset: Vec3,
    /// Part size in world units.
    pub size: f32,
    /// Material variant.
    pub tint: Tint,
}

impl FeatureDescriptor {
    const fn new(kind: FeatureKind, offset: Vec3, size: f32, tint: Tint) -> Self {
        Self { kind, offset, size, tint }
    }
}

/// Builds the part list for a creature of body radius `size`.
///
/// Always emits a body and a mouth. Eyes and legs follow the trait counts
/// (capped at [`MAX_EYES`] and [`MAX_LEGS`]); a limbless creature gets a
/// pair of fins instead. Aggressive creatures grow spikes and fast ones a
/// tail.
#[must_use]
pub fn describe(traits: &CreatureTraits, size: f32) -> Vec<FeatureDescriptor> {
    let mut parts = Vec::with_capacity(
        4 + usize::from(traits.eyes.min(MAX_EYES)) + usize::from(traits.limbs.min(MAX_LEGS)) + 6,
    );

    parts.push(FeatureDescriptor::new(FeatureKind::Body, Vec3::ZERO, size, Tint::Base));

    // Eyes spread across the front upper quarter.
    let eyes = traits.eyes.min(MAX_EYES);
    for i in 0..eyes {
        let x = spread(i, eyes) * size * 0.5;
        parts.push(FeatureDescriptor::new(
            FeatureKind::Eye,
            Vec3::new(x, size * 0.4, size * 0.8),
            size * 0.15,
            Tint::Eye,
        ));
    }

    let limbs = traits.limbs.min(MAX_LEGS);
    if limbs == 0 {
        for side in [-1.0, 1.0] {
            parts.push(FeatureDescriptor::new(
                FeatureKind::Fin,
                Vec3::new(side * size, 0.0, 0.0),
                size * 0.5,
                Tint::Shade,
            ));
        }
    } else {
        // Alternate sides, front to back.
        let pairs = limbs.div_ceil(2);
        for i in 0..limbs {
            let side = if i % 2 == 0 { -1.0 } else { 1.0 };
            let z = spread(i / 2, pairs) * size * 0.8;
            parts.push(FeatureDescriptor::new(
                FeatureKind::Leg,
                Vec3::new(side * size * 0.7, -size * 0.8, z),
                size * 0.3,
                Tint::Shade,
            ));
        }
    }

    let mouth = match traits.diet {
        Diet::Herbivore => FeatureKind::Beak,
        Diet::Carnivore => FeatureKind::FangedJaw,
        Diet::Omnivore => FeatureKind::Jaw,
    };
    parts.push(FeatureDescriptor::new(
        mouth,
        Vec3::new(0.0, 0.0, size),
        size * 0.3,
        Tint::Bone,
    ));

    if traits.aggression >= SPIKE_AGGRESSION {
        let spikes = spike_count(traits.aggression);
        for i in 0..spikes {
            parts.push(FeatureDescriptor::new(
                FeatureKind::Spike,
                Vec3::new(0.0, size, spread(i, spikes) * size * 0.8),
                size * 0.2,
                Tint::Bone,
            ));
        }
    }

    if traits.speed >= TAIL_SPEED {
        parts.push(FeatureDescriptor::new(
            FeatureKind::Tail,
            Vec3::new(0.0, 0.0, -size),
            size * (0.4 + traits.speed * 0.6),
            Tint::Base,
        ));
    }

    parts
}

/// 2 spikes at the threshold, 6 at full aggression.
fn spike_count(aggression: f32) -> u8 {
    let t = ((aggression - SPIKE_AGGRESSION) / (1.0 - SPIKE_AGGRESSION)).clamp(0.0, 1.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let extra = (t * 4.0).round() as u8;
    2 + extra
}

/// Position of item `i` of `n` in `[-1, 1]`, centered.
fn spread(i: u8, n: u8) -> f32 {
    if n <= 1 {
        return 0.0;
    }
    f32::from(i) / f32::from(n - 1) * 2.0 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(parts: &[FeatureDescriptor], kind: FeatureKind) -> usize {
        parts.iter().filter(|p| p.kind == kind).count()
    }

    #[test]
    fn test_default_creature() {
        let parts = describe(&CreatureTraits::default(), 1.0);
        assert_eq!(count(&parts, FeatureKind::Body), 1);
        assert_eq!(count(&parts, FeatureKind::Eye), 2);
        assert_eq!(count(&parts, FeatureKind::Leg), 4);
        assert_eq!(count(&parts, FeatureKind::Beak), 1);
        assert_eq!(count(&parts, FeatureKind::Spike), 0);
        // Default speed sits on the tail threshold.
        assert_eq!(count(&parts, FeatureKind::Tail), 1);
    }

    #[test]
    fn test_limbless_gets_fins() {
        let traits = CreatureTraits { limbs: 0, ..CreatureTraits::default() };
        let parts = describe(&traits, 1.0);
        assert_eq!(count(&parts, FeatureKind::Leg), 0);
        assert_eq!(count(&parts, FeatureKind::Fin), 2);
    }

    #[test]
    fn test_mouth_by_diet() {
        for (diet, mouth) in [
            (Diet::Herbivore, FeatureKind::Beak),
            (Diet::Carnivore, FeatureKind::FangedJaw),
            (Diet::Omnivore, FeatureKind::Jaw),
        ] {
            let traits = CreatureTraits { diet, ..CreatureTraits::default() };
            assert_eq!(count(&describe(&traits, 1.0), mouth), 1);
        }
    }

    #[test]
    fn test_spikes_scale_with_aggression() {
        let mild = CreatureTraits { aggression: 0.59, ..CreatureTraits::default() };
        let angry = CreatureTraits { aggression: 1.0, ..CreatureTraits::default() };
        assert_eq!(count(&describe(&mild, 1.0), FeatureKind::Spike), 0);
        assert_eq!(count(&describe(&angry, 1.0), FeatureKind::Spike), 6);
    }

    #[test]
    fn test_counts_are_capped() {
        let traits = CreatureTraits { eyes: 200, limbs: 200, ..CreatureTraits::default() };
        let parts = describe(&traits, 1.0);
        assert_eq!(count(&parts, FeatureKind::Eye), usize::from(MAX_EYES));
        assert_eq!(count(&parts, FeatureKind::Leg), usize::from(MAX_LEGS));
    }

    #[test]
    fn test_pure() {
        let traits = CreatureTraits { aggression: 0.8, speed: 0.9, ..CreatureTraits::default() };
        assert_eq!(describe(&traits, 2.0), describe(&traits, 2.0));
    }
}
