//! Snapshot records produced by the simulation worker.
//!
//! A [`Snapshot`] carries the wire shape ([`RawEntityRecord`]), where every
//! attribute is optional because older and newer simulation builds emit
//! different subsets. The renderer converts each raw record into one
//! normalized [`EntityRecord`] with `TryFrom`; a record missing a required
//! field is rejected with a [`RecordError`] and never reaches the render core.

use crate::math::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Simulation-assigned identifier, unique within an [`EntityClass`].
pub type EntityId = u32;

/// Coarse entity class. Removal lists are delivered per class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityClass {
    /// Mobile organism.
    Creature,
    /// Stationary producer.
    Plant,
    /// Remains of a dead creature.
    Corpse,
}

impl EntityClass {
    /// All classes, in key order.
    pub const ALL: [Self; 3] = [Self::Creature, Self::Plant, Self::Corpse];

    /// Whether entities of this class may hold a detailed renderer.
    #[must_use]
    pub const fn supports_detail(self) -> bool {
        matches!(self, Self::Creature)
    }

    /// Lowercase name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Creature => "creature",
            Self::Plant => "plant",
            Self::Corpse => "corpse",
        }
    }
}

/// Identity of a tracked entity across frames.
///
/// Ordering is by class, then id. The render core iterates entities in this
/// order so that equal-distance ties resolve the same way every run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    /// Entity class.
    pub class: EntityClass,
    /// Id within the class.
    pub id: EntityId,
}

impl EntityKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(class: EntityClass, id: EntityId) -> Self {
        Self { class, id }
    }

    /// Creature key.
    #[must_use]
    pub const fn creature(id: EntityId) -> Self {
        Self::new(EntityClass::Creature, id)
    }

    /// Plant key.
    #[must_use]
    pub const fn plant(id: EntityId) -> Self {
        Self::new(EntityClass::Plant, id)
    }

    /// Corpse key.
    #[must_use]
    pub const fn corpse(id: EntityId) -> Self {
        Self::new(EntityClass::Corpse, id)
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.class.name(), self.id)
    }
}

/// Feeding strategy of a creature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diet {
    /// Eats plants.
    Herbivore,
    /// Eats creatures and corpses.
    Carnivore,
    /// Eats anything.
    Omnivore,
}

/// What a creature was doing during the simulation tick.
///
/// Drives the transient flags of a detailed renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    /// Standing still.
    #[default]
    Idle,
    /// Walking or swimming.
    Moving,
    /// Consuming food.
    Eating,
    /// Attacking another creature.
    Attacking,
    /// Reproducing.
    Mating,
}

/// Creature attributes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatureTraits {
    /// Feeding strategy.
    pub diet: Diet,
    /// Body hue in `[0, 1]`.
    pub hue: f32,
    /// Number of legs.
    pub limbs: u8,
    /// Number of eyes.
    pub eyes: u8,
    /// Normalized top speed in `[0, 1]`.
    pub speed: f32,
    /// Normalized aggression in `[0, 1]`.
    pub aggression: f32,
    /// Current activity.
    pub activity: Activity,
}

impl Default for CreatureTraits {
    fn default() -> Self {
        Self {
            diet: Diet::Herbivore,
            hue: 0.3,
            limbs: 4,
            eyes: 2,
            speed: 0.5,
            aggression: 0.0,
            activity: Activity::Idle,
        }
    }
}

/// Where a plant grows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Habitat {
    /// Grows on land.
    Land,
    /// Grows in water.
    Water,
}

/// Plant attributes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlantTraits {
    /// Habitat.
    pub habitat: Habitat,
    /// Foliage hue in `[0, 1]`.
    pub hue: f32,
    /// Growth stage in `[0, 1]`.
    pub maturity: f32,
}

/// Corpse attributes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorpseTraits {
    /// Toxicity in `[0, 1]`.
    pub toxicity: f32,
    /// Decay progress in `[0, 1]`.
    pub decay: f32,
}

impl CorpseTraits {
    /// Toxicity at or above which a corpse is rendered as toxic.
    pub const TOXIC_THRESHOLD: f32 = 0.5;

    /// Whether the corpse belongs to the toxic sub-category.
    #[must_use]
    pub fn is_toxic(&self) -> bool {
        self.toxicity >= Self::TOXIC_THRESHOLD
    }
}

/// Class-specific attributes of a normalized record.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Traits {
    /// Creature attributes.
    Creature(CreatureTraits),
    /// Plant attributes.
    Plant(PlantTraits),
    /// Corpse attributes.
    Corpse(CorpseTraits),
}

impl Traits {
    /// Class implied by the trait set.
    #[must_use]
    pub const fn class(&self) -> EntityClass {
        match self {
            Self::Creature(_) => EntityClass::Creature,
            Self::Plant(_) => EntityClass::Plant,
            Self::Corpse(_) => EntityClass::Corpse,
        }
    }
}

/// Normalized, validated entity record.
///
/// Copied into the renderer each tick; the renderer never mutates it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Id within the class.
    pub id: EntityId,
    /// World position.
    pub position: Vec3,
    /// Velocity, when the simulation reports one.
    pub velocity: Option<Vec3>,
    /// Body radius in world units.
    pub size: f32,
    /// Class-specific attributes.
    pub traits: Traits,
}

impl EntityRecord {
    /// Creates a record with no velocity.
    #[must_use]
    pub const fn new(id: EntityId, position: Vec3, size: f32, traits: Traits) -> Self {
        Self { id, position, velocity: None, size, traits }
    }

    /// Sets the velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = Some(velocity);
        self
    }

    /// Entity class.
    #[must_use]
    pub const fn class(&self) -> EntityClass {
        self.traits.class()
    }

    /// Tracking key.
    #[must_use]
    pub const fn key(&self) -> EntityKey {
        EntityKey::new(self.class(), self.id)
    }

    /// Creature attributes, if this is a creature.
    #[must_use]
    pub const fn creature(&self) -> Option<&CreatureTraits> {
        match &self.traits {
            Traits::Creature(t) => Some(t),
            _ => None,
        }
    }

    /// Velocity or zero.
    #[must_use]
    pub fn velocity_or_zero(&self) -> Vec3 {
        self.velocity.unwrap_or(Vec3::ZERO)
    }
}

/// Why a raw record could not be normalized.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// A required attribute was absent.
    #[error("record {id:?} is missing required field `{field}`")]
    MissingField {
        /// Id, when the id itself was present.
        id: Option<EntityId>,
        /// Name of the missing field.
        field: &'static str,
    },

    /// An attribute was present but unusable.
    #[error("record {id:?} has invalid `{field}`: {reason}")]
    InvalidValue {
        /// Id, when the id itself was present.
        id: Option<EntityId>,
        /// Name of the offending field.
        field: &'static str,
        /// What was wrong with it.
        reason: &'static str,
    },
}

/// Wire shape of a record as emitted by the simulation worker.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEntityRecord {
    /// Id within the class.
    pub id: Option<EntityId>,
    /// Entity class.
    pub class: Option<EntityClass>,
    /// World position.
    pub position: Option<[f32; 3]>,
    /// Velocity.
    pub velocity: Option<[f32; 3]>,
    /// Body radius.
    pub size: Option<f32>,
    /// Creature diet.
    pub diet: Option<Diet>,
    /// Creature or plant hue.
    pub hue: Option<f32>,
    /// Creature legs.
    pub limbs: Option<u8>,
    /// Creature eyes.
    pub eyes: Option<u8>,
    /// Creature speed.
    pub speed: Option<f32>,
    /// Creature aggression.
    pub aggression: Option<f32>,
    /// Creature activity.
    pub activity: Option<Activity>,
    /// Plant habitat.
    pub habitat: Option<Habitat>,
    /// Plant maturity.
    pub maturity: Option<f32>,
    /// Corpse toxicity.
    pub toxicity: Option<f32>,
    /// Corpse decay.
    pub decay: Option<f32>,
}

fn unit(value: Option<f32>, default: f32) -> f32 {
    match value {
        Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
        _ => default,
    }
}

impl TryFrom<RawEntityRecord> for EntityRecord {
    type Error = RecordError;

    fn try_from(raw: RawEntityRecord) -> Result<Self, Self::Error> {
        let id = raw.id.ok_or(RecordError::MissingField { id: None, field: "id" })?;
        let missing = |field| RecordError::MissingField { id: Some(id), field };
        let invalid = |field, reason| RecordError::InvalidValue { id: Some(id), field, reason };

        let class = raw.class.ok_or_else(|| missing("class"))?;
        let position = Vec3::from_array(raw.position.ok_or_else(|| missing("position"))?);
        if !position.is_finite() {
            return Err(invalid("position", "non-finite component"));
        }
        let size = raw.size.ok_or_else(|| missing("size"))?;
        if !size.is_finite() || size <= 0.0 {
            return Err(invalid("size", "must be finite and positive"));
        }
        // A broken velocity is dropped rather than rejecting the record.
        let velocity = raw.velocity.map(Vec3::from_array).filter(|v| v.is_finite());

        let traits = match class {
            EntityClass::Creature => Traits::Creature(CreatureTraits {
                diet: raw.diet.ok_or_else(|| missing("diet"))?,
                hue: unit(raw.hue, 0.3),
                limbs: raw.limbs.unwrap_or(4),
                eyes: raw.eyes.unwrap_or(2),
                speed: unit(raw.speed, 0.5),
                aggression: unit(raw.aggression, 0.0),
                activity: raw.activity.unwrap_or_default(),
            }),
            EntityClass::Plant => Traits::Plant(PlantTraits {
                habitat: raw.habitat.ok_or_else(|| missing("habitat"))?,
                hue: unit(raw.hue, 0.33),
                maturity: unit(raw.maturity, 1.0),
            }),
            EntityClass::Corpse => Traits::Corpse(CorpseTraits {
                toxicity: unit(Some(raw.toxicity.ok_or_else(|| missing("toxicity"))?), 0.0),
                decay: unit(raw.decay, 0.0),
            }),
        };

        Ok(Self { id, position, velocity, size, traits })
    }
}

impl From<&EntityRecord> for RawEntityRecord {
    fn from(record: &EntityRecord) -> Self {
        let mut raw = Self {
            id: Some(record.id),
            class: Some(record.class()),
            position: Some(record.position.to_array()),
            velocity: record.velocity.map(Vec3::to_array),
            size: Some(record.size),
            ..Self::default()
        };
        match record.traits {
            Traits::Creature(t) => {
                raw.diet = Some(t.diet);
                raw.hue = Some(t.hue);
                raw.limbs = Some(t.limbs);
                raw.eyes = Some(t.eyes);
                raw.speed = Some(t.speed);
                raw.aggression = Some(t.aggression);
                raw.activity = Some(t.activity);
            }
            Traits::Plant(t) => {
                raw.habitat = Some(t.habitat);
                raw.hue = Some(t.hue);
                raw.maturity = Some(t.maturity);
            }
            Traits::Corpse(t) => {
                raw.toxicity = Some(t.toxicity);
                raw.decay = Some(t.decay);
            }
        }
        raw
    }
}

/// Ids removed since the previous snapshot, one list per class.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemovedIds {
    /// Removed creatures.
    pub creatures: Vec<EntityId>,
    /// Removed plants.
    pub plants: Vec<EntityId>,
    /// Removed corpses.
    pub corpses: Vec<EntityId>,
}

impl RemovedIds {
    /// True when nothing was removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.creatures.is_empty() && self.plants.is_empty() && self.corpses.is_empty()
    }

    /// Adds a removed key to the matching list.
    pub fn push(&mut self, key: EntityKey) {
        match key.class {
            EntityClass::Creature => self.creatures.push(key.id),
            EntityClass::Plant => self.plants.push(key.id),
            EntityClass::Corpse => self.corpses.push(key.id),
        }
    }

    /// All removed keys.
    pub fn keys(&self) -> impl Iterator<Item = EntityKey> + '_ {
        let creatures = self.creatures.iter().map(|&id| EntityKey::creature(id));
        let plants = self.plants.iter().map(|&id| EntityKey::plant(id));
        let corpses = self.corpses.iter().map(|&id| EntityKey::corpse(id));
        creatures.chain(plants).chain(corpses)
    }
}

/// One completed simulation step, as seen by the renderer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Simulation tick that produced this snapshot.
    pub tick: u64,
    /// Live entities.
    pub records: Vec<RawEntityRecord>,
    /// Entities removed during this step.
    pub removed: RemovedIds,
}

impl Snapshot {
    /// Builds a snapshot from already-normalized records.
    #[must_use]
    pub fn from_records<'a>(tick: u64, records: impl IntoIterator<Item = &'a EntityRecord>) -> Self {
        Self {
            tick,
            records: records.into_iter().map(RawEntityRecord::from).collect(),
            removed: RemovedIds::default(),
        }
    }

    /// Sets the removal lists.
    #[must_use]
    pub fn with_removed(mut self, removed: RemovedIds) -> Self {
        self.removed = removed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creature_raw() -> RawEntityRecord {
        RawEntityRecord {
            id: Some(3),
            class: Some(EntityClass::Creature),
            position: Some([1.0, 0.0, 2.0]),
            size: Some(1.5),
            diet: Some(Diet::Carnivore),
            ..RawEntityRecord::default()
        }
    }

    #[test]
    fn test_normalize_fills_optional_defaults() {
        let record = EntityRecord::try_from(creature_raw()).unwrap();
        let traits = record.creature().unwrap();
        assert_eq!(record.key(), EntityKey::creature(3));
        assert_eq!(traits.limbs, 4);
        assert_eq!(traits.activity, Activity::Idle);
        assert!(record.velocity.is_none());
    }

    #[test]
    fn test_missing_position_rejected() {
        let raw = RawEntityRecord { position: None, ..creature_raw() };
        assert_eq!(
            EntityRecord::try_from(raw),
            Err(RecordError::MissingField { id: Some(3), field: "position" })
        );
    }

    #[test]
    fn test_missing_class_specific_field_rejected() {
        let raw = RawEntityRecord {
            id: Some(9),
            class: Some(EntityClass::Plant),
            position: Some([0.0; 3]),
            size: Some(1.0),
            ..RawEntityRecord::default()
        };
        let err = EntityRecord::try_from(raw).unwrap_err();
        assert_eq!(err, RecordError::MissingField { id: Some(9), field: "habitat" });
    }

    #[test]
    fn test_non_finite_size_rejected() {
        let raw = RawEntityRecord { size: Some(f32::NAN), ..creature_raw() };
        assert!(matches!(
            EntityRecord::try_from(raw),
            Err(RecordError::InvalidValue { field: "size", .. })
        ));
    }

    #[test]
    fn test_raw_round_trip_preserves_traits() {
        let record = EntityRecord::new(
            5,
            Vec3::new(4.0, 0.0, 4.0),
            0.8,
            Traits::Corpse(CorpseTraits { toxicity: 0.75, decay: 0.25 }),
        );
        let back = EntityRecord::try_from(RawEntityRecord::from(&record)).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_removed_keys_cover_every_class() {
        let mut removed = RemovedIds::default();
        removed.push(EntityKey::creature(1));
        removed.push(EntityKey::corpse(2));
        let keys: Vec<_> = removed.keys().collect();
        assert_eq!(keys, vec![EntityKey::creature(1), EntityKey::corpse(2)]);
    }

    #[test]
    fn test_snapshot_parses_from_toml() {
        let text = r#"
            tick = 12

            [[records]]
            id = 1
            class = "plant"
            position = [0.0, 0.0, 5.0]
            size = 0.5
            habitat = "water"

            [removed]
            corpses = [4, 5]
        "#;
        let snapshot: Snapshot = toml::from_str(text).unwrap();
        assert_eq!(snapshot.tick, 12);
        assert_eq!(snapshot.removed.corpses, vec![4, 5]);
        let record = EntityRecord::try_from(snapshot.records[0].clone()).unwrap();
        assert_eq!(record.key(), EntityKey::plant(1));
    }
}
