//! # Batched Proxy Buffers
//!
//! One buffer per coarse category. Each buffer's capacity is split into
//! fixed partitions, one [`SlotAllocator`] per sub-category:
//!
//! ```text
//! creatures: [ all ................................. ]
//! plants:    [ land ......................| water .. ]
//! corpses:   [ fresh ..................| toxic ..... ]
//! ```
//!
//! A full partition never borrows from its neighbour. `add_or_update`
//! reports `false` and the caller draws nothing for that entity this tick.

use std::collections::HashMap;

use tracing::{debug, trace};
use verdant_core::SlotAllocator;
use verdant_shared::{
    CorpseTraits, EntityClass, EntityId, EntityRecord, Habitat, PlantTraits, Quaternion, Traits,
    Transform, Vec3,
};

use super::buffer::InstanceBuffer;
use super::instance_data::{hsv_to_rgb, ProxyInstance};
use crate::culling::{Camera, CullingEvaluator};

/// Which category a proxy buffer batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyKind {
    /// Creatures outside detail range.
    Creatures,
    /// Plants, split by habitat.
    Plants,
    /// Corpses, split by toxicity.
    Corpses,
}

impl ProxyKind {
    /// All kinds, in buffer order.
    pub const ALL: [Self; 3] = [Self::Creatures, Self::Plants, Self::Corpses];

    /// Position in [`Self::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Creatures => 0,
            Self::Plants => 1,
            Self::Corpses => 2,
        }
    }

    /// Buffer for an entity class.
    #[must_use]
    pub const fn for_class(class: EntityClass) -> Self {
        match class {
            EntityClass::Creature => Self::Creatures,
            EntityClass::Plant => Self::Plants,
            EntityClass::Corpse => Self::Corpses,
        }
    }

    /// Class batched by this buffer.
    #[must_use]
    pub const fn class(self) -> EntityClass {
        match self {
            Self::Creatures => EntityClass::Creature,
            Self::Plants => EntityClass::Plant,
            Self::Corpses => EntityClass::Corpse,
        }
    }

    /// Number of partitions.
    #[must_use]
    pub const fn partition_count(self) -> usize {
        match self {
            Self::Creatures => 1,
            Self::Plants | Self::Corpses => 2,
        }
    }

    /// GPU buffer label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Creatures => "proxy_creatures",
            Self::Plants => "proxy_plants",
            Self::Corpses => "proxy_corpses",
        }
    }
}

/// Counters for one proxy buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxyStats {
    /// `add_or_update` calls rejected because a partition was full.
    pub overflows: u64,
    /// Slots moved to another partition after a sub-category change.
    pub repartitions: u64,
    /// Proxies hidden by visibility refresh.
    pub hidden_by_refresh: u64,
    /// Proxies restored by visibility refresh.
    pub restored_by_refresh: u64,
}

/// One sub-category's share of the buffer.
#[derive(Debug)]
struct Partition {
    /// First buffer slot of the partition.
    base: u32,
    /// Allocator over partition-local indices.
    slots: SlotAllocator,
}

/// Tracked proxy.
#[derive(Debug, Clone, Copy)]
struct ProxyEntry {
    partition: usize,
    /// Partition-local index.
    local: u32,
    /// Buffer slot (`base + local`).
    slot: u32,
    position: Vec3,
    /// Last visible instance, kept so refresh can restore it.
    instance: ProxyInstance,
    visible: bool,
}

/// Fixed-capacity instance buffer plus partitioned slot allocators.
pub struct ProxyBuffer {
    kind: ProxyKind,
    buffer: InstanceBuffer,
    partitions: Vec<Partition>,
    entries: HashMap<EntityId, ProxyEntry>,
    /// Reverse map: buffer slot -> owning id.
    owners: Box<[Option<EntityId>]>,
    stats: ProxyStats,
}

impl ProxyBuffer {
    /// Creates a buffer with `capacity` slots split by `shares`.
    ///
    /// `shares` should have [`ProxyKind::partition_count`] entries; missing
    /// entries get nothing and extra entries are ignored. Every partition
    /// except the last gets `capacity * share` slots, rounded, and the last
    /// one takes the remainder.
    #[must_use]
    pub fn new(kind: ProxyKind, capacity: u32, shares: &[f32]) -> Self {
        let count = kind.partition_count();
        let mut partitions = Vec::with_capacity(count);
        let mut base = 0u32;
        for i in 0..count {
            let size = if i + 1 == count {
                capacity - base
            } else {
                let share = shares.get(i).copied().unwrap_or(0.0).clamp(0.0, 1.0);
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let size = (capacity as f32 * share).round() as u32;
                size.min(capacity - base)
            };
            partitions.push(Partition {
                base,
                slots: SlotAllocator::new(size),
            });
            base += size;
        }

        debug!(
            buffer = kind.label(),
            capacity,
            partitions = ?partitions.iter().map(|p| p.slots.capacity()).collect::<Vec<_>>(),
            "Proxy buffer created"
        );

        Self {
            kind,
            buffer: InstanceBuffer::new(kind.label(), capacity),
            partitions,
            entries: HashMap::new(),
            owners: vec![None; capacity as usize].into_boxed_slice(),
            stats: ProxyStats::default(),
        }
    }

    /// Category of this buffer.
    #[must_use]
    pub const fn kind(&self) -> ProxyKind {
        self.kind
    }

    /// Total slots.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.buffer.capacity()
    }

    /// Slots in partition `index`.
    #[must_use]
    pub fn partition_capacity(&self, index: usize) -> u32 {
        self.partitions.get(index).map_or(0, |p| p.slots.capacity())
    }

    /// Slots in use in partition `index`.
    #[must_use]
    pub fn partition_in_use(&self, index: usize) -> u32 {
        self.partitions.get(index).map_or(0, |p| p.slots.allocated_count())
    }

    /// Number of ids holding a slot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no id holds a slot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `id` holds a slot.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Buffer slot held by `id`.
    #[must_use]
    pub fn slot_of(&self, id: EntityId) -> Option<u32> {
        self.entries.get(&id).map(|e| e.slot)
    }

    /// Id holding buffer slot `slot`.
    #[must_use]
    pub fn slot_owner(&self, slot: u32) -> Option<EntityId> {
        self.owners.get(slot as usize).copied().flatten()
    }

    /// Whether `id` is currently drawn (holds a slot and was not hidden by
    /// visibility refresh).
    #[must_use]
    pub fn is_visible(&self, id: EntityId) -> bool {
        self.entries.get(&id).is_some_and(|e| e.visible)
    }

    /// Iterates `(id, slot)` pairs of drawn proxies.
    pub fn visible_slots(&self) -> impl Iterator<Item = (EntityId, u32)> + '_ {
        self.entries
            .iter()
            .filter(|(_, e)| e.visible)
            .map(|(id, e)| (*id, e.slot))
    }

    /// Staging buffer.
    #[must_use]
    pub const fn buffer(&self) -> &InstanceBuffer {
        &self.buffer
    }

    /// Staging buffer, for the flush phase.
    pub fn buffer_mut(&mut self) -> &mut InstanceBuffer {
        &mut self.buffer
    }

    /// Counters.
    #[must_use]
    pub const fn stats(&self) -> ProxyStats {
        self.stats
    }

    /// Adds or refreshes the proxy for `record`.
    ///
    /// On first sight a slot is acquired in the record's partition. Later
    /// calls only rewrite the instance, unless the record moved to another
    /// partition, in which case the old slot is released first. Returns
    /// `false` when the target partition is full or the record belongs to a
    /// different category; the entity then holds no slot.
    pub fn add_or_update(&mut self, record: &EntityRecord) -> bool {
        if record.class() != self.kind.class() {
            trace!(buffer = self.kind.label(), key = %record.key(), "Record class does not match buffer");
            return false;
        }
        let partition = partition_of(&record.traits);
        let instance = instance_for(record);

        if let Some(entry) = self.entries.get_mut(&record.id) {
            if entry.partition == partition {
                entry.position = record.position;
                entry.instance = instance;
                entry.visible = true;
                let slot = entry.slot;
                self.buffer.write(slot, instance);
                return true;
            }
            self.stats.repartitions += 1;
            self.remove(record.id);
        }

        let Some(target) = self.partitions.get_mut(partition) else {
            self.stats.overflows += 1;
            return false;
        };
        let Some(local) = target.slots.acquire() else {
            self.stats.overflows += 1;
            trace!(buffer = self.kind.label(), partition, id = record.id, "Proxy partition full");
            return false;
        };
        let slot = target.base + local;

        self.buffer.write(slot, instance);
        self.owners[slot as usize] = Some(record.id);
        self.entries.insert(
            record.id,
            ProxyEntry {
                partition,
                local,
                slot,
                position: record.position,
                instance,
                visible: true,
            },
        );
        true
    }

    /// Hides and releases the slot held by `id`.
    ///
    /// Returns `false` if `id` held no slot.
    pub fn remove(&mut self, id: EntityId) -> bool {
        let Some(entry) = self.entries.remove(&id) else {
            return false;
        };
        self.buffer.hide(entry.slot);
        self.owners[entry.slot as usize] = None;
        if let Some(partition) = self.partitions.get_mut(entry.partition) {
            partition.slots.release(entry.local);
        }
        true
    }

    /// Re-tests every held proxy against the camera.
    ///
    /// Proxies that left the view are written hidden, proxies that came
    /// back are restored. Slots stay held either way. `evaluator` must
    /// already be updated for `camera`. Returns the number of changes.
    pub fn refresh_visibility(&mut self, camera: &Camera, evaluator: &mut CullingEvaluator) -> u32 {
        let mut changed = 0;
        for entry in self.entries.values_mut() {
            let distance = camera.position.distance(entry.position);
            let visible = evaluator.classify(entry.position, distance).visible;
            if visible == entry.visible {
                continue;
            }
            entry.visible = visible;
            if visible {
                self.buffer.write(entry.slot, entry.instance);
                self.stats.restored_by_refresh += 1;
            } else {
                self.buffer.hide(entry.slot);
                self.stats.hidden_by_refresh += 1;
            }
            changed += 1;
        }
        changed
    }
}

/// Partition index for a record's traits.
fn partition_of(traits: &Traits) -> usize {
    match traits {
        Traits::Creature(_) | Traits::Plant(PlantTraits { habitat: Habitat::Land, .. }) => 0,
        Traits::Plant(PlantTraits { habitat: Habitat::Water, .. }) => 1,
        Traits::Corpse(c) => usize::from(c.is_toxic()),
    }
}

/// Instance for a record: heading from velocity, scale from size.
fn instance_for(record: &EntityRecord) -> ProxyInstance {
    let transform = Transform::new(
        record.position,
        Quaternion::facing(record.velocity_or_zero()),
        record.size,
    );
    ProxyInstance::new(&transform, color_of(&record.traits))
}

/// Category coloring.
fn color_of(traits: &Traits) -> [f32; 3] {
    match traits {
        Traits::Creature(c) => hsv_to_rgb(c.hue, 0.65, 0.9),
        Traits::Plant(p) => {
            let base = match p.habitat {
                Habitat::Land => [0.25, 0.62, 0.18],
                Habitat::Water => [0.12, 0.55, 0.52],
            };
            let k = 0.5 + 0.5 * p.maturity;
            base.map(|c| c * k)
        }
        Traits::Corpse(c) => corpse_color(c),
    }
}

fn corpse_color(corpse: &CorpseTraits) -> [f32; 3] {
    let base = if corpse.is_toxic() {
        [0.48, 0.58, 0.14]
    } else {
        [0.42, 0.28, 0.18]
    };
    let k = 1.0 - 0.6 * corpse.decay;
    base.map(|c| c * k)
}
