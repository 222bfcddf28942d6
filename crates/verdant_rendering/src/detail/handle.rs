//! Detailed renderer object checked out from the pool.

use std::f32::consts::TAU;

use verdant_shared::{Activity, EntityKey, EntityRecord, Quaternion, Transform, Vec3};

use super::features::FeatureKind;
use super::registry::{GeometryId, MaterialId};

/// One drawable part of a detailed renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshPart {
    /// Part kind.
    pub kind: FeatureKind,
    /// Shared geometry.
    pub geometry: GeometryId,
    /// Shared material.
    pub material: MaterialId,
    /// Offset from the body center.
    pub offset: Vec3,
}

/// Per-instance animation timers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnimationState {
    /// Gait cycle phase in `[0, TAU)`.
    pub phase: f32,
    /// Seconds since this occupant was bound.
    pub elapsed: f32,
    /// Seconds the current transient action has been running.
    pub action_time: f32,
}

/// Short-lived behavior flags driven by the creature's activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransientFlags {
    /// Eating animation.
    pub eating: bool,
    /// Attack animation.
    pub attacking: bool,
    /// Mating display.
    pub mating: bool,
}

impl TransientFlags {
    /// Flags for an activity.
    #[must_use]
    pub const fn from_activity(activity: Activity) -> Self {
        Self {
            eating: matches!(activity, Activity::Eating),
            attacking: matches!(activity, Activity::Attacking),
            mating: matches!(activity, Activity::Mating),
        }
    }

    /// Whether any flag is set.
    #[must_use]
    pub const fn any(self) -> bool {
        self.eating || self.attacking || self.mating
    }
}

/// A detailed renderer: part list, transform, and animation state.
///
/// Bound to at most one entity at a time. [`DetailHandle::reset`] returns
/// it to a neutral state before it is rebound.
#[derive(Debug, Clone)]
pub struct DetailHandle {
    serial: u64,
    occupant: Option<EntityKey>,
    parts: Vec<MeshPart>,
    transform: Transform,
    visible: bool,
    moving: bool,
    gait_rate: f32,
    animation: AnimationState,
    flags: TransientFlags,
}

impl DetailHandle {
    /// Creates an empty, hidden handle. `serial` identifies the object for
    /// its whole life, across recycling.
    #[must_use]
    pub fn new(serial: u64) -> Self {
        Self {
            serial,
            occupant: None,
            parts: Vec::new(),
            transform: Transform::HIDDEN,
            visible: false,
            moving: false,
            gait_rate: 0.0,
            animation: AnimationState::default(),
            flags: TransientFlags::default(),
        }
    }

    /// Construction serial.
    #[must_use]
    pub const fn serial(&self) -> u64 {
        self.serial
    }

    /// Entity currently bound.
    #[must_use]
    pub const fn occupant(&self) -> Option<EntityKey> {
        self.occupant
    }

    /// Drawable parts.
    #[must_use]
    pub fn parts(&self) -> &[MeshPart] {
        &self.parts
    }

    /// World transform.
    #[must_use]
    pub const fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Whether the mesh is drawn.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Animation timers.
    #[must_use]
    pub const fn animation(&self) -> &AnimationState {
        &self.animation
    }

    /// Transient flags.
    #[must_use]
    pub const fn flags(&self) -> TransientFlags {
        self.flags
    }

    /// Neutral state: unbound, hidden, no parts, zeroed timers, no flags.
    ///
    /// The part list keeps its allocation.
    pub fn reset(&mut self) {
        self.occupant = None;
        self.parts.clear();
        self.transform = Transform::HIDDEN;
        self.visible = false;
        self.moving = false;
        self.gait_rate = 0.0;
        self.animation = AnimationState::default();
        self.flags = TransientFlags::default();
    }

    /// Binds the handle to `key` with a fresh part list.
    pub fn bind(&mut self, key: EntityKey, parts: impl IntoIterator<Item = MeshPart>) {
        self.occupant = Some(key);
        self.parts.clear();
        self.parts.extend(parts);
    }

    /// Rewrites transform and flags from the latest record and shows the mesh.
    pub fn apply_record(&mut self, record: &EntityRecord) {
        let velocity = record.velocity_or_zero();
        self.transform = Transform::new(record.position, Quaternion::facing(velocity), record.size);
        self.visible = true;

        let (activity, speed) = record
            .creature()
            .map_or((Activity::Idle, 0.0), |c| (c.activity, c.speed));
        let flags = TransientFlags::from_activity(activity);
        if flags != self.flags {
            self.animation.action_time = 0.0;
        }
        self.flags = flags;
        self.moving = matches!(activity, Activity::Moving) || velocity.length_squared() > 1e-4;
        self.gait_rate = if self.moving { 2.0 + 6.0 * speed } else { 0.5 };
    }

    /// Hides the mesh without unbinding.
    pub fn hide(&mut self) {
        self.visible = false;
    }

    /// Advances animation timers by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.animation.elapsed += dt;
        self.animation.phase = (self.animation.phase + dt * self.gait_rate).rem_euclid(TAU);
        if self.flags.any() {
            self.animation.action_time += dt;
        }
    }
}
