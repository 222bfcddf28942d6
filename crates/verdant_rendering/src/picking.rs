//! Pick-ray selection.
//!
//! Detailed renderers are tested first; proxies are only consulted when no
//! detailed renderer is hit. Every entity is treated as a sphere of radius
//! `size` around its position.

use verdant_shared::{EntityKey, EntityRecord, Vec3};

use crate::detail::{DetailFactory, DetailPool};
use crate::instancing::ProxyBuffer;
use crate::lod::RenderTier;

/// A ray in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point.
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    /// Creates a ray; `direction` is normalized.
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Distance along the ray to the first hit on a sphere, if any.
    ///
    /// A ray starting inside the sphere hits at distance zero.
    #[must_use]
    pub fn sphere_hit(&self, center: Vec3, radius: f32) -> Option<f32> {
        if radius <= 0.0 || self.direction == Vec3::ZERO {
            return None;
        }
        let to_center = center - self.origin;
        let along = to_center.dot(self.direction);
        let closest_sq = to_center.length_squared() - along * along;
        let radius_sq = radius * radius;
        if closest_sq > radius_sq {
            return None;
        }
        let half_chord = (radius_sq - closest_sq).sqrt();
        let near = along - half_chord;
        let far = along + half_chord;
        if far < 0.0 {
            None
        } else {
            Some(near.max(0.0))
        }
    }
}

/// Result of a selection query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    /// Selected entity.
    pub key: EntityKey,
    /// Its current record.
    pub record: EntityRecord,
    /// Tier it was hit in.
    pub tier: RenderTier,
    /// Distance along the ray.
    pub distance: f32,
}

/// Nearest visible detailed renderer on the ray.
pub fn pick_detailed<F: DetailFactory>(pool: &DetailPool<F>, ray: &Ray) -> Option<(EntityKey, f32)> {
    pool.iter()
        .filter(|(_, handle)| handle.is_visible())
        .filter_map(|(key, handle)| {
            let t = handle.transform();
            ray.sphere_hit(t.position, t.scale).map(|d| (key, d))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
}

/// Nearest drawn proxy on the ray, across all buffers.
pub fn pick_proxies(buffers: &[ProxyBuffer], ray: &Ray) -> Option<(EntityKey, f32)> {
    buffers
        .iter()
        .flat_map(|buffer| {
            let class = buffer.kind().class();
            buffer.visible_slots().filter_map(move |(id, slot)| {
                let instance = buffer.buffer().get(slot)?;
                let [x, y, z, scale] = instance.position_scale;
                ray.sphere_hit(Vec3::new(x, y, z), scale)
                    .map(|d| (EntityKey::new(class, id), d))
            })
        })
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
}
