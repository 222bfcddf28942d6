//! Shared geometry and material ids for detailed renderers.
//!
//! Keys are quantized so that creatures with nearly identical traits share
//! GPU resources. The registry is an owned value handed to the factory.

use std::collections::HashMap;

use super::features::{FeatureKind, Tint};

/// Size quantization step in world units.
pub const SIZE_STEP: f32 = 0.25;
/// Number of hue buckets.
pub const HUE_BUCKETS: u8 = 32;

/// Interned geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(pub u32);

/// Interned material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

/// Geometry identity: part shape and quantized size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryKey {
    /// Part shape.
    pub shape: FeatureKind,
    /// Size in [`SIZE_STEP`] units, at least 1.
    pub size_steps: u16,
}

impl GeometryKey {
    /// Quantizes `size`.
    #[must_use]
    pub fn new(shape: FeatureKind, size: f32) -> Self {
        let steps = if size.is_finite() { (size / SIZE_STEP).round() } else { 1.0 };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let size_steps = steps.clamp(1.0, f32::from(u16::MAX)) as u16;
        Self { shape, size_steps }
    }

    /// Size this key stands for.
    #[must_use]
    pub fn size(&self) -> f32 {
        f32::from(self.size_steps) * SIZE_STEP
    }
}

/// Material identity: quantized hue and tint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialKey {
    /// Hue bucket in `0..HUE_BUCKETS`. Zero for hue-independent tints.
    pub hue_bucket: u8,
    /// Material variant.
    pub tint: Tint,
}

impl MaterialKey {
    /// Quantizes `hue`.
    #[must_use]
    pub fn new(hue: f32, tint: Tint) -> Self {
        let hue_bucket = match tint {
            Tint::Base | Tint::Shade => {
                let h = if hue.is_finite() { hue.rem_euclid(1.0) } else { 0.0 };
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let bucket = (h * f32::from(HUE_BUCKETS)) as u8;
                bucket.min(HUE_BUCKETS - 1)
            }
            Tint::Bone | Tint::Eye => 0,
        };
        Self { hue_bucket, tint }
    }
}

/// Interning registry for detailed-renderer resources.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    geometries: Vec<GeometryKey>,
    geometry_ids: HashMap<GeometryKey, GeometryId>,
    materials: Vec<MaterialKey>,
    material_ids: HashMap<MaterialKey, MaterialId>,
}

impl AssetRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for a part geometry, registering it on first use.
    pub fn geometry(&mut self, shape: FeatureKind, size: f32) -> GeometryId {
        let key = GeometryKey::new(shape, size);
        if let Some(id) = self.geometry_ids.get(&key) {
            return *id;
        }
        let id = GeometryId(u32::try_from(self.geometries.len()).unwrap_or(u32::MAX));
        self.geometries.push(key);
        self.geometry_ids.insert(key, id);
        id
    }

    /// Id for a material, registering it on first use.
    pub fn material(&mut self, hue: f32, tint: Tint) -> MaterialId {
        let key = MaterialKey::new(hue, tint);
        if let Some(id) = self.material_ids.get(&key) {
            return *id;
        }
        let id = MaterialId(u32::try_from(self.materials.len()).unwrap_or(u32::MAX));
        self.materials.push(key);
        self.material_ids.insert(key, id);
        id
    }

    /// Key behind a geometry id.
    #[must_use]
    pub fn geometry_key(&self, id: GeometryId) -> Option<&GeometryKey> {
        self.geometries.get(id.0 as usize)
    }

    /// Key behind a material id.
    #[must_use]
    pub fn material_key(&self, id: MaterialId) -> Option<&MaterialKey> {
        self.materials.get(id.0 as usize)
    }

    /// Registered geometries.
    #[must_use]
    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Registered materials.
    #[must_use]
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
}
