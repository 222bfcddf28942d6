//! Vector and transform types carried in snapshot records.
//!
//! All types are `#[repr(C)]` and `Pod` so they can be copied straight into
//! instance data.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// World-space position, velocity or direction.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component (up)
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vec3 {
    /// Origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// +X.
    pub const X: Self = Self::new(1.0, 0.0, 0.0);

    /// World up.
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);

    /// Creates a vector.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// `[x, y, z]`
    #[must_use]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// From `[x, y, z]`.
    #[must_use]
    pub const fn from_array([x, y, z]: [f32; 3]) -> Self {
        Self::new(x, y, z)
    }

    /// Dot product.
    #[must_use]
    pub fn dot(self, rhs: Self) -> f32 {
        self.x.mul_add(rhs.x, self.y.mul_add(rhs.y, self.z * rhs.z))
    }

    /// Right-handed cross product.
    #[must_use]
    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    /// Squared length.
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Euclidean distance to `other`. This is the distance the tier
    /// thresholds are compared against.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Unit vector in the same direction, or zero for a zero-length input.
    #[must_use]
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len > f32::EPSILON {
            self * len.recip()
        } else {
            Self::ZERO
        }
    }

    /// True when every component is finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }
}

/// Unit quaternion. Only heading rotations are produced by this crate.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Quaternion {
    /// i
    pub x: f32,
    /// j
    pub y: f32,
    /// k
    pub z: f32,
    /// Real part
    pub w: f32,
}

impl Quaternion {
    /// No rotation.
    pub const IDENTITY: Self = Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    /// Rotation of `yaw` radians about world up.
    #[must_use]
    pub fn from_yaw(yaw: f32) -> Self {
        let (sin, cos) = (yaw * 0.5).sin_cos();
        Self { x: 0.0, y: sin, z: 0.0, w: cos }
    }

    /// Heading that faces along the horizontal part of `velocity`.
    ///
    /// Identity when there is no horizontal motion.
    #[must_use]
    pub fn facing(velocity: Vec3) -> Self {
        if velocity.x.abs() <= f32::EPSILON && velocity.z.abs() <= f32::EPSILON {
            return Self::IDENTITY;
        }
        Self::from_yaw(velocity.x.atan2(velocity.z))
    }

    /// `[x, y, z, w]`, the order the shaders expect.
    #[must_use]
    pub const fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Placement of one drawn entity.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Transform {
    /// World position.
    pub position: Vec3,
    /// Uniform scale. Zero draws nothing.
    pub scale: f32,
    /// Heading.
    pub rotation: Quaternion,
}

impl Transform {
    /// Degenerate transform written into slots that must not draw.
    pub const HIDDEN: Self = Self::new(Vec3::ZERO, Quaternion::IDENTITY, 0.0);

    /// Creates a transform.
    #[must_use]
    pub const fn new(position: Vec3, rotation: Quaternion, scale: f32) -> Self {
        Self { position, scale, rotation }
    }
}
