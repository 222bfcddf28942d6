//! Read-only camera state.
//!
//! Matrices are column-major (`m[column][row]`) with GL clip conventions,
//! matching [`Frustum::from_view_projection`](super::Frustum::from_view_projection).

use verdant_shared::Vec3;

/// Column-major 4x4 matrix.
pub type Mat4 = [[f32; 4]; 4];

/// Identity matrix.
pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Camera position plus view and projection matrices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Eye position in world space.
    pub position: Vec3,
    /// World-to-view transform.
    pub view: Mat4,
    /// View-to-clip transform.
    pub projection: Mat4,
}

impl Camera {
    /// Creates a camera from explicit matrices.
    #[must_use]
    pub const fn new(position: Vec3, view: Mat4, projection: Mat4) -> Self {
        Self { position, view, projection }
    }

    /// Right-handed look-at camera with a 60 degree vertical field of view.
    #[must_use]
    pub fn looking_at(eye: Vec3, target: Vec3, aspect: f32, near: f32, far: f32) -> Self {
        Self::new(
            eye,
            look_at(eye, target, Vec3::Y),
            perspective(std::f32::consts::FRAC_PI_3, aspect, near, far),
        )
    }

    /// Combined `projection * view`.
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        multiply(&self.projection, &self.view)
    }
}

/// `a * b` for column-major matrices.
#[must_use]
pub fn multiply(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0; 4]; 4];
    for (col, out_col) in out.iter_mut().enumerate() {
        for (row, cell) in out_col.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[k][row] * b[col][k]).sum();
        }
    }
    out
}

/// GL perspective projection (clip z in `[-w, w]`).
#[must_use]
pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let f = 1.0 / (fov_y * 0.5).tan();
    let range = near - far;
    [
        [f / aspect, 0.0, 0.0, 0.0],
        [0.0, f, 0.0, 0.0],
        [0.0, 0.0, (far + near) / range, -1.0],
        [0.0, 0.0, 2.0 * far * near / range, 0.0],
    ]
}

/// Right-handed view matrix looking from `eye` toward `target`.
#[must_use]
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    let f = (target - eye).normalize_or_zero();
    let s = f.cross(up).normalize_or_zero();
    let u = s.cross(f);
    [
        [s.x, u.x, -f.x, 0.0],
        [s.y, u.y, -f.y, 0.0],
        [s.z, u.z, -f.z, 0.0],
        [-s.dot(eye), -u.dot(eye), f.dot(eye), 1.0],
    ]
}
