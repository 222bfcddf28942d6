//! Frustum extraction and point containment.
//!
//! Planes come from the combined view-projection matrix (Gribb/Hartmann),
//! normals pointing inward, so a point is inside when every signed
//! distance is non-negative.

use verdant_shared::Vec3;

/// Inward-facing plane `normal · p + offset = 0`, normal of unit length.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Plane {
    /// Unit normal, pointing into the frustum.
    pub normal: Vec3,
    /// Signed offset along the normal.
    pub offset: f32,
}

impl Plane {
    /// Plane from raw coefficients, rescaled to a unit normal.
    ///
    /// A degenerate normal is kept as given.
    #[must_use]
    pub fn from_coefficients([a, b, c, d]: [f32; 4]) -> Self {
        let normal = Vec3::new(a, b, c);
        let len = normal.length();
        if len > f32::EPSILON {
            Self { normal: normal * len.recip(), offset: d / len }
        } else {
            Self { normal, offset: d }
        }
    }

    /// Signed distance of `p`; positive on the inside.
    #[inline]
    #[must_use]
    pub fn signed_distance(&self, p: Vec3) -> f32 {
        self.normal.dot(p) + self.offset
    }

    /// `[nx, ny, nz, offset]`
    #[must_use]
    pub const fn to_array(&self) -> [f32; 4] {
        [self.normal.x, self.normal.y, self.normal.z, self.offset]
    }
}

/// Which clip-space bound a plane comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// `x >= -w`
    Left = 0,
    /// `x <= w`
    Right = 1,
    /// `y >= -w`
    Bottom = 2,
    /// `y <= w`
    Top = 3,
    /// `z >= -w`
    Near = 4,
    /// `z <= w`
    Far = 5,
}

impl Side {
    /// All sides, in plane order.
    pub const ALL: [Self; 6] = [Self::Left, Self::Right, Self::Bottom, Self::Top, Self::Near, Self::Far];

    /// Clip row this side bounds and whether the row is added to or
    /// subtracted from `w`.
    const fn clip_row(self) -> (usize, f32) {
        match self {
            Self::Left => (0, 1.0),
            Self::Right => (0, -1.0),
            Self::Bottom => (1, 1.0),
            Self::Top => (1, -1.0),
            Self::Near => (2, 1.0),
            Self::Far => (2, -1.0),
        }
    }
}

/// Camera view volume.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Frustum {
    /// Extracts the six planes of a view-projection matrix.
    ///
    /// The matrix is column-major (`m[column][row]`) with GL clip
    /// conventions: a point is inside when `-w <= x, y, z <= w`.
    #[must_use]
    pub fn from_view_projection(m: &[[f32; 4]; 4]) -> Self {
        let planes = Side::ALL.map(|side| {
            let (row, sign) = side.clip_row();
            Plane::from_coefficients(std::array::from_fn(|col| m[col][3] + sign * m[col][row]))
        });
        Self { planes }
    }

    /// Plane for `side`.
    #[must_use]
    pub const fn plane(&self, side: Side) -> &Plane {
        &self.planes[side as usize]
    }

    /// Whether `point` lies inside or on every plane.
    #[must_use]
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|plane| plane.signed_distance(point) >= 0.0)
    }

    /// Planes as `[nx, ny, nz, offset]` rows, for a culling uniform.
    #[must_use]
    pub fn to_arrays(&self) -> [[f32; 4]; 6] {
        self.planes.map(|p| p.to_array())
    }
}
