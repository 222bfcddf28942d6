//! Instance data structures for GPU upload.

use bytemuck::{Pod, Zeroable};
use verdant_shared::Transform;

/// Per-instance data for one proxy slot.
///
/// Uploaded verbatim into the category's instance buffer and consumed by
/// the proxy vertex shader. A zero scale draws nothing.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ProxyInstance {
    /// World position (x, y, z) + uniform scale packed in w.
    pub position_scale: [f32; 4],
    /// Rotation quaternion (x, y, z, w).
    pub rotation: [f32; 4],
    /// RGBA tint.
    pub color: [f32; 4],
}

impl ProxyInstance {
    /// Size in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Degenerate instance written into released and hidden slots.
    pub const HIDDEN: Self = Self {
        position_scale: [0.0; 4],
        rotation: [0.0, 0.0, 0.0, 1.0],
        color: [0.0; 4],
    };

    /// Vertex attributes at locations 4..=6, after the proxy mesh's own.
    pub const ATTRIBS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        4 => Float32x4,  // position_scale
        5 => Float32x4,  // rotation
        6 => Float32x4,  // color
    ];

    /// Builds an instance from a transform and an RGB color.
    #[must_use]
    pub fn new(transform: &Transform, rgb: [f32; 3]) -> Self {
        let p = transform.position;
        Self {
            position_scale: [p.x, p.y, p.z, transform.scale],
            rotation: transform.rotation.to_array(),
            color: [rgb[0], rgb[1], rgb[2], 1.0],
        }
    }

    /// Uniform scale.
    #[inline]
    #[must_use]
    pub const fn scale(&self) -> f32 {
        self.position_scale[3]
    }

    /// True when the instance draws nothing.
    #[inline]
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.scale() == 0.0
    }

    /// Instance buffer layout descriptor.
    #[must_use]
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Converts HSV (all in `[0, 1]`) to linear RGB.
#[must_use]
pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> [f32; 3] {
    let h = hue.rem_euclid(1.0) * 6.0;
    let c = value * saturation;
    let x = c * (1.0 - ((h % 2.0) - 1.0).abs());
    let m = value - c;
    // Truncation picks the 60 degree sector.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [r + m, g + m, b + m]
}
