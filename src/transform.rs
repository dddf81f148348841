//! Affine transforms in homogeneous 4x4 form.

use crate::geometry::BBox;

/// Row-major 4x4 matrix mapping local coordinates into the parent's (and,
/// once composed down the tree, the root's) coordinate space.
///
/// Rotation only happens about the z axis. The z column carries the depth
/// offset accumulated along the hierarchy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    m: [[f32; 4]; 4],
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self::from_rows([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);

    pub const fn from_rows(m: [[f32; 4]; 4]) -> Self {
        Self { m }
    }

    /// Linear 2x2 part plus a translation, with an identity z axis.
    const fn affine(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32, tz: f32) -> Self {
        Self::from_rows([
            [a, b, 0.0, tx],
            [c, d, 0.0, ty],
            [0.0, 0.0, 1.0, tz],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn translate(x: f32, y: f32) -> Self {
        Self::translate_3d(x, y, 0.0)
    }

    pub fn translate_3d(x: f32, y: f32, z: f32) -> Self {
        Self::affine(1.0, 0.0, 0.0, 1.0, x, y, z)
    }

    /// Counter-clockwise rotation about z, in radians.
    pub fn rotate(radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self::affine(cos, -sin, sin, cos, 0.0, 0.0, 0.0)
    }

    pub fn scale_xy(sx: f32, sy: f32) -> Self {
        Self::affine(sx, 0.0, 0.0, sy, 0.0, 0.0, 0.0)
    }

    /// `self * other`: `other` is applied first.
    pub fn then(&self, other: &Transform) -> Transform {
        let mut m = [[0.0f32; 4]; 4];
        for (row, out) in self.m.iter().zip(m.iter_mut()) {
            for (col, cell) in out.iter_mut().enumerate() {
                *cell = (0..4).map(|k| row[k] * other.m[k][col]).sum();
            }
        }
        Transform { m }
    }

    /// Map a point on the local z = 0 plane.
    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        let [r0, r1, ..] = &self.m;
        (
            r0[0] * x + r0[1] * y + r0[3],
            r1[0] * x + r1[1] * y + r1[3],
        )
    }

    /// Axis-aligned bounds of the local rectangle `(0, 0)..(width, height)`
    /// after transformation.
    pub fn map_rect(&self, width: f32, height: f32) -> BBox {
        BBox::from_points(
            BBox::from_rect(0.0, 0.0, width, height)
                .corners()
                .map(|(x, y)| self.transform_point(x, y)),
        )
    }

    /// Depth of the local origin; larger is closer to the camera.
    pub fn depth(&self) -> f32 {
        self.m[2][3]
    }

    pub fn rows(&self) -> [[f32; 4]; 4] {
        self.m
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}
