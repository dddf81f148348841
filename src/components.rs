//! Per-entity component types shared by the transform and draw systems.

use bitflags::bitflags;

use crate::draw_key::DrawKey;
use crate::geometry::{BBox, Vec2};
use crate::transform::Transform;
use crate::tree::WidgetId;

/// Local pose plus the cached world-space results derived from it.
///
/// `world_xf` and `bbox` are only meaningful while `valid` is true. Both are
/// written exclusively by the transform system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformData {
    pub position: [f32; 3],
    /// Rotation about the z axis, in radians
    pub rotation: f32,
    pub scale: Vec2,
    /// Pivot for rotation and scale, in local coordinates
    pub origin: Vec2,
    pub valid: bool,
    pub world_xf: Transform,
    pub bbox: BBox,
}

impl Default for TransformData {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: 0.0,
            scale: Vec2::ONE,
            origin: Vec2::ZERO,
            valid: false,
            world_xf: Transform::IDENTITY,
            bbox: BBox::default(),
        }
    }
}

impl TransformData {
    /// `T(position) · T(origin) · R(rotation) · S(scale) · T(-origin)`
    pub fn local_matrix(&self) -> Transform {
        let [x, y, z] = self.position;
        let o = self.origin;
        Transform::translate_3d(x, y, z)
            .then(&Transform::translate(o.x, o.y))
            .then(&Transform::rotate(self.rotation))
            .then(&Transform::scale_xy(self.scale.x, self.scale.y))
            .then(&Transform::translate(-o.x, -o.y))
    }

    /// World depth of this entity; larger values are closer to the camera.
    pub fn depth(&self) -> f32 {
        self.world_xf.depth()
    }
}

bitflags! {
    /// Dirty bits. Each system clears the bits it owns after acting on them.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct UpdateFlags: u8 {
        /// The widget's own layout routine must run
        const NEEDS_WIDGET_UPDATE     = 0b001;
        /// World transform and bounding box are stale
        const NEEDS_TRANSFORM_UPDATE  = 0b010;
        /// Vertex data must be regenerated
        const NEEDS_DRAWABLES_UPDATE  = 0b100;
    }
}

/// Dirty bits plus the non-owning back-reference to the widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateData {
    pub flags: UpdateFlags,
    pub widget: WidgetId,
}

impl UpdateData {
    pub fn new(widget: WidgetId, flags: UpdateFlags) -> Self {
        Self { flags, widget }
    }
}

/// Render-state key and vertex bytes of one drawable entity.
///
/// Vertex bytes are regenerated wholesale whenever geometry changes; they are
/// never patched in place.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawData {
    pub key: DrawKey,
    pub vertex_bytes: Vec<u8>,
    pub visible: bool,
}

impl Default for DrawData {
    fn default() -> Self {
        Self {
            key: DrawKey::default(),
            vertex_bytes: Vec::new(),
            visible: true,
        }
    }
}

impl DrawData {
    pub fn new(key: DrawKey) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }
}

/// One merged GPU draw call, rebuilt every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderData {
    pub key: DrawKey,
    /// Concatenated vertex bytes of every merged item, in draw order
    pub vertex_bytes: Vec<u8>,
    /// `vertex_bytes.len()` divided by the geometry layout stride
    pub vertex_count: u32,
    /// Number of draw items merged into this call
    pub item_count: u32,
}
