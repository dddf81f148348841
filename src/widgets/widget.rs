use std::any::Any;

use crate::components::{DrawData, TransformData};
use crate::context::SceneCx;
use crate::draw_key::DrawKey;
use crate::ecs::{Entity, World};
use crate::error::Result;
use crate::geometry::Vec2;
use crate::registry::RenderRegistry;
use crate::transform::Transform;
use crate::tree::WidgetId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as f32 / 255.0,
            g: ((hex >> 8) & 0xFF) as f32 / 255.0,
            b: (hex & 0xFF) as f32 / 255.0,
            a: 1.0,
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
}

impl Default for Color {
    fn default() -> Self {
        Self::TRANSPARENT
    }
}

/// Scalar properties every widget carries.
///
/// Mutate them through [`SceneCx::modify`] (or the `Scene` setters) so the
/// right dirty bits are raised; the tree stores the current values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetProps {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub width: f32,
    pub height: f32,
    /// Radians, about the z axis
    pub rotation: f32,
    pub scale: Vec2,
    /// Pivot for rotation and scale, relative to the widget's top-left corner
    pub origin: Vec2,
    /// Whether this widget clips itself and its descendants
    pub clip: bool,
    pub opacity: f32,
    pub visible: bool,
}

impl Default for WidgetProps {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            width: 0.0,
            height: 0.0,
            rotation: 0.0,
            scale: Vec2::ONE,
            origin: Vec2::ZERO,
            clip: false,
            opacity: 1.0,
            visible: true,
        }
    }
}

impl WidgetProps {
    pub fn sized(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_z(mut self, z: f32) -> Self {
        self.z = z;
        self
    }

    pub fn clipped(mut self, clip: bool) -> Self {
        self.clip = clip;
        self
    }

    pub(crate) fn pose_differs(&self, other: &WidgetProps) -> bool {
        self.x != other.x
            || self.y != other.y
            || self.z != other.z
            || self.rotation != other.rotation
            || self.scale != other.scale
            || self.origin != other.origin
    }

    pub(crate) fn size_differs(&self, other: &WidgetProps) -> bool {
        self.width != other.width || self.height != other.height
    }

    /// Copy the local pose into a transform component.
    pub(crate) fn write_pose(&self, data: &mut TransformData) {
        data.position = [self.x, self.y, self.z];
        data.rotation = self.rotation;
        data.scale = self.scale;
        data.origin = self.origin;
    }
}

/// Base trait for everything stored in the widget tree.
///
/// Capabilities are separate traits; a widget advertises the ones it has by
/// overriding the matching `as_*` query. A plain grouping widget implements
/// none of them.
pub trait Widget: Any {
    /// Widgets that position or size their children.
    fn as_layout(&mut self) -> Option<&mut dyn Layout> {
        None
    }

    /// Widgets that produce geometry.
    fn as_drawable(&mut self) -> Option<&mut dyn Drawable> {
        None
    }
}

/// Layout capability: invoked while the widget carries `NEEDS_WIDGET_UPDATE`.
///
/// A layout routine may change properties of its children or of itself; any
/// widget it dirties is picked up by the next iteration of the layout pass.
pub trait Layout {
    fn layout(&mut self, id: WidgetId, cx: &mut SceneCx<'_>);
}

/// Geometry-producing capability.
pub trait Drawable {
    /// Base draw key for this widget. Implementations usually cache it per
    /// type with [`RenderRegistry::material`].
    fn material(&self, registry: &mut RenderRegistry) -> Result<DrawKey>;

    /// Regenerate vertex bytes. Called while the widget carries
    /// `NEEDS_DRAWABLES_UPDATE`.
    fn rebuild_geometry(&mut self, cx: &mut GeometryCx<'_>);

    /// The draw system assigned a new clip region to this widget.
    fn on_clip_id_changed(&mut self, clip_id: u8, draw: &mut DrawData) {
        draw.key.set_clip(clip_id);
    }
}

/// Everything a [`Drawable`] sees while rebuilding its geometry.
pub struct GeometryCx<'a> {
    pub(crate) widget: WidgetId,
    pub(crate) entity: Entity,
    pub(crate) props: &'a WidgetProps,
    pub(crate) world: &'a mut World,
    pub(crate) registry: &'a RenderRegistry,
}

impl<'a> GeometryCx<'a> {
    pub fn widget(&self) -> WidgetId {
        self.widget
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn props(&self) -> &WidgetProps {
        self.props
    }

    pub fn registry(&self) -> &RenderRegistry {
        self.registry
    }

    /// World matrix computed by the transform system this frame.
    pub fn world_transform(&self) -> Transform {
        self.world
            .transforms
            .get(self.entity)
            .map(|t| t.world_xf)
            .unwrap_or_default()
    }

    pub fn draw_data(&mut self) -> Option<&mut DrawData> {
        self.world.draws.get_mut(self.entity)
    }

    /// Replace the vertex bytes with the raw bytes of `vertices`.
    pub fn set_vertices<V: bytemuck::Pod>(&mut self, vertices: &[V]) {
        if let Some(draw) = self.world.draws.get_mut(self.entity) {
            draw.vertex_bytes.clear();
            draw.vertex_bytes
                .extend_from_slice(bytemuck::cast_slice(vertices));
        }
    }

    /// Full access to the component store, for widgets that own helper
    /// entities.
    pub fn world_mut(&mut self) -> &mut World {
        self.world
    }
}
