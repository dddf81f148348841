use crate::draw_key::{DrawKey, KeyField};
use crate::error::Result;
use crate::registry::RenderRegistry;

use super::{Color, Drawable, GeometryCx, Widget};

/// Vertex of a solid-colour quad, in world space.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RectVertex {
    /// x, y in scene pixels; z is the world depth
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl RectVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<RectVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // color
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Block size of the rectangle vertex buffer (64 KiB, ~390 rectangles per call).
pub const RECT_BLOCK_SIZE: usize = 64 * 1024;

/// A filled axis-aligned rectangle covering the widget's local rect.
///
/// Emits two triangles transformed by the world matrix. The draw item is
/// opaque when `color.a * opacity` is 1 and transparent otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    color: Color,
}

impl Rectangle {
    pub fn new(color: Color) -> Self {
        Self { color }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Change the fill colour. Callers must request a redraw of the widget.
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }
}

pub fn rectangle(color: Color) -> Rectangle {
    Rectangle::new(color)
}

impl Widget for Rectangle {
    fn as_drawable(&mut self) -> Option<&mut dyn Drawable> {
        Some(self)
    }
}

impl Drawable for Rectangle {
    fn material(&self, registry: &mut RenderRegistry) -> Result<DrawKey> {
        registry.material::<Rectangle>(|reg| {
            let shader = reg.register_shader("rectangle", include_str!("shaders/rectangle.wgsl"))?;
            let layout = reg.register_geometry_layout("rectangle", RectVertex::desc(), RECT_BLOCK_SIZE)?;
            let blend = reg.register_blend("alpha", wgpu::BlendState::ALPHA_BLENDING)?;
            let primitive = RenderRegistry::primitive_id(wgpu::PrimitiveTopology::TriangleList);
            Ok(DrawKey::default()
                .with(KeyField::Primitive, primitive as u64)
                .with(KeyField::Shader, shader as u64)
                .with(KeyField::GeometryLayout, layout as u64)
                .with(KeyField::Blend, blend as u64))
        })
    }

    fn rebuild_geometry(&mut self, cx: &mut GeometryCx<'_>) {
        let props = *cx.props();
        let world = cx.world_transform();
        let z = world.depth();

        let mut color = self.color.to_array();
        color[3] *= props.opacity.clamp(0.0, 1.0);

        let corner = |x: f32, y: f32| {
            let (wx, wy) = world.transform_point(x, y);
            RectVertex {
                position: [wx, wy, z],
                color,
            }
        };
        let tl = corner(0.0, 0.0);
        let tr = corner(props.width, 0.0);
        let br = corner(props.width, props.height);
        let bl = corner(0.0, props.height);

        cx.set_vertices(&[tl, bl, tr, tr, bl, br]);
        if let Some(draw) = cx.draw_data() {
            draw.key.set_transparent(color[3] < 1.0);
        }
    }
}
