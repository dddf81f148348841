//! Wireframe overlays for bounding boxes and clip regions.
//!
//! Each outline is its own short-lived entity carrying line-list geometry. The
//! entities are collected and batched like any other draw item and torn down
//! at the start of the next frame.

use crate::components::{DrawData, TransformData};
use crate::draw_key::{DrawKey, KeyField};
use crate::ecs::{Entity, World};
use crate::error::Result;
use crate::geometry::BBox;
use crate::registry::RenderRegistry;
use crate::transform::Transform;
use crate::widgets::Color;

pub const BOUNDING_BOX_COLOR: Color = Color::rgb(0.1, 0.9, 0.2);
pub const CLIP_OUTLINE_COLOR: Color = Color::rgb(0.95, 0.2, 0.2);

/// Block size of the debug line buffer.
const DEBUG_BLOCK_SIZE: usize = 256 * 1024;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DebugVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl DebugVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<DebugVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Line-list material shared by every outline, registered on first use.
pub fn debug_material(registry: &mut RenderRegistry) -> Result<DrawKey> {
    registry.material::<DebugVertex>(|reg| {
        let shader = reg.register_shader("debug_lines", include_str!("shaders/debug_lines.wgsl"))?;
        let layout = reg.register_geometry_layout("debug_lines", DebugVertex::desc(), DEBUG_BLOCK_SIZE)?;
        let primitive = RenderRegistry::primitive_id(wgpu::PrimitiveTopology::LineList);
        Ok(DrawKey::default()
            .with(KeyField::Primitive, primitive as u64)
            .with(KeyField::Shader, shader as u64)
            .with(KeyField::GeometryLayout, layout as u64))
    })
}

/// The four edges of `bbox` as eight line-list vertices.
pub fn outline(bbox: &BBox, color: Color, z: f32) -> [DebugVertex; 8] {
    let color = color.to_array();
    let v = |x: f32, y: f32| DebugVertex {
        position: [x, y, z],
        color,
    };
    let (tl, tr) = (v(bbox.x0, bbox.y0), v(bbox.x1, bbox.y0));
    let (br, bl) = (v(bbox.x1, bbox.y1), v(bbox.x0, bbox.y1));
    [tl, tr, tr, br, br, bl, bl, tl]
}

/// Spawn one outline entity per box, appending them to `out`.
pub(crate) fn spawn_outlines<'a>(
    world: &mut World,
    key: DrawKey,
    boxes: impl IntoIterator<Item = (&'a BBox, f32)>,
    color: Color,
    out: &mut Vec<Entity>,
) {
    for (bbox, z) in boxes {
        let entity = world.spawn();
        let mut draw = DrawData::new(key);
        draw.vertex_bytes
            .extend_from_slice(bytemuck::cast_slice(&outline(bbox, color, z)));
        world.transforms.insert(
            entity,
            TransformData {
                position: [0.0, 0.0, z],
                valid: true,
                world_xf: Transform::translate_3d(0.0, 0.0, z),
                bbox: *bbox,
                ..TransformData::default()
            },
        );
        world.draws.insert(entity, draw);
        out.push(entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outline_closes_the_loop() {
        let vertices = outline(&BBox::new(1.0, 2.0, 3.0, 4.0), Color::WHITE, 0.0);
        assert_eq!(vertices[0].position, [1.0, 2.0, 0.0]);
        assert_eq!(vertices[7].position, vertices[0].position);
        assert_eq!(vertices[3].position, [3.0, 4.0, 0.0]);
    }

    #[test]
    fn test_debug_material_is_a_line_list() {
        let mut reg = RenderRegistry::new();
        let key = debug_material(&mut reg).unwrap();
        assert_eq!(
            RenderRegistry::primitive_topology(key.primitive()),
            Some(wgpu::PrimitiveTopology::LineList)
        );
        assert_eq!(debug_material(&mut reg).unwrap(), key);
        assert_eq!(reg.geometry_layout(key.geometry_layout()).unwrap().array_stride, 28);
    }

    #[test]
    fn test_spawned_outlines_are_collectable() {
        let mut reg = RenderRegistry::new();
        let key = debug_material(&mut reg).unwrap();
        let mut world = World::new();
        let mut spawned = Vec::new();
        let boxes = [BBox::new(0.0, 0.0, 5.0, 5.0), BBox::new(1.0, 1.0, 2.0, 2.0)];
        spawn_outlines(&mut world, key, boxes.iter().map(|b| (b, 0.0)), Color::WHITE, &mut spawned);

        assert_eq!(spawned.len(), 2);
        for entity in spawned {
            assert!(world.transforms.contains(entity));
            assert_eq!(world.draws.get(entity).unwrap().vertex_bytes.len(), 8 * 28);
        }
    }
}
