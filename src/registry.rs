//! Render-state registries.
//!
//! Every render-state selector that ends up in a [`DrawKey`] is registered
//! here once and referred to by a small integer id afterwards. Each registry is
//! bounded by the bit width of its key field, so an id handed out here always
//! fits its field.
//!
//! The registry is an explicit object built at application start and passed
//! to the renderer; widget types cache their base key with
//! [`RenderRegistry::material`] instead of keeping process-wide statics.

use std::any::TypeId;
use std::collections::HashMap;

use crate::draw_key::{DrawKey, KeyField};
use crate::error::{Result, SceneError};

/// Upper bound for a geometry layout's buffer block size (2 MiB).
pub const MAX_GEOMETRY_BUFFER_BYTES: usize = 2 * 1024 * 1024;

/// Opaque handle to a texture owned by the render stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderDesc {
    pub label: String,
    /// WGSL source
    pub source: String,
}

/// Vertex format and buffer sizing for one geometry layout.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryLayout {
    pub label: String,
    pub array_stride: wgpu::BufferAddress,
    pub step_mode: wgpu::VertexStepMode,
    pub attributes: Vec<wgpu::VertexAttribute>,
    /// Capacity in bytes of one destination buffer; no merged draw call may exceed it
    pub block_size: usize,
}

impl GeometryLayout {
    pub fn vertex_buffer_layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: self.step_mode,
            attributes: &self.attributes,
        }
    }

    /// Number of whole vertices in `bytes` bytes of this layout.
    pub fn vertex_count(&self, bytes: usize) -> u32 {
        if self.array_stride == 0 {
            return 0;
        }
        (bytes as u64 / self.array_stride) as u32
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlendConfig {
    pub label: String,
    pub state: wgpu::BlendState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepthConfig {
    pub label: String,
    pub write_enabled: bool,
    pub compare: wgpu::CompareFunction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StencilConfig {
    pub label: String,
    pub state: wgpu::StencilState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureSet {
    pub label: String,
    pub textures: Vec<TextureHandle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformSet {
    pub label: String,
    pub data: Vec<u8>,
}

/// Append-only list whose length is capped by a key field's capacity.
#[derive(Debug)]
struct Slots<T> {
    kind: &'static str,
    capacity: usize,
    entries: Vec<T>,
}

impl<T> Slots<T> {
    fn new(field: KeyField, kind: &'static str) -> Self {
        Self {
            kind,
            capacity: field.capacity(),
            entries: Vec::new(),
        }
    }

    fn with_default(field: KeyField, kind: &'static str, default: T) -> Self {
        let mut slots = Self::new(field, kind);
        slots.entries.push(default);
        slots
    }

    fn push(&mut self, value: T) -> Result<usize> {
        if self.entries.len() >= self.capacity {
            return Err(SceneError::RegistryFull {
                kind: self.kind,
                capacity: self.capacity,
            });
        }
        self.entries.push(value);
        Ok(self.entries.len() - 1)
    }

    fn get(&self, id: usize) -> Option<&T> {
        self.entries.get(id)
    }
}

/// Registries for every render-state selector, plus per-widget-type materials.
///
/// Id 0 of the blend, depth, stencil, texture-set and uniform-set registries is
/// a built-in default (opaque replace, depth disabled, stencil disabled, no
/// textures, no uniforms), so a zeroed key field always means "default state".
#[derive(Debug)]
pub struct RenderRegistry {
    shaders: Slots<ShaderDesc>,
    geometry_layouts: Slots<GeometryLayout>,
    blends: Slots<BlendConfig>,
    depths: Slots<DepthConfig>,
    stencils: Slots<StencilConfig>,
    texture_sets: Slots<TextureSet>,
    uniform_sets: Slots<UniformSet>,
    materials: HashMap<TypeId, DrawKey>,
}

impl Default for RenderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderRegistry {
    pub fn new() -> Self {
        Self {
            shaders: Slots::new(KeyField::Shader, "shader"),
            geometry_layouts: Slots::new(KeyField::GeometryLayout, "geometry layout"),
            blends: Slots::with_default(
                KeyField::Blend,
                "blend",
                BlendConfig {
                    label: "replace".into(),
                    state: wgpu::BlendState::REPLACE,
                },
            ),
            depths: Slots::with_default(
                KeyField::Depth,
                "depth",
                DepthConfig {
                    label: "disabled".into(),
                    write_enabled: false,
                    compare: wgpu::CompareFunction::Always,
                },
            ),
            stencils: Slots::with_default(
                KeyField::Stencil,
                "stencil",
                StencilConfig {
                    label: "disabled".into(),
                    state: wgpu::StencilState::default(),
                },
            ),
            texture_sets: Slots::with_default(
                KeyField::TextureSet,
                "texture set",
                TextureSet {
                    label: "none".into(),
                    textures: Vec::new(),
                },
            ),
            uniform_sets: Slots::with_default(
                KeyField::UniformSet,
                "uniform set",
                UniformSet {
                    label: "none".into(),
                    data: Vec::new(),
                },
            ),
            materials: HashMap::new(),
        }
    }

    pub fn register_shader(&mut self, label: impl Into<String>, source: impl Into<String>) -> Result<u8> {
        let desc = ShaderDesc {
            label: label.into(),
            source: source.into(),
        };
        log::debug!("Registering shader `{}`", desc.label);
        Ok(self.shaders.push(desc)? as u8)
    }

    /// Register a vertex format with the byte size of one destination buffer.
    ///
    /// `size_hint` must lie in `1..=MAX_GEOMETRY_BUFFER_BYTES`.
    pub fn register_geometry_layout(
        &mut self,
        label: impl Into<String>,
        layout: wgpu::VertexBufferLayout<'_>,
        size_hint: usize,
    ) -> Result<u8> {
        let label = label.into();
        if size_hint == 0 || size_hint > MAX_GEOMETRY_BUFFER_BYTES {
            return Err(SceneError::InvalidBufferSize {
                label,
                hint: size_hint,
                max: MAX_GEOMETRY_BUFFER_BYTES,
            });
        }
        log::debug!(
            "Registering geometry layout `{}` (stride {}, block {} bytes)",
            label,
            layout.array_stride,
            size_hint
        );
        let id = self.geometry_layouts.push(GeometryLayout {
            label,
            array_stride: layout.array_stride,
            step_mode: layout.step_mode,
            attributes: layout.attributes.to_vec(),
            block_size: size_hint,
        })?;
        Ok(id as u8)
    }

    pub fn register_blend(&mut self, label: impl Into<String>, state: wgpu::BlendState) -> Result<u8> {
        let config = BlendConfig {
            label: label.into(),
            state,
        };
        log::debug!("Registering blend config `{}`", config.label);
        Ok(self.blends.push(config)? as u8)
    }

    pub fn register_depth(
        &mut self,
        label: impl Into<String>,
        write_enabled: bool,
        compare: wgpu::CompareFunction,
    ) -> Result<u8> {
        let config = DepthConfig {
            label: label.into(),
            write_enabled,
            compare,
        };
        log::debug!("Registering depth config `{}`", config.label);
        Ok(self.depths.push(config)? as u8)
    }

    pub fn register_stencil(&mut self, label: impl Into<String>, state: wgpu::StencilState) -> Result<u8> {
        let config = StencilConfig {
            label: label.into(),
            state,
        };
        log::debug!("Registering stencil config `{}`", config.label);
        Ok(self.stencils.push(config)? as u8)
    }

    pub fn register_texture_set(
        &mut self,
        label: impl Into<String>,
        textures: Vec<TextureHandle>,
    ) -> Result<u16> {
        let set = TextureSet {
            label: label.into(),
            textures,
        };
        log::debug!("Registering texture set `{}`", set.label);
        Ok(self.texture_sets.push(set)? as u16)
    }

    pub fn register_uniform_set<T: bytemuck::Pod>(&mut self, label: impl Into<String>, value: &T) -> Result<u8> {
        let set = UniformSet {
            label: label.into(),
            data: bytemuck::bytes_of(value).to_vec(),
        };
        log::debug!("Registering uniform set `{}` ({} bytes)", set.label, set.data.len());
        Ok(self.uniform_sets.push(set)? as u8)
    }

    /// Key id of a primitive topology.
    pub fn primitive_id(topology: wgpu::PrimitiveTopology) -> u8 {
        match topology {
            wgpu::PrimitiveTopology::PointList => 0,
            wgpu::PrimitiveTopology::LineList => 1,
            wgpu::PrimitiveTopology::LineStrip => 2,
            wgpu::PrimitiveTopology::TriangleList => 3,
            wgpu::PrimitiveTopology::TriangleStrip => 4,
        }
    }

    /// Inverse of [`primitive_id`](Self::primitive_id).
    pub fn primitive_topology(id: u8) -> Option<wgpu::PrimitiveTopology> {
        match id {
            0 => Some(wgpu::PrimitiveTopology::PointList),
            1 => Some(wgpu::PrimitiveTopology::LineList),
            2 => Some(wgpu::PrimitiveTopology::LineStrip),
            3 => Some(wgpu::PrimitiveTopology::TriangleList),
            4 => Some(wgpu::PrimitiveTopology::TriangleStrip),
            _ => None,
        }
    }

    /// Base draw key for the type `M`, computed by `init` on first use only.
    pub fn material<M: 'static>(&mut self, init: impl FnOnce(&mut Self) -> Result<DrawKey>) -> Result<DrawKey> {
        let type_id = TypeId::of::<M>();
        if let Some(key) = self.materials.get(&type_id) {
            return Ok(*key);
        }
        let key = init(self)?;
        log::debug!("Material for {} -> {:?}", std::any::type_name::<M>(), key);
        self.materials.insert(type_id, key);
        Ok(key)
    }

    pub fn shader(&self, id: u8) -> Option<&ShaderDesc> {
        self.shaders.get(id as usize)
    }

    pub fn geometry_layout(&self, id: u8) -> Option<&GeometryLayout> {
        self.geometry_layouts.get(id as usize)
    }

    pub fn blend(&self, id: u8) -> Option<&BlendConfig> {
        self.blends.get(id as usize)
    }

    pub fn depth(&self, id: u8) -> Option<&DepthConfig> {
        self.depths.get(id as usize)
    }

    pub fn stencil(&self, id: u8) -> Option<&StencilConfig> {
        self.stencils.get(id as usize)
    }

    pub fn texture_set(&self, id: u16) -> Option<&TextureSet> {
        self.texture_sets.get(id as usize)
    }

    pub fn uniform_set(&self, id: u8) -> Option<&UniformSet> {
        self.uniform_sets.get(id as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: 8,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRS,
        }
    }

    #[test]
    fn test_geometry_layout_size_bounds() {
        let mut reg = RenderRegistry::new();
        assert!(matches!(
            reg.register_geometry_layout("zero", layout(), 0),
            Err(SceneError::InvalidBufferSize { hint: 0, .. })
        ));
        assert!(reg
            .register_geometry_layout("huge", layout(), MAX_GEOMETRY_BUFFER_BYTES + 1)
            .is_err());
        assert_eq!(
            reg.register_geometry_layout("max", layout(), MAX_GEOMETRY_BUFFER_BYTES),
            Ok(0)
        );
        let stored = reg.geometry_layout(0).unwrap();
        assert_eq!(stored.array_stride, 8);
        assert_eq!(stored.vertex_count(20), 2);
    }

    #[test]
    fn test_shader_registry_is_bounded_by_key_width() {
        let mut reg = RenderRegistry::new();
        for i in 0..KeyField::Shader.capacity() {
            assert_eq!(reg.register_shader(format!("s{}", i), ""), Ok(i as u8));
        }
        assert_eq!(
            reg.register_shader("overflow", ""),
            Err(SceneError::RegistryFull {
                kind: "shader",
                capacity: 32
            })
        );
    }

    #[test]
    fn test_defaults_occupy_id_zero() {
        let mut reg = RenderRegistry::new();
        assert_eq!(reg.blend(0).map(|b| b.state), Some(wgpu::BlendState::REPLACE));
        assert_eq!(reg.register_blend("alpha", wgpu::BlendState::ALPHA_BLENDING), Ok(1));
        assert_eq!(reg.register_texture_set("atlas", vec![TextureHandle(7)]), Ok(1));
        assert_eq!(reg.register_uniform_set("tint", &[1.0f32; 4]), Ok(1));
        assert_eq!(reg.uniform_set(1).map(|u| u.data.len()), Some(16));
    }

    #[test]
    fn test_material_initialised_once_per_type() {
        struct Marker;
        let mut reg = RenderRegistry::new();
        let mut calls = 0;
        for _ in 0..3 {
            let key = reg
                .material::<Marker>(|reg| {
                    calls += 1;
                    let shader = reg.register_shader("marker", "")?;
                    Ok(DrawKey::default().with(KeyField::Shader, shader as u64))
                })
                .unwrap();
            assert_eq!(key.shader(), 0);
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_primitive_ids_round_trip() {
        for topology in [
            wgpu::PrimitiveTopology::PointList,
            wgpu::PrimitiveTopology::LineList,
            wgpu::PrimitiveTopology::LineStrip,
            wgpu::PrimitiveTopology::TriangleList,
            wgpu::PrimitiveTopology::TriangleStrip,
        ] {
            let id = RenderRegistry::primitive_id(topology);
            assert!(u64::from(id) <= KeyField::Primitive.max_value());
            assert_eq!(RenderRegistry::primitive_topology(id), Some(topology));
        }
    }
}
