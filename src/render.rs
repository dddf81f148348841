//! Contract with the external render stage.
//!
//! The scene never touches a GPU device. After [`Scene::update`](crate::Scene::update)
//! it hands a [`FrameView`] to whatever implements [`RenderStage`]; the stage
//! resolves each draw key against the registry (shader, geometry layout,
//! blend/depth/stencil state, primitive topology, clip region) and issues one
//! draw call per [`RenderData`], opaque list first.

use crate::components::RenderData;
use crate::draw_key::DrawKey;
use crate::ecs::World;
use crate::geometry::BBox;
use crate::registry::RenderRegistry;
use crate::systems::DrawSystem;

pub trait RenderStage {
    fn render(&mut self, frame: &FrameView<'_>);
}

/// Read-only view of the frame produced by the last update.
pub struct FrameView<'a> {
    pub(crate) registry: &'a RenderRegistry,
    pub(crate) world: &'a World,
    pub(crate) draw: &'a DrawSystem,
    pub(crate) viewport: (u32, u32),
}

impl<'a> FrameView<'a> {
    pub fn registry(&self) -> &'a RenderRegistry {
        self.registry
    }

    /// Scene size in pixels.
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Scissor rectangle for a clip id.
    pub fn clip_region(&self, clip_id: u8) -> Option<&'a BBox> {
        self.draw.clip_regions().get(clip_id as usize)
    }

    pub fn clip_regions(&self) -> &'a [BBox] {
        self.draw.clip_regions()
    }

    /// Opaque draw calls in draw order.
    pub fn opaque(&self) -> impl Iterator<Item = &'a RenderData> + 'a {
        let world = self.world;
        self.draw
            .opaque()
            .iter()
            .filter_map(move |&entity| world.renders.get(entity))
    }

    /// Transparent draw calls, back to front.
    pub fn transparent(&self) -> impl Iterator<Item = &'a RenderData> + 'a {
        let world = self.world;
        self.draw
            .transparent()
            .iter()
            .filter_map(move |&entity| world.renders.get(entity))
    }

    /// Opaque then transparent.
    pub fn draw_calls(&self) -> impl Iterator<Item = &'a RenderData> + 'a {
        self.opaque().chain(self.transparent())
    }

    pub fn draw_call_count(&self) -> usize {
        self.draw.opaque().len() + self.draw.transparent().len()
    }

    /// Keys of all draw calls in draw order.
    pub fn keys(&self) -> Vec<DrawKey> {
        self.draw_calls().map(|r| r.key).collect()
    }
}
