//! Per-frame draw-call construction.
//!
//! Runs after the transform system. Stages, in order:
//!
//! 1. Tear down the previous frame's render and debug entities; spawn
//!    bounding-box outlines if enabled
//! 2. Assign clip regions ([`clip`])
//! 3. Spawn clip-region outlines if enabled ([`debug`])
//! 4. Rebuild the geometry of every drawable carrying
//!    `NEEDS_DRAWABLES_UPDATE`, as one complete pass
//! 5. Collect visible items into an opaque and a transparent list
//! 6. Sort both lists ([`batch::sort_opaque`], [`batch::sort_transparent`])
//! 7. Cut them into draw calls ([`batch::plan_batches`])
//! 8. Emit one render entity per non-empty draw call
//!
//! Render entities never outlive their frame.

pub mod batch;
pub mod clip;
pub mod debug;

use crate::components::{RenderData, UpdateFlags};
use crate::ecs::{Entity, World};
use crate::error::Result;
use crate::geometry::BBox;
use crate::registry::RenderRegistry;
use crate::tree::{WidgetId, WidgetTree};
use crate::widgets::GeometryCx;
use crate::{DebugFlags, SceneConfig};

use batch::{Batch, SortItem};
use clip::ClipWalker;

/// Outcome of one draw pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrawPass {
    pub geometry_rebuilt: u32,
    pub items_collected: u32,
    pub clip_regions: u32,
    pub opaque_draw_calls: u32,
    pub transparent_draw_calls: u32,
}

#[derive(Default)]
pub struct DrawSystem {
    clip_regions: Vec<BBox>,
    /// Render entities of the current frame, in draw order
    opaque: Vec<Entity>,
    transparent: Vec<Entity>,
    debug_entities: Vec<Entity>,
    clip_walker: ClipWalker,
    opaque_items: Vec<SortItem>,
    transparent_items: Vec<SortItem>,
}

impl std::fmt::Debug for DrawSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawSystem")
            .field("clip_regions", &self.clip_regions.len())
            .field("opaque", &self.opaque.len())
            .field("transparent", &self.transparent.len())
            .field("debug_entities", &self.debug_entities.len())
            .finish()
    }
}

impl DrawSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clip regions of the current frame; index = clip id.
    pub fn clip_regions(&self) -> &[BBox] {
        &self.clip_regions
    }

    /// Opaque render entities in draw order.
    pub fn opaque(&self) -> &[Entity] {
        &self.opaque
    }

    /// Transparent render entities in draw order (back to front).
    pub fn transparent(&self) -> &[Entity] {
        &self.transparent
    }

    pub fn debug_entities(&self) -> &[Entity] {
        &self.debug_entities
    }

    pub fn run(
        &mut self,
        root: WidgetId,
        tree: &mut WidgetTree,
        world: &mut World,
        registry: &mut RenderRegistry,
        config: &SceneConfig,
    ) -> Result<DrawPass> {
        self.teardown(world);

        if config.debug.contains(DebugFlags::BOUNDING_BOXES) {
            let key = debug::debug_material(registry)?;
            let boxes: Vec<(BBox, f32)> = tree
                .subtree(root)
                .into_iter()
                .filter_map(|id| tree.entity(id))
                .filter_map(|e| world.transforms.get(e))
                .filter(|t| t.valid)
                .map(|t| (t.bbox, t.depth()))
                .collect();
            debug::spawn_outlines(
                world,
                key,
                boxes.iter().map(|(b, z)| (b, *z)),
                debug::BOUNDING_BOX_COLOR,
                &mut self.debug_entities,
            );
        }

        if config.clipping {
            self.clip_walker
                .assign(root, tree, world, &mut self.clip_regions)?;
        } else {
            self.clip_walker
                .reset(root, tree, world, &mut self.clip_regions);
        }

        if config.debug.contains(DebugFlags::CLIP_OUTLINES) {
            let key = debug::debug_material(registry)?;
            debug::spawn_outlines(
                world,
                key,
                self.clip_regions.iter().map(|b| (b, 0.0)),
                debug::CLIP_OUTLINE_COLOR,
                &mut self.debug_entities,
            );
        }

        let geometry_rebuilt = rebuild_dirty_geometry(tree, world, registry);

        self.collect(world);
        batch::sort_opaque(&mut self.opaque_items);
        batch::sort_transparent(&mut self.transparent_items);

        let opaque_batches = batch::plan_batches(&self.opaque_items, registry)?;
        let transparent_batches = batch::plan_batches(&self.transparent_items, registry)?;
        emit(world, registry, &self.opaque_items, &opaque_batches, &mut self.opaque);
        emit(
            world,
            registry,
            &self.transparent_items,
            &transparent_batches,
            &mut self.transparent,
        );

        Ok(DrawPass {
            geometry_rebuilt,
            items_collected: (self.opaque_items.len() + self.transparent_items.len()) as u32,
            clip_regions: self.clip_regions.len() as u32,
            opaque_draw_calls: self.opaque.len() as u32,
            transparent_draw_calls: self.transparent.len() as u32,
        })
    }

    fn teardown(&mut self, world: &mut World) {
        for entity in self
            .opaque
            .drain(..)
            .chain(self.transparent.drain(..))
            .chain(self.debug_entities.drain(..))
        {
            world.despawn(entity);
        }
    }

    /// Visible items with both a transform and draw data, split by the
    /// transparency bit of their key.
    fn collect(&mut self, world: &World) {
        self.opaque_items.clear();
        self.transparent_items.clear();
        for (entity, draw) in world.draws.iter() {
            if !draw.visible {
                continue;
            }
            let Some(transform) = world.transforms.get(entity) else {
                continue;
            };
            let item = SortItem {
                entity,
                key: draw.key,
                depth: transform.depth(),
                bytes: draw.vertex_bytes.len(),
            };
            if draw.key.is_transparent() {
                self.transparent_items.push(item);
            } else {
                self.opaque_items.push(item);
            }
        }
    }
}

/// Regenerate geometry for every dirty drawable. The dirty set is taken up
/// front since widgets may spawn or despawn entities while rebuilding.
fn rebuild_dirty_geometry(tree: &mut WidgetTree, world: &mut World, registry: &RenderRegistry) -> u32 {
    let dirty: Vec<(Entity, WidgetId)> = world
        .updates
        .iter()
        .filter(|(entity, update)| {
            update.flags.contains(UpdateFlags::NEEDS_DRAWABLES_UPDATE) && world.draws.contains(*entity)
        })
        .map(|(entity, update)| (entity, update.widget))
        .collect();

    let mut rebuilt = 0;
    for (entity, id) in dirty {
        let Some(props) = tree.props(id).copied() else {
            continue;
        };
        let Some(mut widget) = tree.take_widget(id) else {
            continue;
        };
        if let Some(drawable) = widget.as_drawable() {
            let mut cx = GeometryCx {
                widget: id,
                entity,
                props: &props,
                world: &mut *world,
                registry,
            };
            drawable.rebuild_geometry(&mut cx);
            rebuilt += 1;
        }
        tree.restore_widget(id, widget);

        if let Some(draw) = world.draws.get_mut(entity) {
            draw.visible = props.visible;
        }
        if let Some(update) = world.updates.get_mut(entity) {
            update.flags.remove(UpdateFlags::NEEDS_DRAWABLES_UPDATE);
        }
    }
    rebuilt
}

/// Spawn one render entity per batch, concatenating member vertex bytes in
/// sorted order. Empty batches produce nothing.
fn emit(
    world: &mut World,
    registry: &RenderRegistry,
    items: &[SortItem],
    batches: &[Batch],
    out: &mut Vec<Entity>,
) {
    for batch in batches {
        if batch.bytes == 0 {
            continue;
        }
        let mut vertex_bytes = Vec::with_capacity(batch.bytes);
        for item in &items[batch.items.clone()] {
            if let Some(draw) = world.draws.get(item.entity) {
                vertex_bytes.extend_from_slice(&draw.vertex_bytes);
            }
        }
        if vertex_bytes.is_empty() {
            continue;
        }

        let vertex_count = registry
            .geometry_layout(batch.key.geometry_layout())
            .map(|layout| layout.vertex_count(vertex_bytes.len()))
            .unwrap_or(0);
        let entity = world.spawn();
        world.renders.insert(
            entity,
            RenderData {
                key: batch.key,
                vertex_bytes,
                vertex_count,
                item_count: batch.items.len() as u32,
            },
        );
        out.push(entity);
    }
}
