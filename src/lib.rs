//! A retained-mode scene core for GPU user interfaces.
//!
//! A [`Scene`] owns a tree of widgets, one entity per widget in an
//! entity/component [`World`](ecs::World), and the registries describing every
//! piece of render state. Each frame:
//!
//! 1. [`Scene::animate`] steps the animations that are ready
//! 2. [`Scene::update`] runs the transform system (layout, world transforms,
//!    animation readiness) and then the draw system (clip regions, geometry,
//!    sorting, batching)
//! 3. [`Scene::render`] hands the resulting draw calls to a [`RenderStage`]
//!
//! Only what changed is recomputed: property setters raise per-entity dirty
//! bits and each system clears the bits it owns.

pub mod align;
pub mod animation;
pub mod components;
pub mod context;
pub mod draw_key;
pub mod ecs;
pub mod error;
pub mod geometry;
pub mod registry;
pub mod render;
pub mod stats;
pub mod systems;
pub mod transform;
pub mod tree;
pub mod widgets;

use std::any::Any;

use bitflags::bitflags;

use animation::{AnimationId, Animations};
use components::{DrawData, TransformData, UpdateData, UpdateFlags};
use context::SceneCx;
use ecs::{Entity, World};
use error::{Result, SceneError};
use geometry::Vec2;
use registry::RenderRegistry;
use render::{FrameView, RenderStage};
use stats::FrameStats;
use systems::{DrawSystem, TransformSystem};
use tree::{WidgetId, WidgetTree};
use widgets::{Group, Widget, WidgetProps};

pub mod prelude {
    pub use crate::align::{Axis, Edge};
    pub use crate::animation::{Animation, AnimationStatus, Property, TimingFunction, Tween};
    pub use crate::components::{RenderData, UpdateFlags};
    pub use crate::context::SceneCx;
    pub use crate::draw_key::{DrawKey, KeyField};
    pub use crate::error::{Result, SceneError};
    pub use crate::geometry::{BBox, Vec2};
    pub use crate::registry::RenderRegistry;
    pub use crate::render::{FrameView, RenderStage};
    pub use crate::stats::FrameStats;
    pub use crate::tree::WidgetId;
    pub use crate::widgets::{
        column, rectangle, row, Color, CrossAxisAlignment, Drawable, Flex, GeometryCx, Group,
        Layout, MainAxisAlignment, Rectangle, Widget, WidgetProps,
    };
    pub use crate::{DebugFlags, Scene, SceneConfig};
}

bitflags! {
    /// Debug overlays drawn on top of the scene.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct DebugFlags: u8 {
        /// Outline every widget's world bounding box
        const BOUNDING_BOXES = 0b01;
        /// Outline every clip region
        const CLIP_OUTLINES  = 0b10;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    pub width: u32,
    pub height: u32,
    /// When false every widget uses clip region 0
    pub clipping: bool,
    pub debug: DebugFlags,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            clipping: true,
            debug: DebugFlags::empty(),
        }
    }
}

impl SceneConfig {
    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    pub fn clipping(mut self, clipping: bool) -> Self {
        self.clipping = clipping;
        self
    }

    pub fn debug(mut self, debug: DebugFlags) -> Self {
        self.debug = debug;
        self
    }
}

pub struct Scene {
    config: SceneConfig,
    tree: WidgetTree,
    world: World,
    registry: RenderRegistry,
    animations: Animations,
    transform_system: TransformSystem,
    draw_system: DrawSystem,
    root: WidgetId,
    last_stats: FrameStats,
}

impl Scene {
    /// Create a scene whose root is a [`Group`] covering the viewport.
    pub fn new(config: SceneConfig) -> Self {
        Self::with_registry(config, RenderRegistry::new())
    }

    /// Create a scene around a registry prepared by the caller.
    pub fn with_registry(config: SceneConfig, registry: RenderRegistry) -> Self {
        let mut tree = WidgetTree::new();
        let mut world = World::new();
        let props = WidgetProps::sized(config.width as f32, config.height as f32);
        let entity = world.spawn();
        let root = tree.register(Box::new(Group), entity, props);
        world.transforms.insert(entity, TransformData::default());
        world.updates.insert(
            entity,
            UpdateData::new(
                root,
                UpdateFlags::NEEDS_WIDGET_UPDATE | UpdateFlags::NEEDS_TRANSFORM_UPDATE,
            ),
        );

        Self {
            config,
            tree,
            world,
            registry,
            animations: Animations::new(),
            transform_system: TransformSystem::new(),
            draw_system: DrawSystem::new(),
            root,
            last_stats: FrameStats::default(),
        }
    }

    pub fn root(&self) -> WidgetId {
        self.root
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Runtime access to the configuration. Size changes must go through
    /// [`resize`](Self::resize).
    pub fn config_mut(&mut self) -> &mut SceneConfig {
        &mut self.config
    }

    pub fn registry(&self) -> &RenderRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RenderRegistry {
        &mut self.registry
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn tree(&self) -> &WidgetTree {
        &self.tree
    }

    pub fn animations(&self) -> &Animations {
        &self.animations
    }

    pub fn draw_system(&self) -> &DrawSystem {
        &self.draw_system
    }

    /// Statistics of the last successful [`update`](Self::update).
    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    pub fn entity(&self, id: WidgetId) -> Option<Entity> {
        self.tree.entity(id)
    }

    pub fn props(&self, id: WidgetId) -> Option<&WidgetProps> {
        self.tree.props(id)
    }

    pub fn transform(&self, id: WidgetId) -> Option<&TransformData> {
        self.tree
            .entity(id)
            .and_then(|entity| self.world.transforms.get(entity))
    }

    pub fn flags(&self, id: WidgetId) -> UpdateFlags {
        self.tree
            .entity(id)
            .and_then(|entity| self.world.updates.get(entity))
            .map(|u| u.flags)
            .unwrap_or_default()
    }

    pub fn clip_id(&self, id: WidgetId) -> Option<u8> {
        self.tree.clip_id(id)
    }

    /// Mutable access to everything widget callbacks see.
    pub fn cx(&mut self) -> SceneCx<'_> {
        SceneCx::new(&mut self.tree, &mut self.world, &mut self.animations)
    }

    pub fn add_widget(&mut self, parent: WidgetId, widget: impl Widget) -> Result<WidgetId> {
        self.add_widget_with_props(parent, widget, WidgetProps::default())
    }

    /// Attach `widget` as the last child of `parent`.
    ///
    /// Drawables resolve their material here, so a registry problem surfaces
    /// at insertion time.
    pub fn add_widget_with_props(
        &mut self,
        parent: WidgetId,
        widget: impl Widget,
        props: WidgetProps,
    ) -> Result<WidgetId> {
        if !self.tree.contains(parent) {
            return Err(SceneError::UnknownWidget(parent));
        }
        let mut widget: Box<dyn Widget> = Box::new(widget);

        let draw = match widget.as_drawable() {
            Some(drawable) => Some(DrawData::new(drawable.material(&mut self.registry)?)),
            None => None,
        };

        let entity = self.world.spawn();
        let id = self.tree.register(widget, entity, props);
        self.tree.set_parent(id, parent);

        let mut transform = TransformData::default();
        props.write_pose(&mut transform);
        self.world.transforms.insert(entity, transform);

        let mut flags = UpdateFlags::NEEDS_WIDGET_UPDATE | UpdateFlags::NEEDS_TRANSFORM_UPDATE;
        if let Some(draw) = draw {
            self.world.draws.insert(entity, draw);
            flags |= UpdateFlags::NEEDS_DRAWABLES_UPDATE;
        }
        self.world.updates.insert(entity, UpdateData::new(id, flags));

        self.cx().request_layout(parent);
        log::trace!("Added widget {:?} under {:?}", id, parent);
        Ok(id)
    }

    /// Remove a widget and its whole subtree. The root cannot be removed.
    pub fn remove_widget(&mut self, id: WidgetId) -> Result<()> {
        if id == self.root || !self.tree.contains(id) {
            return Err(SceneError::UnknownWidget(id));
        }
        let parent = self.tree.parent(id);
        for node in self.tree.subtree(id) {
            if let Some((_, entity)) = self.tree.unregister(node) {
                self.world.despawn(entity);
            }
        }
        if let Some(parent) = parent {
            self.cx().request_layout(parent);
        }
        Ok(())
    }

    /// Borrow a widget as its concrete type.
    pub fn widget<W: Widget, R>(&self, id: WidgetId, f: impl FnOnce(&W) -> R) -> Option<R> {
        self.tree
            .with_widget(id, |widget| (widget as &dyn Any).downcast_ref::<W>().map(f))
            .flatten()
    }

    /// Mutate a widget as its concrete type. The widget's layout and geometry
    /// are scheduled for an update afterwards.
    pub fn widget_mut<W: Widget, R>(&mut self, id: WidgetId, f: impl FnOnce(&mut W) -> R) -> Option<R> {
        let mut widget = self.tree.take_widget(id)?;
        let result = (widget.as_mut() as &mut dyn Any).downcast_mut::<W>().map(f);
        self.tree.restore_widget(id, widget);
        if result.is_some() {
            self.cx()
                .mark(id, UpdateFlags::NEEDS_WIDGET_UPDATE | UpdateFlags::NEEDS_DRAWABLES_UPDATE);
        }
        result
    }

    pub fn modify(&mut self, id: WidgetId, f: impl FnOnce(&mut WidgetProps)) -> bool {
        self.cx().modify(id, f)
    }

    pub fn set_position(&mut self, id: WidgetId, x: f32, y: f32) -> bool {
        self.cx().set_position(id, x, y)
    }

    pub fn set_z(&mut self, id: WidgetId, z: f32) -> bool {
        self.cx().set_z(id, z)
    }

    pub fn set_size(&mut self, id: WidgetId, width: f32, height: f32) -> bool {
        self.cx().set_size(id, width, height)
    }

    pub fn set_rotation(&mut self, id: WidgetId, radians: f32) -> bool {
        self.cx().set_rotation(id, radians)
    }

    pub fn set_scale(&mut self, id: WidgetId, scale: impl Into<Vec2>) -> bool {
        self.cx().set_scale(id, scale)
    }

    pub fn set_origin(&mut self, id: WidgetId, origin: impl Into<Vec2>) -> bool {
        self.cx().set_origin(id, origin)
    }

    pub fn set_clip(&mut self, id: WidgetId, clip: bool) -> bool {
        self.cx().set_clip(id, clip)
    }

    pub fn set_opacity(&mut self, id: WidgetId, opacity: f32) -> bool {
        self.cx().set_opacity(id, opacity)
    }

    pub fn set_visible(&mut self, id: WidgetId, visible: bool) -> bool {
        self.cx().set_visible(id, visible)
    }

    /// See [`SceneCx::align`].
    pub fn align(
        &mut self,
        widget: WidgetId,
        edge: align::Edge,
        anchor: WidgetId,
        anchor_edge: align::Edge,
        offset: f32,
    ) -> Result<()> {
        self.cx().align(widget, edge, anchor, anchor_edge, offset)
    }

    pub fn start_animation(&mut self, animation: impl animation::Animation + 'static) -> AnimationId {
        self.animations.add(Box::new(animation))
    }

    pub fn stop_animation(&mut self, id: AnimationId) -> bool {
        self.animations.remove(id)
    }

    /// Change the viewport size; the root widget follows it.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
        let root = self.root;
        self.cx().set_size(root, width as f32, height as f32);
    }

    /// Step every ready animation by `dt` seconds. Returns how many stepped.
    ///
    /// Call once per frame before [`update`](Self::update).
    pub fn animate(&mut self, dt: f32) -> usize {
        animation::advance(&mut self.tree, &mut self.world, &mut self.animations, dt)
    }

    /// Run the transform system, then the draw system.
    ///
    /// A configuration error aborts the frame; the render lists are then
    /// left as the draw system had built them so far and must not be drawn.
    pub fn update(&mut self) -> Result<FrameStats> {
        let transform = self.transform_system.run(
            self.root,
            &mut self.tree,
            &mut self.world,
            &mut self.animations,
        );
        let draw = self.draw_system.run(
            self.root,
            &mut self.tree,
            &mut self.world,
            &mut self.registry,
            &self.config,
        )?;

        let stats = FrameStats {
            layout_passes: transform.layout_passes,
            layout_converged: transform.layout_converged,
            transforms_updated: transform.transforms_updated,
            geometry_rebuilt: draw.geometry_rebuilt,
            items_collected: draw.items_collected,
            clip_regions: draw.clip_regions,
            opaque_draw_calls: draw.opaque_draw_calls,
            transparent_draw_calls: draw.transparent_draw_calls,
        };
        log::trace!("Frame stats: {:?}", stats);
        self.last_stats = stats;
        Ok(stats)
    }

    /// View of the frame built by the last [`update`](Self::update).
    pub fn frame(&self) -> FrameView<'_> {
        FrameView {
            registry: &self.registry,
            world: &self.world,
            draw: &self.draw_system,
            viewport: (self.config.width, self.config.height),
        }
    }

    pub fn render(&self, stage: &mut impl RenderStage) {
        stage.render(&self.frame());
    }
}
