//! Mutable access to the scene for widget callbacks and property setters.
//!
//! Every property change goes through [`SceneCx::modify`], which compares the
//! old and new values and raises exactly the dirty bits the change requires:
//!
//! - position, depth, rotation, scale or origin → `NEEDS_TRANSFORM_UPDATE`
//! - width or height → `NEEDS_TRANSFORM_UPDATE | NEEDS_DRAWABLES_UPDATE |
//!   NEEDS_WIDGET_UPDATE` on the widget, `NEEDS_WIDGET_UPDATE` on its parent
//! - opacity or visibility → `NEEDS_DRAWABLES_UPDATE`
//! - clip → nothing; clip regions are re-derived every frame

use crate::animation::{Animation, AnimationId, Animations};
use crate::components::{TransformData, UpdateFlags};
use crate::ecs::{Entity, World};
use crate::geometry::Vec2;
use crate::tree::{WidgetId, WidgetTree};
use crate::widgets::WidgetProps;

pub struct SceneCx<'a> {
    pub(crate) tree: &'a mut WidgetTree,
    pub(crate) world: &'a mut World,
    pub(crate) animations: &'a mut Animations,
}

impl<'a> SceneCx<'a> {
    pub(crate) fn new(
        tree: &'a mut WidgetTree,
        world: &'a mut World,
        animations: &'a mut Animations,
    ) -> Self {
        Self {
            tree,
            world,
            animations,
        }
    }

    pub fn props(&self, id: WidgetId) -> Option<&WidgetProps> {
        self.tree.props(id)
    }

    pub fn parent(&self, id: WidgetId) -> Option<WidgetId> {
        self.tree.parent(id)
    }

    pub fn children(&self, id: WidgetId) -> &[WidgetId] {
        self.tree.children(id)
    }

    pub fn entity(&self, id: WidgetId) -> Option<Entity> {
        self.tree.entity(id)
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

    /// Apply `f` to the widget's properties and raise the dirty bits implied
    /// by what changed. Returns whether anything changed.
    pub fn modify(&mut self, id: WidgetId, f: impl FnOnce(&mut WidgetProps)) -> bool {
        let Some(props) = self.tree.props_mut(id) else {
            return false;
        };
        let old = *props;
        f(props);
        let new = *props;
        if old == new {
            return false;
        }

        let moved = new.pose_differs(&old);
        let resized = new.size_differs(&old);

        let mut flags = UpdateFlags::empty();
        if moved {
            flags |= UpdateFlags::NEEDS_TRANSFORM_UPDATE;
        }
        if resized {
            flags |= UpdateFlags::NEEDS_TRANSFORM_UPDATE
                | UpdateFlags::NEEDS_DRAWABLES_UPDATE
                | UpdateFlags::NEEDS_WIDGET_UPDATE;
        }
        if old.opacity != new.opacity || old.visible != new.visible {
            flags |= UpdateFlags::NEEDS_DRAWABLES_UPDATE;
        }

        if let Some(entity) = self.tree.entity(id) {
            if moved {
                if let Some(data) = self.world.transforms.get_mut(entity) {
                    new.write_pose(data);
                }
            }
            self.mark_entity(entity, flags);
        }

        if resized {
            if let Some(parent) = self.tree.parent(id) {
                self.mark(parent, UpdateFlags::NEEDS_WIDGET_UPDATE);
            }
        }
        true
    }

    pub fn set_position(&mut self, id: WidgetId, x: f32, y: f32) -> bool {
        self.modify(id, |p| {
            p.x = x;
            p.y = y;
        })
    }

    pub fn set_z(&mut self, id: WidgetId, z: f32) -> bool {
        self.modify(id, |p| p.z = z)
    }

    pub fn set_size(&mut self, id: WidgetId, width: f32, height: f32) -> bool {
        self.modify(id, |p| {
            p.width = width;
            p.height = height;
        })
    }

    pub fn set_rotation(&mut self, id: WidgetId, radians: f32) -> bool {
        self.modify(id, |p| p.rotation = radians)
    }

    pub fn set_scale(&mut self, id: WidgetId, scale: impl Into<Vec2>) -> bool {
        let scale = scale.into();
        self.modify(id, |p| p.scale = scale)
    }

    pub fn set_origin(&mut self, id: WidgetId, origin: impl Into<Vec2>) -> bool {
        let origin = origin.into();
        self.modify(id, |p| p.origin = origin)
    }

    pub fn set_clip(&mut self, id: WidgetId, clip: bool) -> bool {
        self.modify(id, |p| p.clip = clip)
    }

    pub fn set_opacity(&mut self, id: WidgetId, opacity: f32) -> bool {
        self.modify(id, |p| p.opacity = opacity)
    }

    pub fn set_visible(&mut self, id: WidgetId, visible: bool) -> bool {
        self.modify(id, |p| p.visible = visible)
    }

    /// Raise dirty bits on a widget directly.
    pub fn mark(&mut self, id: WidgetId, flags: UpdateFlags) {
        if let Some(entity) = self.tree.entity(id) {
            self.mark_entity(entity, flags);
        }
    }

    /// Ask for the widget's layout routine to run in the next layout pass.
    pub fn request_layout(&mut self, id: WidgetId) {
        self.mark(id, UpdateFlags::NEEDS_WIDGET_UPDATE);
    }

    /// Force the widget's world transform (and so its subtree's) to be recomputed.
    pub fn request_hierarchy_update(&mut self, id: WidgetId) {
        self.mark(id, UpdateFlags::NEEDS_TRANSFORM_UPDATE);
    }

    /// Ask for the widget's geometry to be regenerated, e.g. after a colour change.
    pub fn request_redraw(&mut self, id: WidgetId) {
        self.mark(id, UpdateFlags::NEEDS_DRAWABLES_UPDATE);
    }

    /// Register an animation. It first advances in the animation pass that
    /// follows the next transform pass, never in the frame it was started in.
    pub fn start_animation(&mut self, animation: impl Animation + 'static) -> AnimationId {
        self.animations.add(Box::new(animation))
    }

    pub fn stop_animation(&mut self, id: AnimationId) -> bool {
        self.animations.remove(id)
    }

    pub(crate) fn mark_entity(&mut self, entity: Entity, mut flags: UpdateFlags) {
        // Only drawables ever consume the drawables bit
        if !self.world.draws.contains(entity) {
            flags.remove(UpdateFlags::NEEDS_DRAWABLES_UPDATE);
        }
        if let Some(update) = self.world.updates.get_mut(entity) {
            update.flags |= flags;
        }
    }

    /// Run a widget's layout routine, if it has one.
    pub(crate) fn run_layout(&mut self, id: WidgetId) {
        let Some(mut widget) = self.tree.take_widget(id) else {
            return;
        };
        if let Some(layout) = widget.as_layout() {
            layout.layout(id, self);
        }
        self.tree.restore_widget(id, widget);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{DrawData, UpdateData};
    use crate::widgets::Group;

    struct Fixture {
        tree: WidgetTree,
        world: World,
        animations: Animations,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                tree: WidgetTree::new(),
                world: World::new(),
                animations: Animations::new(),
            }
        }

        fn add(&mut self, parent: Option<WidgetId>, drawable: bool) -> WidgetId {
            let entity = self.world.spawn();
            let id = self
                .tree
                .register(Box::new(Group), entity, WidgetProps::sized(10.0, 10.0));
            if let Some(parent) = parent {
                self.tree.set_parent(id, parent);
            }
            self.world.transforms.insert(entity, TransformData::default());
            self.world
                .updates
                .insert(entity, UpdateData::new(id, UpdateFlags::empty()));
            if drawable {
                self.world.draws.insert(entity, DrawData::default());
            }
            id
        }

        fn cx(&mut self) -> SceneCx<'_> {
            SceneCx::new(&mut self.tree, &mut self.world, &mut self.animations)
        }
    }

    #[test]
    fn test_move_marks_transform_and_syncs_pose() {
        let mut fx = Fixture::new();
        let id = fx.add(None, true);
        let mut cx = fx.cx();

        assert!(cx.set_position(id, 3.0, 4.0));
        assert_eq!(cx.flags(id), UpdateFlags::NEEDS_TRANSFORM_UPDATE);
        assert_eq!(cx.transform(id).unwrap().position, [3.0, 4.0, 0.0]);

        // Setting the same value is not a change
        assert!(!cx.set_position(id, 3.0, 4.0));
    }

    #[test]
    fn test_resize_marks_self_and_parent() {
        let mut fx = Fixture::new();
        let parent = fx.add(None, false);
        let child = fx.add(Some(parent), true);
        let mut cx = fx.cx();

        cx.set_size(child, 20.0, 5.0);
        assert_eq!(cx.flags(child), UpdateFlags::all());
        assert_eq!(cx.flags(parent), UpdateFlags::NEEDS_WIDGET_UPDATE);
    }

    #[test]
    fn test_drawables_bit_only_on_drawables() {
        let mut fx = Fixture::new();
        let plain = fx.add(None, false);
        let drawable = fx.add(None, true);
        let mut cx = fx.cx();

        cx.set_opacity(plain, 0.5);
        cx.set_opacity(drawable, 0.5);
        assert_eq!(cx.flags(plain), UpdateFlags::empty());
        assert_eq!(cx.flags(drawable), UpdateFlags::NEEDS_DRAWABLES_UPDATE);
    }

    #[test]
    fn test_clip_change_raises_nothing() {
        let mut fx = Fixture::new();
        let id = fx.add(None, true);
        let mut cx = fx.cx();

        assert!(cx.set_clip(id, true));
        assert_eq!(cx.flags(id), UpdateFlags::empty());
        assert!(cx.props(id).unwrap().clip);
    }
}
