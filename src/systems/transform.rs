//! Layout and world-transform propagation.
//!
//! Runs first every frame, in three phases:
//!
//! 1. A bounded layout pass. Widgets carrying `NEEDS_WIDGET_UPDATE` have the
//!    bit cleared and run their layout routine. Layout routines may dirty
//!    widgets, themselves included, so the pass repeats until nothing is dirty or
//!    [`LAYOUT_ITERATION_LIMIT`] iterations have run.
//! 2. Depth-first propagation from the root. A node carrying
//!    `NEEDS_TRANSFORM_UPDATE` gets `world = parent · local`, a fresh bounding
//!    box, and passes the bit on to its direct children. Clean nodes reuse their
//!    cached matrix. The walk always reaches every node, since a clean parent
//!    may have dirty descendants.
//! 3. Every registered animation is marked ready.

use crate::animation::Animations;
use crate::components::UpdateFlags;
use crate::context::SceneCx;
use crate::ecs::World;
use crate::transform::Transform;
use crate::tree::{WidgetId, WidgetTree};

/// Maximum number of layout iterations per frame.
pub const LAYOUT_ITERATION_LIMIT: usize = 3;

/// Outcome of one transform pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransformPass {
    pub layout_passes: u32,
    pub layout_converged: bool,
    pub transforms_updated: u32,
}

/// Reusable scratch space for the transform pass.
#[derive(Debug, Default)]
pub struct TransformSystem {
    stack: Vec<(WidgetId, Transform)>,
    dirty: Vec<WidgetId>,
}

impl TransformSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(
        &mut self,
        root: WidgetId,
        tree: &mut WidgetTree,
        world: &mut World,
        animations: &mut Animations,
    ) -> TransformPass {
        let (layout_passes, layout_converged) = self.layout(root, tree, world, animations);
        let transforms_updated = self.propagate(root, tree, world);
        animations.mark_all_ready();

        TransformPass {
            layout_passes,
            layout_converged,
            transforms_updated,
        }
    }

    fn layout(
        &mut self,
        root: WidgetId,
        tree: &mut WidgetTree,
        world: &mut World,
        animations: &mut Animations,
    ) -> (u32, bool) {
        let mut passes = 0;
        for _ in 0..LAYOUT_ITERATION_LIMIT {
            self.collect_layout_dirty(root, tree, world);
            if self.dirty.is_empty() {
                return (passes, true);
            }
            passes += 1;

            // Deepest first, so children settle their size before their
            // parent lays them out. The bit is cleared first so a widget
            // that dirties itself again is picked up by the next iteration.
            for &id in self.dirty.iter().rev() {
                if let Some(entity) = tree.entity(id) {
                    if let Some(update) = world.updates.get_mut(entity) {
                        update.flags.remove(UpdateFlags::NEEDS_WIDGET_UPDATE);
                    }
                }
                let mut cx = SceneCx::new(tree, world, animations);
                cx.run_layout(id);
            }
        }

        self.collect_layout_dirty(root, tree, world);
        if self.dirty.is_empty() {
            return (passes, true);
        }
        log::warn!(
            "Layout did not settle after {} iterations; {} widget(s) still need layout",
            LAYOUT_ITERATION_LIMIT,
            self.dirty.len()
        );
        (passes, false)
    }

    /// Widgets carrying `NEEDS_WIDGET_UPDATE`, in pre-order.
    fn collect_layout_dirty(&mut self, root: WidgetId, tree: &WidgetTree, world: &World) {
        self.dirty.clear();
        self.dirty.extend(tree.subtree(root).into_iter().filter(|&id| {
            tree.entity(id)
                .and_then(|entity| world.updates.get(entity))
                .is_some_and(|u| u.flags.contains(UpdateFlags::NEEDS_WIDGET_UPDATE))
        }));
    }

    fn propagate(&mut self, root: WidgetId, tree: &WidgetTree, world: &mut World) -> u32 {
        let mut updated = 0;
        self.stack.clear();
        self.stack.push((root, Transform::IDENTITY));

        while let Some((id, parent_xf)) = self.stack.pop() {
            let Some(entity) = tree.entity(id) else {
                continue;
            };
            let children = tree.children(id);

            let dirty = world
                .updates
                .get(entity)
                .is_some_and(|u| u.flags.contains(UpdateFlags::NEEDS_TRANSFORM_UPDATE));

            let world_xf = match world.transforms.get_mut(entity) {
                Some(data) if dirty => {
                    let xf = parent_xf.then(&data.local_matrix());
                    let (w, h) = tree
                        .props(id)
                        .map(|p| (p.width, p.height))
                        .unwrap_or_default();
                    data.world_xf = xf;
                    data.bbox = xf.map_rect(w, h);
                    data.valid = true;
                    xf
                }
                Some(data) => data.world_xf,
                None => parent_xf,
            };

            if dirty {
                updated += 1;
                let drawable = world.draws.contains(entity);
                if let Some(update) = world.updates.get_mut(entity) {
                    update.flags.remove(UpdateFlags::NEEDS_TRANSFORM_UPDATE);
                    // Geometry is emitted in world space
                    if drawable {
                        update.flags.insert(UpdateFlags::NEEDS_DRAWABLES_UPDATE);
                    }
                }
                for &child in children {
                    if let Some(child_entity) = tree.entity(child) {
                        if let Some(update) = world.updates.get_mut(child_entity) {
                            update.flags.insert(UpdateFlags::NEEDS_TRANSFORM_UPDATE);
                        }
                    }
                }
            }

            self.stack
                .extend(children.iter().rev().map(|&child| (child, world_xf)));
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Animation, AnimationId, AnimationStatus};
    use crate::components::{DrawData, TransformData, UpdateData};
    use crate::geometry::BBox;
    use crate::widgets::{Group, Layout, Widget, WidgetProps};
    use crate::{Scene, SceneConfig};
    use std::any::Any;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Harness {
        tree: WidgetTree,
        world: World,
        animations: Animations,
        system: TransformSystem,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                tree: WidgetTree::new(),
                world: World::new(),
                animations: Animations::new(),
                system: TransformSystem::new(),
            }
        }

        fn add(&mut self, widget: Box<dyn Widget>, parent: Option<WidgetId>, props: WidgetProps) -> WidgetId {
            let entity = self.world.spawn();
            let id = self.tree.register(widget, entity, props);
            if let Some(parent) = parent {
                self.tree.set_parent(id, parent);
            }
            let mut data = TransformData::default();
            props.write_pose(&mut data);
            self.world.transforms.insert(entity, data);
            let flags = UpdateFlags::NEEDS_WIDGET_UPDATE | UpdateFlags::NEEDS_TRANSFORM_UPDATE;
            self.world.updates.insert(entity, UpdateData::new(id, flags));
            id
        }

        fn run(&mut self, root: WidgetId) -> TransformPass {
            self.system
                .run(root, &mut self.tree, &mut self.world, &mut self.animations)
        }

        fn data(&self, id: WidgetId) -> TransformData {
            let entity = self.tree.entity(id).unwrap();
            *self.world.transforms.get(entity).unwrap()
        }

        fn flags(&self, id: WidgetId) -> UpdateFlags {
            let entity = self.tree.entity(id).unwrap();
            self.world.updates.get(entity).unwrap().flags
        }
    }

    /// Asks its parent and children for layout every time it lays out, so
    /// layout never settles.
    struct PingPong;

    impl Widget for PingPong {
        fn as_layout(&mut self) -> Option<&mut dyn Layout> {
            Some(self)
        }
    }

    impl Layout for PingPong {
        fn layout(&mut self, id: WidgetId, cx: &mut SceneCx<'_>) {
            if let Some(parent) = cx.parent(id) {
                cx.request_layout(parent);
            }
            for &child in cx.children(id).to_vec().iter() {
                cx.request_layout(child);
            }
        }
    }

    #[test]
    fn test_world_transform_composes_parents() {
        let mut h = Harness::new();
        let root = h.add(Box::new(Group), None, WidgetProps::sized(100.0, 100.0).at(10.0, 0.0));
        let child = h.add(Box::new(Group), Some(root), WidgetProps::sized(20.0, 10.0).at(5.0, 5.0).with_z(2.0));
        let pass = h.run(root);

        assert_eq!(pass.transforms_updated, 2);
        let data = h.data(child);
        assert!(data.valid);
        assert_eq!(data.bbox, BBox::new(15.0, 5.0, 35.0, 15.0));
        assert_eq!(data.depth(), 2.0);
        assert!(!h.flags(child).contains(UpdateFlags::NEEDS_TRANSFORM_UPDATE));
    }

    #[test]
    fn test_rotated_bbox_covers_corners() {
        let mut h = Harness::new();
        let root = h.add(
            Box::new(Group),
            None,
            WidgetProps {
                rotation: std::f32::consts::FRAC_PI_2,
                ..WidgetProps::sized(20.0, 10.0)
            },
        );
        h.run(root);
        let bbox = h.data(root).bbox;
        assert!((bbox.x0 + 10.0).abs() < 1e-4);
        assert!((bbox.x1 - 0.0).abs() < 1e-4);
        assert!((bbox.y1 - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let mut h = Harness::new();
        let root = h.add(Box::new(Group), None, WidgetProps::sized(50.0, 50.0));
        let child = h.add(Box::new(Group), Some(root), WidgetProps::sized(10.0, 10.0).at(3.0, 4.0));
        h.run(root);
        let before = h.data(child);

        let pass = h.run(root);
        assert_eq!(pass.transforms_updated, 0);
        assert_eq!(h.data(child), before);
        assert_eq!(h.flags(child), UpdateFlags::empty());
    }

    #[test]
    fn test_dirty_parent_forces_descendants() {
        let mut h = Harness::new();
        let root = h.add(Box::new(Group), None, WidgetProps::sized(50.0, 50.0));
        let mid = h.add(Box::new(Group), Some(root), WidgetProps::sized(10.0, 10.0));
        let leaf = h.add(Box::new(Group), Some(mid), WidgetProps::sized(5.0, 5.0));
        h.world.draws.insert(h.tree.entity(leaf).unwrap(), DrawData::default());
        h.run(root);
        h.world
            .updates
            .get_mut(h.tree.entity(leaf).unwrap())
            .unwrap()
            .flags = UpdateFlags::empty();

        {
            let mut cx = SceneCx::new(&mut h.tree, &mut h.world, &mut h.animations);
            cx.set_position(mid, 7.0, 0.0);
        }
        let pass = h.run(root);
        assert_eq!(pass.transforms_updated, 2);
        assert_eq!(h.data(leaf).bbox.x0, 7.0);
        assert_eq!(h.flags(leaf), UpdateFlags::NEEDS_DRAWABLES_UPDATE);
    }

    #[test]
    fn test_layout_limit_reached() {
        let mut h = Harness::new();
        let root = h.add(Box::new(PingPong), None, WidgetProps::default());
        let child = h.add(Box::new(PingPong), Some(root), WidgetProps::default());
        let pass = h.run(root);

        assert_eq!(pass.layout_passes, LAYOUT_ITERATION_LIMIT as u32);
        assert!(!pass.layout_converged);
        assert!(h.flags(child).contains(UpdateFlags::NEEDS_WIDGET_UPDATE)
            || h.flags(root).contains(UpdateFlags::NEEDS_WIDGET_UPDATE));
    }

    #[test]
    fn test_layout_converges_without_dirty_widgets() {
        let mut h = Harness::new();
        let root = h.add(Box::new(Group), None, WidgetProps::default());
        let first = h.run(root);
        assert_eq!(first.layout_passes, 1);
        assert!(first.layout_converged);

        let second = h.run(root);
        assert_eq!(second.layout_passes, 0);
        assert!(second.layout_converged);
    }

    #[test]
    fn test_animations_marked_ready() {
        use crate::animation::{Property, Tween};

        let mut h = Harness::new();
        let root = h.add(Box::new(Group), None, WidgetProps::default());
        let id = h.animations.add(Box::new(Tween::new(root, Property::X, 1.0, 1.0)));
        assert!(!h.animations.is_ready(id));
        h.run(root);
        assert!(h.animations.is_ready(id));
    }

    /// Requests layout for itself `redirty` more times.
    struct SelfDirty {
        redirty: u32,
        runs: u32,
    }

    impl Widget for SelfDirty {
        fn as_layout(&mut self) -> Option<&mut dyn Layout> {
            Some(self)
        }
    }

    impl Layout for SelfDirty {
        fn layout(&mut self, id: WidgetId, cx: &mut SceneCx<'_>) {
            self.runs += 1;
            if self.redirty > 0 {
                self.redirty -= 1;
                cx.request_layout(id);
            }
        }
    }

    fn self_dirty_runs(h: &Harness, id: WidgetId) -> u32 {
        h.tree
            .with_widget(id, |w| (w as &dyn Any).downcast_ref::<SelfDirty>().map(|w| w.runs))
            .flatten()
            .unwrap()
    }

    #[test]
    fn test_self_redirty_runs_again() {
        let mut h = Harness::new();
        let root = h.add(Box::new(SelfDirty { redirty: 1, runs: 0 }), None, WidgetProps::default());
        let pass = h.run(root);

        assert_eq!(pass.layout_passes, 2);
        assert!(pass.layout_converged);
        assert_eq!(self_dirty_runs(&h, root), 2);
        assert!(!h.flags(root).contains(UpdateFlags::NEEDS_WIDGET_UPDATE));
    }

    #[test]
    fn test_self_redirty_counts_toward_limit() {
        let mut h = Harness::new();
        let root = h.add(Box::new(SelfDirty { redirty: u32::MAX, runs: 0 }), None, WidgetProps::default());
        let pass = h.run(root);

        assert_eq!(pass.layout_passes, LAYOUT_ITERATION_LIMIT as u32);
        assert!(!pass.layout_converged);
        assert_eq!(self_dirty_runs(&h, root), LAYOUT_ITERATION_LIMIT as u32);
        assert!(h.flags(root).contains(UpdateFlags::NEEDS_WIDGET_UPDATE));
    }

    struct Tick(Rc<Cell<u32>>);

    impl Animation for Tick {
        fn advance(&mut self, _dt: f32, _cx: &mut SceneCx<'_>) -> AnimationStatus {
            self.0.set(self.0.get() + 1);
            AnimationStatus::Running
        }
    }

    /// Starts a single [`Tick`] the first time it is laid out.
    struct Launcher {
        started: Rc<Cell<Option<AnimationId>>>,
        ticks: Rc<Cell<u32>>,
    }

    impl Widget for Launcher {
        fn as_layout(&mut self) -> Option<&mut dyn Layout> {
            Some(self)
        }
    }

    impl Layout for Launcher {
        fn layout(&mut self, _id: WidgetId, cx: &mut SceneCx<'_>) {
            if self.started.get().is_none() {
                let id = cx.start_animation(Tick(self.ticks.clone()));
                self.started.set(Some(id));
            }
        }
    }

    #[test]
    fn test_animation_started_in_layout_is_ready_after_update() {
        let started = Rc::new(Cell::new(None));
        let ticks = Rc::new(Cell::new(0));
        let mut scene = Scene::new(SceneConfig::default());
        let root = scene.root();
        scene
            .add_widget(
                root,
                Launcher {
                    started: started.clone(),
                    ticks: ticks.clone(),
                },
            )
            .unwrap();

        // Nothing to step before the layout that creates it
        assert_eq!(scene.animate(0.016), 0);
        assert_eq!(ticks.get(), 0);
        assert!(started.get().is_none());

        scene.update().unwrap();
        let id = started.get().unwrap();
        assert!(scene.animations().contains(id));
        assert!(scene.animations().is_ready(id));
        assert_eq!(ticks.get(), 0);

        assert_eq!(scene.animate(0.016), 1);
        assert_eq!(ticks.get(), 1);
    }
}
