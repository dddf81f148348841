use crate::align::Axis;
use crate::context::SceneCx;
use crate::tree::WidgetId;

use super::{Layout, Widget, WidgetProps};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MainAxisAlignment {
    #[default]
    Start,
    Center,
    End,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossAxisAlignment {
    Start,
    #[default]
    Center,
    End,
    /// Children take the container's cross size
    Stretch,
}

/// Lays its children out in a line, in child order.
///
/// With `Start` main-axis alignment the container sizes itself to its
/// content; every other main-axis alignment distributes children inside the
/// container's current main size. The cross size is the largest child's,
/// except for `Stretch`, which keeps the container's own cross size and
/// resizes the children to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Flex {
    direction: Axis,
    spacing: f32,
    main_axis_alignment: MainAxisAlignment,
    cross_axis_alignment: CrossAxisAlignment,
}

impl Flex {
    pub fn new(direction: Axis) -> Self {
        Self {
            direction,
            spacing: 0.0,
            main_axis_alignment: MainAxisAlignment::Start,
            cross_axis_alignment: CrossAxisAlignment::Center,
        }
    }

    pub fn row() -> Self {
        Self::new(Axis::Horizontal)
    }

    pub fn column() -> Self {
        Self::new(Axis::Vertical)
    }

    pub fn spacing(mut self, spacing: f32) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn main_axis_alignment(mut self, alignment: MainAxisAlignment) -> Self {
        self.main_axis_alignment = alignment;
        self
    }

    pub fn cross_axis_alignment(mut self, alignment: CrossAxisAlignment) -> Self {
        self.cross_axis_alignment = alignment;
        self
    }

    pub fn direction(&self) -> Axis {
        self.direction
    }

    fn main(&self, props: &WidgetProps) -> f32 {
        match self.direction {
            Axis::Horizontal => props.width,
            Axis::Vertical => props.height,
        }
    }

    fn cross(&self, props: &WidgetProps) -> f32 {
        match self.direction {
            Axis::Horizontal => props.height,
            Axis::Vertical => props.width,
        }
    }

    /// Initial offset and distance between children for the main axis.
    fn main_axis_spacing(&self, free_space: f32, child_count: usize) -> (f32, f32) {
        let spacing = self.spacing;
        match self.main_axis_alignment {
            MainAxisAlignment::Start => (0.0, spacing),
            MainAxisAlignment::Center => (free_space / 2.0, spacing),
            MainAxisAlignment::End => (free_space, spacing),
            MainAxisAlignment::SpaceBetween => {
                if child_count > 1 {
                    (0.0, free_space / (child_count - 1) as f32 + spacing)
                } else {
                    (0.0, spacing)
                }
            }
            MainAxisAlignment::SpaceAround => {
                let space = free_space / child_count as f32;
                (space / 2.0, space + spacing)
            }
            MainAxisAlignment::SpaceEvenly => {
                let space = free_space / (child_count + 1) as f32;
                (space, space + spacing)
            }
        }
    }
}

pub fn row() -> Flex {
    Flex::row()
}

pub fn column() -> Flex {
    Flex::column()
}

impl Widget for Flex {
    fn as_layout(&mut self) -> Option<&mut dyn Layout> {
        Some(self)
    }
}

impl Layout for Flex {
    fn layout(&mut self, id: WidgetId, cx: &mut SceneCx<'_>) {
        let Some(own) = cx.props(id).copied() else {
            return;
        };
        let children = cx.children(id).to_vec();

        // Measure
        let mut sizes = Vec::with_capacity(children.len());
        let mut children_main = 0.0f32;
        let mut max_cross = 0.0f32;
        for &child in &children {
            let props = cx.props(child).copied().unwrap_or_default();
            let (main, cross) = (self.main(&props), self.cross(&props));
            children_main += main;
            max_cross = max_cross.max(cross);
            sizes.push((main, cross));
        }
        let total_spacing = if children.len() > 1 {
            self.spacing * (children.len() - 1) as f32
        } else {
            0.0
        };

        let main_size = match self.main_axis_alignment {
            MainAxisAlignment::Start => children_main + total_spacing,
            _ => self.main(&own),
        };
        let cross_size = match self.cross_axis_alignment {
            CrossAxisAlignment::Stretch => self.cross(&own),
            _ => max_cross,
        };

        let (width, height) = match self.direction {
            Axis::Horizontal => (main_size, cross_size),
            Axis::Vertical => (cross_size, main_size),
        };
        cx.set_size(id, width, height);

        // Position
        let free_space = (main_size - children_main - total_spacing).max(0.0);
        let (initial_offset, between) = self.main_axis_spacing(free_space, children.len());

        let mut main_pos = initial_offset;
        for (&child, &(child_main, child_cross)) in children.iter().zip(&sizes) {
            let cross_pos = match self.cross_axis_alignment {
                CrossAxisAlignment::Start | CrossAxisAlignment::Stretch => 0.0,
                CrossAxisAlignment::Center => (cross_size - child_cross) / 2.0,
                CrossAxisAlignment::End => cross_size - child_cross,
            };
            let stretch = self.cross_axis_alignment == CrossAxisAlignment::Stretch;
            let direction = self.direction;
            cx.modify(child, |p| {
                let (x, y) = match direction {
                    Axis::Horizontal => (main_pos, cross_pos),
                    Axis::Vertical => (cross_pos, main_pos),
                };
                p.x = x;
                p.y = y;
                if stretch {
                    match direction {
                        Axis::Horizontal => p.height = cross_size,
                        Axis::Vertical => p.width = cross_size,
                    }
                }
            });
            main_pos += child_main + between;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Animations;
    use crate::components::{TransformData, UpdateData, UpdateFlags};
    use crate::ecs::World;
    use crate::tree::WidgetTree;
    use crate::widgets::Group;

    struct Fixture {
        tree: WidgetTree,
        world: World,
        animations: Animations,
        root: WidgetId,
    }

    impl Fixture {
        fn new(flex: Flex, props: WidgetProps, children: &[(f32, f32)]) -> Self {
            let mut tree = WidgetTree::new();
            let mut world = World::new();
            let root = Self::add(&mut tree, &mut world, Box::new(flex), props);
            for &(w, h) in children {
                let child = Self::add(&mut tree, &mut world, Box::new(Group), WidgetProps::sized(w, h));
                tree.set_parent(child, root);
            }
            Self {
                tree,
                world,
                animations: Animations::new(),
                root,
            }
        }

        fn add(
            tree: &mut WidgetTree,
            world: &mut World,
            widget: Box<dyn Widget>,
            props: WidgetProps,
        ) -> WidgetId {
            let entity = world.spawn();
            let id = tree.register(widget, entity, props);
            world.transforms.insert(entity, TransformData::default());
            world.updates.insert(entity, UpdateData::new(id, UpdateFlags::empty()));
            id
        }

        fn layout(&mut self) -> Vec<WidgetProps> {
            let root = self.root;
            let mut cx = SceneCx::new(&mut self.tree, &mut self.world, &mut self.animations);
            cx.run_layout(root);
            self.tree
                .subtree(root)
                .into_iter()
                .filter_map(|id| self.tree.props(id).copied())
                .collect()
        }
    }

    #[test]
    fn test_row_sizes_to_content() {
        let mut fx = Fixture::new(
            Flex::row().spacing(5.0),
            WidgetProps::default(),
            &[(10.0, 20.0), (30.0, 10.0)],
        );
        let props = fx.layout();
        assert_eq!((props[0].width, props[0].height), (45.0, 20.0));
        assert_eq!((props[1].x, props[1].y), (0.0, 0.0));
        // Centered on the cross axis by default
        assert_eq!((props[2].x, props[2].y), (15.0, 5.0));
    }

    #[test]
    fn test_column_space_between_uses_own_height() {
        let mut fx = Fixture::new(
            Flex::column()
                .main_axis_alignment(MainAxisAlignment::SpaceBetween)
                .cross_axis_alignment(CrossAxisAlignment::Start),
            WidgetProps::sized(0.0, 100.0),
            &[(10.0, 10.0), (10.0, 10.0), (20.0, 10.0)],
        );
        let props = fx.layout();
        assert_eq!((props[0].width, props[0].height), (20.0, 100.0));
        assert_eq!(props[1].y, 0.0);
        assert_eq!(props[2].y, 45.0);
        assert_eq!(props[3].y, 90.0);
    }

    #[test]
    fn test_stretch_resizes_children() {
        let mut fx = Fixture::new(
            Flex::row().cross_axis_alignment(CrossAxisAlignment::Stretch),
            WidgetProps::sized(0.0, 40.0),
            &[(10.0, 5.0)],
        );
        let props = fx.layout();
        assert_eq!(props[0].height, 40.0);
        assert_eq!(props[1].height, 40.0);
    }

    #[test]
    fn test_layout_dirties_moved_children_and_self() {
        let mut fx = Fixture::new(Flex::row(), WidgetProps::default(), &[(10.0, 10.0), (10.0, 10.0)]);
        fx.layout();
        let second = fx.tree.children(fx.root)[1];
        let flags = |fx: &Fixture, id: WidgetId| {
            fx.tree
                .entity(id)
                .and_then(|e| fx.world.updates.get(e))
                .map(|u| u.flags)
                .unwrap_or_default()
        };
        assert!(flags(&fx, second).contains(UpdateFlags::NEEDS_TRANSFORM_UPDATE));
        // The container resized itself, so it asks for another layout
        assert!(flags(&fx, fx.root).contains(UpdateFlags::NEEDS_WIDGET_UPDATE));
    }
}
