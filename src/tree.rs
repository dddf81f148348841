//! Widget arena.
//!
//! Widgets live in a dense `Vec` addressed through a slot table, so a
//! [`WidgetId`] stays valid while other widgets come and go and goes stale
//! once its own widget is removed. Each node also holds the widget's entity,
//! its [`WidgetProps`], its parent and children, and the clip id last assigned
//! by the draw system. A parent owns its children; a child knows its parent by
//! id only.

use crate::ecs::Entity;
use crate::widgets::{Widget, WidgetProps};

/// Generational handle to a widget.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct WidgetId {
    slot: u32,
    generation: u32,
}

impl WidgetId {
    /// An id that never resolves, for entities that do not belong to a widget.
    pub fn placeholder() -> Self {
        Self {
            slot: u32::MAX,
            generation: u32::MAX,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        *self == Self::placeholder()
    }
}

#[derive(Default)]
struct Slot {
    generation: u32,
    /// Position in `nodes` while occupied
    node: Option<usize>,
}

struct Node {
    id: WidgetId,
    /// `None` only while taken out to run one of the widget's callbacks
    widget: Option<Box<dyn Widget>>,
    entity: Entity,
    props: WidgetProps,
    parent: Option<WidgetId>,
    children: Vec<WidgetId>,
    clip_id: u8,
}

#[derive(Default)]
pub struct WidgetTree {
    nodes: Vec<Node>,
    slots: Vec<Slot>,
    vacant: Vec<u32>,
}

impl WidgetTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a parentless widget. Attach it with [`set_parent`](Self::set_parent).
    pub fn register(&mut self, widget: Box<dyn Widget>, entity: Entity, props: WidgetProps) -> WidgetId {
        let slot = match self.vacant.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let entry = &mut self.slots[slot as usize];
        entry.node = Some(self.nodes.len());
        let id = WidgetId {
            slot,
            generation: entry.generation,
        };

        self.nodes.push(Node {
            id,
            widget: Some(widget),
            entity,
            props,
            parent: None,
            children: Vec::new(),
            clip_id: 0,
        });
        id
    }

    /// Remove one widget, detaching it from its parent. Its children keep a
    /// stale parent id; whole subtrees are removed by walking
    /// [`subtree`](Self::subtree) first.
    pub fn unregister(&mut self, id: WidgetId) -> Option<(Option<Box<dyn Widget>>, Entity)> {
        let index = self.index(id)?;
        if let Some(parent) = self.nodes[index].parent {
            if let Some(parent) = self.node_mut(parent) {
                parent.children.retain(|&child| child != id);
            }
        }

        let node = self.nodes.swap_remove(index);
        if let Some(moved) = self.nodes.get(index) {
            self.slots[moved.id.slot as usize].node = Some(index);
        }
        let slot = &mut self.slots[id.slot as usize];
        slot.node = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.vacant.push(id.slot);

        Some((node.widget, node.entity))
    }

    fn index(&self, id: WidgetId) -> Option<usize> {
        self.slots
            .get(id.slot as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node)
    }

    fn node(&self, id: WidgetId) -> Option<&Node> {
        self.index(id).map(|i| &self.nodes[i])
    }

    fn node_mut(&mut self, id: WidgetId) -> Option<&mut Node> {
        self.index(id).map(move |i| &mut self.nodes[i])
    }

    pub fn contains(&self, id: WidgetId) -> bool {
        self.index(id).is_some()
    }

    /// Borrow a widget. `None` while the widget is taken.
    pub fn with_widget<R>(&self, id: WidgetId, f: impl FnOnce(&dyn Widget) -> R) -> Option<R> {
        self.node(id).and_then(|node| node.widget.as_deref()).map(f)
    }

    /// Move a widget out so its callback can borrow the rest of the scene
    /// mutably. Pair with [`restore_widget`](Self::restore_widget).
    pub(crate) fn take_widget(&mut self, id: WidgetId) -> Option<Box<dyn Widget>> {
        self.node_mut(id).and_then(|node| node.widget.take())
    }

    /// Put a taken widget back. Dropped if the widget was removed meanwhile.
    pub(crate) fn restore_widget(&mut self, id: WidgetId, widget: Box<dyn Widget>) {
        if let Some(node) = self.node_mut(id) {
            node.widget = Some(widget);
        }
    }

    /// Append `child` to the children of `parent`.
    pub fn set_parent(&mut self, child: WidgetId, parent: WidgetId) {
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            if !node.children.contains(&child) {
                node.children.push(child);
            }
        }
    }

    pub fn parent(&self, id: WidgetId) -> Option<WidgetId> {
        self.node(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: WidgetId) -> &[WidgetId] {
        self.node(id).map_or(&[], |node| node.children.as_slice())
    }

    pub fn entity(&self, id: WidgetId) -> Option<Entity> {
        self.node(id).map(|node| node.entity)
    }

    pub fn props(&self, id: WidgetId) -> Option<&WidgetProps> {
        self.node(id).map(|node| &node.props)
    }

    pub(crate) fn props_mut(&mut self, id: WidgetId) -> Option<&mut WidgetProps> {
        self.node_mut(id).map(|node| &mut node.props)
    }

    pub fn clip_id(&self, id: WidgetId) -> Option<u8> {
        self.node(id).map(|node| node.clip_id)
    }

    pub(crate) fn set_clip_id(&mut self, id: WidgetId, clip_id: u8) {
        if let Some(node) = self.node_mut(id) {
            node.clip_id = clip_id;
        }
    }

    /// `id` followed by all its descendants, in pre-order.
    pub fn subtree(&self, id: WidgetId) -> Vec<WidgetId> {
        let mut out = Vec::new();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            pending.extend(self.children(current).iter().rev());
        }
        out
    }

    /// Ids of all widgets, in storage order.
    pub fn ids(&self) -> impl Iterator<Item = WidgetId> + '_ {
        self.nodes.iter().map(|node| node.id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::World;
    use crate::widgets::Group;

    fn register(tree: &mut WidgetTree, world: &mut World) -> WidgetId {
        tree.register(Box::new(Group), world.spawn(), WidgetProps::default())
    }

    #[test]
    fn test_tree_register_unregister() {
        let mut world = World::new();
        let mut tree = WidgetTree::new();
        let id = register(&mut tree, &mut world);
        assert!(tree.contains(id));
        assert!(!id.is_placeholder());
        assert!(!tree.contains(WidgetId::placeholder()));

        let (widget, _) = tree.unregister(id).unwrap();
        assert!(widget.is_some());
        assert!(!tree.contains(id));
        assert!(tree.unregister(id).is_none());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_tree_generational_index() {
        let mut world = World::new();
        let mut tree = WidgetTree::new();

        let id1 = register(&mut tree, &mut world);
        tree.unregister(id1);

        let id2 = register(&mut tree, &mut world);

        assert!(!tree.contains(id1));
        assert!(tree.contains(id2));
        assert_eq!(id1.slot, id2.slot);
        assert_ne!(id1.generation, id2.generation);
    }

    #[test]
    fn test_tree_parent_child() {
        let mut world = World::new();
        let mut tree = WidgetTree::new();
        let parent_id = register(&mut tree, &mut world);
        let child_id = register(&mut tree, &mut world);

        tree.set_parent(child_id, parent_id);

        assert_eq!(tree.parent(child_id), Some(parent_id));
        assert_eq!(tree.children(parent_id), &[child_id]);

        tree.unregister(child_id);
        assert!(tree.children(parent_id).is_empty());
    }

    #[test]
    fn test_tree_swap_remove_fixup() {
        let mut world = World::new();
        let mut tree = WidgetTree::new();

        let id1 = register(&mut tree, &mut world);
        let id2 = register(&mut tree, &mut world);
        let id3 = register(&mut tree, &mut world);

        tree.unregister(id1);

        assert!(!tree.contains(id1));
        assert!(tree.with_widget(id2, |_| ()).is_some());
        assert!(tree.with_widget(id3, |_| ()).is_some());
        assert_eq!(tree.ids().collect::<Vec<_>>(), vec![id3, id2]);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_subtree_pre_order() {
        let mut world = World::new();
        let mut tree = WidgetTree::new();
        let root = register(&mut tree, &mut world);
        let a = register(&mut tree, &mut world);
        let b = register(&mut tree, &mut world);
        let a1 = register(&mut tree, &mut world);
        tree.set_parent(a, root);
        tree.set_parent(b, root);
        tree.set_parent(a1, a);

        assert_eq!(tree.subtree(root), vec![root, a, a1, b]);
        assert_eq!(tree.subtree(b), vec![b]);
    }

    #[test]
    fn test_take_and_restore_widget() {
        let mut world = World::new();
        let mut tree = WidgetTree::new();
        let id = register(&mut tree, &mut world);

        let widget = tree.take_widget(id).unwrap();
        assert!(tree.with_widget(id, |_| ()).is_none());
        tree.restore_widget(id, widget);
        assert!(tree.with_widget(id, |_| ()).is_some());
    }
}
