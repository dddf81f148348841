//! Clip region assignment.
//!
//! Region 0 is always the root's world bounding box. A widget with its clip
//! flag set opens a new region, the intersection of its own bounding box with
//! the enclosing region; everything below it inherits that region until
//! another clipping widget narrows it further. Non-clipping widgets inherit
//! their parent's region.

use crate::ecs::World;
use crate::error::{Result, SceneError};
use crate::geometry::BBox;
use crate::tree::{WidgetId, WidgetTree};

/// Maximum number of regions, bounded by the clip field of the draw key.
pub const MAX_CLIP_REGIONS: usize = 256;

enum Visit {
    Enter { id: WidgetId, inherited: u8 },
    /// All children of a clipping widget are done
    Exit,
}

/// Scratch state for the clip walk, kept between frames.
#[derive(Default)]
pub(crate) struct ClipWalker {
    stack: Vec<BBox>,
    work: Vec<Visit>,
}

impl ClipWalker {
    /// Assign clip ids to every widget under `root`, refilling `regions`.
    pub(crate) fn assign(
        &mut self,
        root: WidgetId,
        tree: &mut WidgetTree,
        world: &mut World,
        regions: &mut Vec<BBox>,
    ) -> Result<()> {
        let root_bbox = root_bbox(root, tree, world);
        regions.clear();
        regions.push(root_bbox);

        self.stack.clear();
        self.stack.push(root_bbox);
        self.work.clear();
        self.work.push(Visit::Enter { id: root, inherited: 0 });

        while let Some(visit) = self.work.pop() {
            let (id, inherited) = match visit {
                Visit::Exit => {
                    self.stack.pop();
                    continue;
                }
                Visit::Enter { id, inherited } => (id, inherited),
            };

            let clips = id != root && tree.props(id).is_some_and(|p| p.clip);
            let clip_id = if clips {
                if regions.len() >= MAX_CLIP_REGIONS {
                    return Err(SceneError::ClipRegionOverflow {
                        max: MAX_CLIP_REGIONS,
                    });
                }
                let own = tree
                    .entity(id)
                    .and_then(|e| world.transforms.get(e))
                    .map(|t| t.bbox)
                    .unwrap_or_default();
                let top = self.stack.last().copied().unwrap_or(root_bbox);
                let region = top.intersection(&own);
                regions.push(region);
                self.stack.push(region);
                self.work.push(Visit::Exit);
                (regions.len() - 1) as u8
            } else {
                inherited
            };

            set_clip_id(id, clip_id, tree, world);

            for &child in tree.children(id).iter().rev() {
                self.work.push(Visit::Enter {
                    id: child,
                    inherited: clip_id,
                });
            }
        }
        Ok(())
    }

    /// Clipping disabled: a single region, and every widget in it.
    pub(crate) fn reset(&mut self, root: WidgetId, tree: &mut WidgetTree, world: &mut World, regions: &mut Vec<BBox>) {
        regions.clear();
        regions.push(root_bbox(root, tree, world));
        for id in tree.subtree(root) {
            set_clip_id(id, 0, tree, world);
        }
    }
}

fn root_bbox(root: WidgetId, tree: &WidgetTree, world: &World) -> BBox {
    tree.entity(root)
        .and_then(|e| world.transforms.get(e))
        .map(|t| t.bbox)
        .unwrap_or_default()
}

/// Record a widget's clip id and let a drawable mirror it into its key.
fn set_clip_id(id: WidgetId, clip_id: u8, tree: &mut WidgetTree, world: &mut World) {
    if tree.clip_id(id) == Some(clip_id) {
        return;
    }
    tree.set_clip_id(id, clip_id);

    let Some(entity) = tree.entity(id) else {
        return;
    };
    let Some(mut widget) = tree.take_widget(id) else {
        return;
    };
    if let (Some(drawable), Some(draw)) = (widget.as_drawable(), world.draws.get_mut(entity)) {
        drawable.on_clip_id_changed(clip_id, draw);
    }
    tree.restore_widget(id, widget);
}
