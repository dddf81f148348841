//! Frame-driven animations.
//!
//! Animations are registered at any time but only advance once they have been
//! marked ready. The transform system marks every registered animation ready
//! at the end of its pass, so an animation started while layout or transform
//! state is still being settled never observes stale sizes or matrices: its
//! first step happens in the animation pass after that transform pass.

mod timing;
mod tween;

pub use timing::TimingFunction;
pub use tween::{Property, Tween};

use crate::context::SceneCx;
use crate::ecs::World;
use crate::tree::WidgetTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationStatus {
    Running,
    Finished,
}

/// A time-driven change applied to the scene through a [`SceneCx`].
pub trait Animation {
    /// Step by `dt` seconds.
    fn advance(&mut self, dt: f32, cx: &mut SceneCx<'_>) -> AnimationStatus;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationId(u64);

struct Entry {
    id: AnimationId,
    ready: bool,
    animation: Box<dyn Animation>,
}

/// Registry of running animations.
#[derive(Default)]
pub struct Animations {
    entries: Vec<Entry>,
    next_id: u64,
    /// Ids of the entries moved out for the current advance pass
    stepping: Vec<AnimationId>,
    /// Removals requested while the entries are out being advanced
    pending_removals: Vec<AnimationId>,
}

impl std::fmt::Debug for Animations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Animations")
            .field("len", &self.entries.len())
            .field("ready", &self.ready_count())
            .finish()
    }
}

impl Animations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an animation. It is not ready until the next
    /// [`mark_all_ready`](Self::mark_all_ready).
    pub fn add(&mut self, animation: Box<dyn Animation>) -> AnimationId {
        let id = AnimationId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            ready: false,
            animation,
        });
        id
    }

    pub fn remove(&mut self, id: AnimationId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        if self.entries.len() != before {
            return true;
        }
        if self.stepping.contains(&id) && !self.pending_removals.contains(&id) {
            self.pending_removals.push(id);
            return true;
        }
        false
    }

    pub fn contains(&self, id: AnimationId) -> bool {
        self.entries.iter().any(|e| e.id == id)
            || (self.stepping.contains(&id) && !self.pending_removals.contains(&id))
    }

    pub fn is_ready(&self, id: AnimationId) -> bool {
        self.entries.iter().any(|e| e.id == id && e.ready)
    }

    pub fn mark_all_ready(&mut self) {
        for entry in &mut self.entries {
            entry.ready = true;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ready_count(&self) -> usize {
        self.entries.iter().filter(|e| e.ready).count()
    }
}

/// Advance every ready animation by `dt` seconds and drop finished ones.
///
/// Animations added by a running animation land in the registry unready.
/// Returns the number of animations that were stepped.
pub(crate) fn advance(tree: &mut WidgetTree, world: &mut World, animations: &mut Animations, dt: f32) -> usize {
    let mut entries = std::mem::take(&mut animations.entries);
    animations.stepping = entries.iter().map(|e| e.id).collect();

    let mut stepped = 0;
    let mut finished = Vec::new();
    for entry in entries.iter_mut().filter(|e| e.ready) {
        // Removed earlier in this pass by another animation
        if animations.pending_removals.contains(&entry.id) {
            continue;
        }
        let mut cx = SceneCx::new(tree, world, animations);
        if entry.animation.advance(dt, &mut cx) == AnimationStatus::Finished {
            finished.push(entry.id);
        }
        stepped += 1;
    }

    animations.stepping.clear();
    let removed = std::mem::take(&mut animations.pending_removals);
    entries.retain(|e| !finished.contains(&e.id) && !removed.contains(&e.id));
    entries.append(&mut animations.entries);
    animations.entries = entries;
    stepped
}
