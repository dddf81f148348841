//! Entity/component store.
//!
//! Each scene object owns one [`Entity`] for its lifetime. Its state is split
//! into independently stored fragments, one [`Components`] store per kind, so
//! every system iterates only the data it works on.

mod entity;
mod storage;

pub use entity::Entity;
pub use storage::Components;

use entity::EntityAllocator;

use crate::components::{DrawData, RenderData, TransformData, UpdateData};

/// All component stores for a scene.
#[derive(Debug, Default)]
pub struct World {
    allocator: EntityAllocator,
    pub transforms: Components<TransformData>,
    pub updates: Components<UpdateData>,
    pub draws: Components<DrawData>,
    pub renders: Components<RenderData>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self) -> Entity {
        self.allocator.allocate()
    }

    /// Destroy an entity and remove every component it carries.
    ///
    /// Returns false if the entity was already gone.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.allocator.free(entity) {
            return false;
        }
        self.transforms.remove(entity);
        self.updates.remove(entity);
        self.draws.remove(entity);
        self.renders.remove(entity);
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }
}
