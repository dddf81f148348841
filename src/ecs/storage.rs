//! Sparse-set component storage.
//!
//! Components of one kind are stored contiguously in a dense `Vec` for
//! cache-friendly iteration, with a sparse map indexed by entity slot for O(1)
//! lookup. Removal swap-removes from the dense array and fixes up the sparse
//! entry of the moved element, so storage never has holes.

use super::Entity;

/// Entry in the sparse map, pointing to a dense array slot.
#[derive(Clone, Copy, Debug)]
struct SparseEntry {
    dense_index: u32,
    generation: u32,
}

/// Storage for one component kind, keyed by [`Entity`].
#[derive(Debug)]
pub struct Components<T> {
    dense: Vec<T>,
    /// Owning entity of each dense slot (for swap-remove fixup and iteration)
    entities: Vec<Entity>,
    sparse: Vec<Option<SparseEntry>>,
}

impl<T> Default for Components<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Components<T> {
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            entities: Vec::new(),
            sparse: Vec::new(),
        }
    }

    fn dense_index(&self, entity: Entity) -> Option<usize> {
        self.sparse
            .get(entity.index as usize)
            .and_then(|e| e.as_ref())
            .filter(|e| e.generation == entity.generation)
            .map(|e| e.dense_index as usize)
    }

    /// Insert or replace the component for `entity`. Returns the previous value.
    pub fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        if let Some(idx) = self.dense_index(entity) {
            return Some(std::mem::replace(&mut self.dense[idx], value));
        }

        let slot = entity.index as usize;
        if slot >= self.sparse.len() {
            self.sparse.resize(slot + 1, None);
        }
        // A stale entry from an older generation is simply overwritten; its
        // dense slot must already have been removed by `World::despawn`.
        self.sparse[slot] = Some(SparseEntry {
            dense_index: self.dense.len() as u32,
            generation: entity.generation,
        });
        self.dense.push(value);
        self.entities.push(entity);
        None
    }

    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let dense_index = self.dense_index(entity)?;
        let last = self.dense.len() - 1;

        let value = self.dense.swap_remove(dense_index);
        self.entities.swap_remove(dense_index);

        // Fix up the moved element's sparse entry
        if dense_index != last {
            let moved = self.entities[dense_index];
            if let Some(entry) = self.sparse[moved.index as usize].as_mut() {
                entry.dense_index = dense_index as u32;
            }
        }

        self.sparse[entity.index as usize] = None;
        Some(value)
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.dense_index(entity).map(|idx| &self.dense[idx])
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.dense_index(entity).map(move |idx| &mut self.dense[idx])
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.dense_index(entity).is_some()
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Entities that currently carry this component, in dense order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.dense.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.entities.iter().copied().zip(self.dense.iter_mut())
    }

    pub fn clear(&mut self) {
        self.dense.clear();
        self.entities.clear();
        self.sparse.clear();
    }
}
