/// Opaque handle correlating the component fragments of one scene object.
///
/// Uses a generational index design:
/// - `index`: Slot in the component sparse arrays (reusable after despawn)
/// - `generation`: Version counter that increments when a slot is reused
///
/// A stale `Entity` therefore never resolves to components that belong to a
/// newer entity allocated in the same slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Entity {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl Entity {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Combines generation (high bits) with index (low bits).
    pub fn as_u64(self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }
}

/// Hands out entity ids and recycles despawned slots.
#[derive(Debug, Default)]
pub(crate) struct EntityAllocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free_indices: Vec<u32>,
}

impl EntityAllocator {
    pub(crate) fn allocate(&mut self) -> Entity {
        if let Some(index) = self.free_indices.pop() {
            let slot = index as usize;
            self.generations[slot] = self.generations[slot].wrapping_add(1);
            self.alive[slot] = true;
            Entity::new(index, self.generations[slot])
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.alive.push(true);
            Entity::new(index, 0)
        }
    }

    /// Returns false if the entity was already dead or stale.
    pub(crate) fn free(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        self.alive[entity.index as usize] = false;
        self.free_indices.push(entity.index);
        true
    }

    pub(crate) fn is_alive(&self, entity: Entity) -> bool {
        let slot = entity.index as usize;
        slot < self.generations.len()
            && self.alive[slot]
            && self.generations[slot] == entity.generation
    }

    pub(crate) fn alive_count(&self) -> usize {
        self.generations.len() - self.free_indices.len()
    }
}
