//! Sorting and batching of draw items.
//!
//! After sorting, items with identical keys are contiguous within each
//! transparency class. [`plan_batches`] walks a sorted list once, cutting it
//! into maximal runs of identical keys and then splitting each run wherever
//! its accumulated vertex bytes would overflow the geometry layout's block.

use std::cmp::Ordering;
use std::ops::Range;

use crate::draw_key::DrawKey;
use crate::ecs::Entity;
use crate::error::{Result, SceneError};
use crate::registry::RenderRegistry;

/// One visible draw item collected for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortItem {
    pub entity: Entity,
    pub key: DrawKey,
    /// World depth; larger is closer to the camera
    pub depth: f32,
    /// Length of the item's vertex bytes
    pub bytes: usize,
}

/// Opaque order: key ascending; within equal keys, closest first.
///
/// Not stable. Relative order of items that share both key and depth is
/// unspecified, which is fine under a depth test.
pub fn sort_opaque(items: &mut [SortItem]) {
    items.sort_unstable_by(|a, b| a.key.cmp(&b.key).then_with(|| b.depth.total_cmp(&a.depth)));
}

/// Transparent order: back to front, then key. Stable, so coincident items
/// keep their collection order from frame to frame.
pub fn sort_transparent(items: &mut [SortItem]) {
    items.sort_by(|a, b| match a.depth.total_cmp(&b.depth) {
        Ordering::Equal => a.key.cmp(&b.key),
        other => other,
    });
}

/// A run of sorted items merged into one draw call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub key: DrawKey,
    /// Indices into the sorted item list
    pub items: Range<usize>,
    /// Total vertex bytes of the run
    pub bytes: usize,
}

/// Split a sorted item list into draw calls.
///
/// Two items share a batch only if their keys are identical and their bytes
/// fit together in one block of the key's geometry layout. An item that alone
/// exceeds its block is a configuration error.
pub fn plan_batches(items: &[SortItem], registry: &RenderRegistry) -> Result<Vec<Batch>> {
    let mut batches: Vec<Batch> = Vec::new();
    let mut block_size = 0;

    for (index, item) in items.iter().enumerate() {
        let same_key = batches.last().is_some_and(|b| b.key == item.key);
        if !same_key {
            let layout_id = item.key.geometry_layout();
            block_size = registry
                .geometry_layout(layout_id)
                .map(|layout| layout.block_size)
                .ok_or(SceneError::UnknownGeometryLayout(layout_id))?;
        }

        if item.bytes > block_size {
            log::error!(
                "Draw item {:?} has {} vertex bytes but its geometry layout holds {} per block",
                item.entity,
                item.bytes,
                block_size
            );
            return Err(SceneError::BatchItemTooLarge {
                entity: item.entity,
                bytes: item.bytes,
                block_size,
            });
        }

        match batches.last_mut() {
            Some(batch) if same_key && batch.bytes + item.bytes <= block_size => {
                batch.items.end = index + 1;
                batch.bytes += item.bytes;
            }
            _ => batches.push(Batch {
                key: item.key,
                items: index..index + 1,
                bytes: item.bytes,
            }),
        }
    }

    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw_key::KeyField;
    use crate::ecs::World;

    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x4];

    /// Registry with layout 0 (block 64 bytes) and layout 1 (block 1024 bytes).
    fn registry() -> RenderRegistry {
        let mut reg = RenderRegistry::new();
        let layout = wgpu::VertexBufferLayout {
            array_stride: 16,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRS,
        };
        reg.register_geometry_layout("small", layout.clone(), 64).unwrap();
        reg.register_geometry_layout("large", layout, 1024).unwrap();
        reg
    }

    fn key(shader: u64, layout: u64) -> DrawKey {
        DrawKey::default()
            .with(KeyField::Shader, shader)
            .with(KeyField::GeometryLayout, layout)
    }

    fn items(specs: &[(DrawKey, f32, usize)]) -> Vec<SortItem> {
        let mut world = World::new();
        specs
            .iter()
            .map(|&(key, depth, bytes)| SortItem {
                entity: world.spawn(),
                key,
                depth,
                bytes,
            })
            .collect()
    }

    #[test]
    fn test_opaque_sort_key_then_closest_first() {
        let mut list = items(&[(key(2, 1), 0.0, 16), (key(1, 1), 1.0, 16), (key(1, 1), 5.0, 16)]);
        sort_opaque(&mut list);
        assert_eq!(list[0].key, key(1, 1));
        assert_eq!(list[0].depth, 5.0);
        assert_eq!(list[1].depth, 1.0);
        assert_eq!(list[2].key, key(2, 1));
    }

    #[test]
    fn test_transparent_sort_back_to_front_and_stable() {
        let a = key(1, 1);
        let mut list = items(&[(a, 3.0, 16), (a, 1.0, 16), (a, 1.0, 32), (key(0, 1), 3.0, 16)]);
        let original = list.clone();
        sort_transparent(&mut list);

        let depths: Vec<f32> = list.iter().map(|i| i.depth).collect();
        assert_eq!(depths, vec![1.0, 1.0, 3.0, 3.0]);
        // Equal depth and key keep their input order
        assert_eq!(list[0].entity, original[1].entity);
        assert_eq!(list[1].entity, original[2].entity);
        // Equal depth, different key: key order
        assert_eq!(list[2].key, key(0, 1));

        let again = {
            let mut copy = list.clone();
            sort_transparent(&mut copy);
            copy
        };
        assert_eq!(again, list);
    }

    #[test]
    fn test_batches_group_equal_keys() {
        let reg = registry();
        let mut list = items(&[
            (key(1, 1), 0.0, 96),
            (key(2, 1), 0.0, 96),
            (key(1, 1), 1.0, 96),
            (key(1, 1), 2.0, 0),
        ]);
        sort_opaque(&mut list);
        let batches = plan_batches(&list, &reg).unwrap();

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].key, key(1, 1));
        assert_eq!(batches[0].items, 0..3);
        assert_eq!(batches[0].bytes, 192);
        assert_eq!(batches[1].items, 3..4);
    }

    #[test]
    fn test_batches_split_at_block_size() {
        let reg = registry();
        let k = key(0, 0);
        let list = items(&[(k, 0.0, 32), (k, 0.0, 32), (k, 0.0, 16), (k, 0.0, 48)]);
        let batches = plan_batches(&list, &reg).unwrap();

        let ranges: Vec<_> = batches.iter().map(|b| b.items.clone()).collect();
        assert_eq!(ranges, vec![0..2, 2..4]);
        assert!(batches.iter().all(|b| b.bytes <= 64));
    }

    #[test]
    fn test_every_batch_is_one_key_and_fits() {
        let reg = registry();
        let mut specs = Vec::new();
        for i in 0..40usize {
            let k = key((i % 3) as u64, (i % 2) as u64);
            specs.push((k, (i % 5) as f32, 16 * (i % 4 + 1)));
        }
        let mut list = items(&specs);
        sort_opaque(&mut list);
        let batches = plan_batches(&list, &reg).unwrap();

        let mut covered = 0;
        for (i, batch) in batches.iter().enumerate() {
            assert_eq!(batch.items.start, covered);
            covered = batch.items.end;
            let block = reg.geometry_layout(batch.key.geometry_layout()).unwrap().block_size;
            assert!(batch.bytes <= block);
            assert!(list[batch.items.clone()].iter().all(|it| it.key == batch.key));
            // A split only happens when the next item would not fit
            if let Some(next) = batches.get(i + 1) {
                if next.key == batch.key {
                    assert!(batch.bytes + list[next.items.start].bytes > block);
                }
            }
        }
        assert_eq!(covered, list.len());
    }

    #[test]
    fn test_oversized_item_is_fatal() {
        let reg = registry();
        let list = items(&[(key(0, 0), 0.0, 16), (key(0, 0), 0.0, 80)]);
        assert!(matches!(
            plan_batches(&list, &reg),
            Err(SceneError::BatchItemTooLarge {
                bytes: 80,
                block_size: 64,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_layout() {
        let reg = RenderRegistry::new();
        let list = items(&[(key(0, 3), 0.0, 16)]);
        assert_eq!(plan_batches(&list, &reg), Err(SceneError::UnknownGeometryLayout(3)));
    }
}
