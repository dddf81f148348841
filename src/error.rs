use thiserror::Error;

use crate::align::Edge;
use crate::ecs::Entity;
use crate::tree::WidgetId;

/// Errors surfaced by scene setup and by [`Scene::update`](crate::Scene::update).
///
/// None of these are data-dependent: each one points at an integration mistake
/// (a registry sized too small, a geometry layout with a buffer that cannot hold
/// its content, an alignment against an unrelated widget). The frame that hits
/// one is aborted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("geometry layout `{label}` has invalid buffer size hint {hint} (must be in 1..={max})")]
    InvalidBufferSize {
        label: String,
        hint: usize,
        max: usize,
    },
    #[error("{kind} registry is full ({capacity} entries)")]
    RegistryFull { kind: &'static str, capacity: usize },
    #[error("draw key refers to unregistered geometry layout {0}")]
    UnknownGeometryLayout(u8),
    #[error(
        "draw item {entity:?} has {bytes} vertex bytes, larger than the {block_size} byte block of its geometry layout"
    )]
    BatchItemTooLarge {
        entity: Entity,
        bytes: usize,
        block_size: usize,
    },
    #[error("more than {max} clip regions in one frame")]
    ClipRegionOverflow { max: usize },
    #[error("widget {widget:?} cannot be aligned to {anchor:?}: anchor must be its parent or a sibling")]
    InvalidAnchor { widget: WidgetId, anchor: WidgetId },
    #[error("cannot align edge {edge:?} against edge {anchor_edge:?}: edges lie on different axes")]
    MismatchedEdges { edge: Edge, anchor_edge: Edge },
    #[error("unknown widget {0:?}")]
    UnknownWidget(WidgetId),
}

pub type Result<T> = std::result::Result<T, SceneError>;
