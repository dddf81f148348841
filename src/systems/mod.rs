//! The per-frame systems, run in order by [`Scene::update`](crate::Scene::update).

pub mod draw;
pub mod transform;

pub use draw::{DrawPass, DrawSystem};
pub use transform::{TransformPass, TransformSystem, LAYOUT_ITERATION_LIMIT};
