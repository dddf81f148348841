//! Per-frame pipeline statistics.

/// Snapshot of what one [`Scene::update`](crate::Scene::update) did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    /// Layout iterations that ran (at most the iteration limit)
    pub layout_passes: u32,
    /// False if layout bits were still set when the iteration limit was hit
    pub layout_converged: bool,
    /// World transforms recomputed
    pub transforms_updated: u32,
    /// Drawables whose geometry was regenerated
    pub geometry_rebuilt: u32,
    /// Visible draw items collected for batching
    pub items_collected: u32,
    /// Clip regions, including the root region
    pub clip_regions: u32,
    pub opaque_draw_calls: u32,
    pub transparent_draw_calls: u32,
}

impl FrameStats {
    pub fn draw_calls(&self) -> u32 {
        self.opaque_draw_calls + self.transparent_draw_calls
    }
}
