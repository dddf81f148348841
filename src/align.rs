//! Edge alignment against a parent or sibling.

use crate::context::SceneCx;
use crate::error::{Result, SceneError};
use crate::tree::WidgetId;
use crate::widgets::WidgetProps;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// An edge (or center line) of a widget's local rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    CenterX,
    Right,
    Top,
    CenterY,
    Bottom,
}

impl Edge {
    pub fn axis(self) -> Axis {
        match self {
            Edge::Left | Edge::CenterX | Edge::Right => Axis::Horizontal,
            Edge::Top | Edge::CenterY | Edge::Bottom => Axis::Vertical,
        }
    }

    /// Fraction of the extent along the edge's axis where the edge lies.
    fn fraction(self) -> f32 {
        match self {
            Edge::Left | Edge::Top => 0.0,
            Edge::CenterX | Edge::CenterY => 0.5,
            Edge::Right | Edge::Bottom => 1.0,
        }
    }

    fn extent(self, props: &WidgetProps) -> f32 {
        match self.axis() {
            Axis::Horizontal => props.width,
            Axis::Vertical => props.height,
        }
    }

    fn origin(self, props: &WidgetProps) -> f32 {
        match self.axis() {
            Axis::Horizontal => props.x,
            Axis::Vertical => props.y,
        }
    }
}

impl<'a> SceneCx<'a> {
    /// Move `widget` so that its `edge` lines up with `anchor_edge` of
    /// `anchor`, plus `offset` along the same axis.
    ///
    /// `anchor` must be the parent of `widget` (coordinates are then taken in
    /// the parent's local space) or one of its siblings. Rotation and scale are
    /// not taken into account.
    pub fn align(
        &mut self,
        widget: WidgetId,
        edge: Edge,
        anchor: WidgetId,
        anchor_edge: Edge,
        offset: f32,
    ) -> Result<()> {
        if edge.axis() != anchor_edge.axis() {
            return Err(SceneError::MismatchedEdges { edge, anchor_edge });
        }
        let props = *self.props(widget).ok_or(SceneError::UnknownWidget(widget))?;
        let anchor_props = *self.props(anchor).ok_or(SceneError::UnknownWidget(anchor))?;

        let parent = self.parent(widget);
        let is_parent = parent == Some(anchor);
        let is_sibling = anchor != widget && parent.is_some() && self.parent(anchor) == parent;
        if !is_parent && !is_sibling {
            return Err(SceneError::InvalidAnchor { widget, anchor });
        }

        let mut target = anchor_edge.fraction() * anchor_edge.extent(&anchor_props);
        if is_sibling {
            target += anchor_edge.origin(&anchor_props);
        }
        let value = target - edge.fraction() * edge.extent(&props) + offset;

        match edge.axis() {
            Axis::Horizontal => self.modify(widget, |p| p.x = value),
            Axis::Vertical => self.modify(widget, |p| p.y = value),
        };
        Ok(())
    }
}
