use crate::context::SceneCx;
use crate::tree::WidgetId;
use crate::widgets::WidgetProps;

use super::{Animation, AnimationStatus, TimingFunction};

/// A scalar widget property a [`Tween`] can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    X,
    Y,
    Z,
    Width,
    Height,
    Rotation,
    ScaleX,
    ScaleY,
    Opacity,
}

impl Property {
    pub fn get(self, props: &WidgetProps) -> f32 {
        match self {
            Property::X => props.x,
            Property::Y => props.y,
            Property::Z => props.z,
            Property::Width => props.width,
            Property::Height => props.height,
            Property::Rotation => props.rotation,
            Property::ScaleX => props.scale.x,
            Property::ScaleY => props.scale.y,
            Property::Opacity => props.opacity,
        }
    }

    pub fn set(self, props: &mut WidgetProps, value: f32) {
        match self {
            Property::X => props.x = value,
            Property::Y => props.y = value,
            Property::Z => props.z = value,
            Property::Width => props.width = value,
            Property::Height => props.height = value,
            Property::Rotation => props.rotation = value,
            Property::ScaleX => props.scale.x = value,
            Property::ScaleY => props.scale.y = value,
            Property::Opacity => props.opacity = value,
        }
    }
}

/// Interpolates one property of one widget towards a target value.
///
/// The start value is read from the widget on the first step unless set with
/// [`starting_at`](Self::starting_at). Writes go through [`SceneCx::modify`], so the usual
/// dirty bits are raised. The tween finishes early if its widget is removed.
#[derive(Debug, Clone)]
pub struct Tween {
    widget: WidgetId,
    property: Property,
    from: Option<f32>,
    to: f32,
    /// Seconds
    duration: f32,
    elapsed: f32,
    timing: TimingFunction,
}

impl Tween {
    pub fn new(widget: WidgetId, property: Property, to: f32, duration: f32) -> Self {
        Self {
            widget,
            property,
            from: None,
            to,
            duration,
            elapsed: 0.0,
            timing: TimingFunction::default(),
        }
    }

    pub fn starting_at(mut self, value: f32) -> Self {
        self.from = Some(value);
        self
    }

    pub fn timing(mut self, timing: TimingFunction) -> Self {
        self.timing = timing;
        self
    }

    /// Normalized progress in [0, 1].
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0)
        }
    }
}

impl Animation for Tween {
    fn advance(&mut self, dt: f32, cx: &mut SceneCx<'_>) -> AnimationStatus {
        let Some(current) = cx.props(self.widget).map(|p| self.property.get(p)) else {
            return AnimationStatus::Finished;
        };
        let from = *self.from.get_or_insert(current);

        self.elapsed += dt.max(0.0);
        let t = self.progress();
        let value = from + (self.to - from) * self.timing.evaluate(t);

        let property = self.property;
        cx.modify(self.widget, |p| property.set(p, value));

        if t >= 1.0 {
            AnimationStatus::Finished
        } else {
            AnimationStatus::Running
        }
    }
}
