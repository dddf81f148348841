//! Easing curves for tweens.
//!
//! - [`TimingFunction::Linear`] - constant speed
//! - [`TimingFunction::EaseIn`] - accelerates
//! - [`TimingFunction::EaseOut`] - decelerates
//! - [`TimingFunction::EaseInOut`] - accelerates then decelerates
//! - [`TimingFunction::CubicBezier`] - CSS-style `cubic-bezier(x1, y1, x2, y2)`
//! - [`TimingFunction::Custom`] - user supplied

use std::sync::Arc;

#[derive(Clone, Default)]
pub enum TimingFunction {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    /// Control points (x1, y1, x2, y2); x1 and x2 must lie in [0, 1]
    CubicBezier(f32, f32, f32, f32),
    Custom(Arc<dyn Fn(f32) -> f32 + Send + Sync>),
}

impl TimingFunction {
    /// Progress for a normalized time `t`. `t` is clamped to [0, 1]; the
    /// result may leave that range for overshooting curves.
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            TimingFunction::Linear => t,
            TimingFunction::EaseIn => t * t,
            TimingFunction::EaseOut => t * (2.0 - t),
            TimingFunction::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            TimingFunction::CubicBezier(x1, y1, x2, y2) => {
                let s = solve_bezier_param(t, *x1, *x2);
                bezier(s, *y1, *y2)
            }
            TimingFunction::Custom(f) => f(t),
        }
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(f32) -> f32 + Send + Sync + 'static,
    {
        TimingFunction::Custom(Arc::new(f))
    }
}

impl std::fmt::Debug for TimingFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimingFunction::Linear => write!(f, "Linear"),
            TimingFunction::EaseIn => write!(f, "EaseIn"),
            TimingFunction::EaseOut => write!(f, "EaseOut"),
            TimingFunction::EaseInOut => write!(f, "EaseInOut"),
            TimingFunction::CubicBezier(x1, y1, x2, y2) => {
                write!(f, "CubicBezier({}, {}, {}, {})", x1, y1, x2, y2)
            }
            TimingFunction::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// One coordinate of a cubic bezier with end points 0 and 1.
fn bezier(s: f32, p1: f32, p2: f32) -> f32 {
    let ms = 1.0 - s;
    3.0 * ms * ms * s * p1 + 3.0 * ms * s * s * p2 + s * s * s
}

fn bezier_slope(s: f32, p1: f32, p2: f32) -> f32 {
    let ms = 1.0 - s;
    3.0 * ms * ms * p1 + 6.0 * ms * s * (p2 - p1) + 3.0 * s * s * (1.0 - p2)
}

/// Curve parameter whose x coordinate is `x`. Newton steps, falling back to
/// bisection when the slope flattens out.
fn solve_bezier_param(x: f32, x1: f32, x2: f32) -> f32 {
    let mut s = x;
    for _ in 0..8 {
        let err = bezier(s, x1, x2) - x;
        if err.abs() < 1e-6 {
            return s;
        }
        let slope = bezier_slope(s, x1, x2);
        if slope.abs() < 1e-6 {
            break;
        }
        s -= err / slope;
    }

    let (mut lo, mut hi) = (0.0f32, 1.0f32);
    s = x;
    for _ in 0..32 {
        let value = bezier(s, x1, x2);
        if (value - x).abs() < 1e-6 {
            break;
        }
        if value < x {
            lo = s;
        } else {
            hi = s;
        }
        s = (lo + hi) / 2.0;
    }
    s
}
