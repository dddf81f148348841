/// A 2D vector used for scale and origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self::new(0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0);

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn splat(v: f32) -> Self {
        Self::new(v, v)
    }
}

impl From<(f32, f32)> for Vec2 {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

/// An axis-aligned box in world space, stored as min/max corners.
///
/// A box whose max corner does not exceed its min corner on either axis is
/// empty; [`intersection`](Self::intersection) of disjoint boxes yields one.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Box at `(x, y)` with the given size.
    pub fn from_rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Smallest box containing every point. Returns the default (empty) box
    /// for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = (f32, f32)>) -> Self {
        let mut iter = points.into_iter();
        let Some((x, y)) = iter.next() else {
            return Self::default();
        };
        iter.fold(Self::new(x, y, x, y), |b, (x, y)| Self {
            x0: b.x0.min(x),
            y0: b.y0.min(y),
            x1: b.x1.max(x),
            y1: b.y1.max(y),
        })
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        self.x0 < other.x1 && self.x1 > other.x0 && self.y0 < other.y1 && self.y1 > other.y0
    }

    /// Overlap of two boxes. Disjoint boxes collapse to a zero-area box at the
    /// clamped corner rather than producing inverted bounds.
    pub fn intersection(&self, other: &BBox) -> BBox {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1.min(other.x1).max(x0);
        let y1 = self.y1.min(other.y1).max(y0);
        BBox { x0, y0, x1, y1 }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    /// The four corners in outline order.
    pub fn corners(&self) -> [(f32, f32); 4] {
        [
            (self.x0, self.y0),
            (self.x1, self.y0),
            (self.x1, self.y1),
            (self.x0, self.y1),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection_overlapping() {
        let a = BBox::new(0.0, 0.0, 100.0, 100.0);
        let b = BBox::new(50.0, 50.0, 200.0, 200.0);
        assert_eq!(a.intersection(&b), BBox::new(50.0, 50.0, 100.0, 100.0));
        assert!(a.intersects(&b));
    }

    #[test]
    fn test_intersection_disjoint_is_empty() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(20.0, 30.0, 40.0, 50.0);
        let i = a.intersection(&b);
        assert!(i.is_empty());
        assert!(!a.intersects(&b));
        assert_eq!(i.width(), 0.0);
        assert_eq!(i.height(), 0.0);
    }

    #[test]
    fn test_from_points() {
        let b = BBox::from_points([(3.0, -1.0), (-2.0, 4.0), (0.0, 0.0)]);
        assert_eq!(b, BBox::new(-2.0, -1.0, 3.0, 4.0));
        assert_eq!(BBox::from_points(std::iter::empty()), BBox::default());
    }
}
