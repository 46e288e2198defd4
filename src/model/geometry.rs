//! Page-space geometry.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in page units (points), origin top-left, y growing downward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x0: f32,
    /// Top edge
    pub y0: f32,
    /// Right edge
    pub x1: f32,
    /// Bottom edge
    pub y1: f32,
}

impl Rect {
    /// Create a rectangle from its corners.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// A rectangle with no positive area.
    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    /// Horizontal and vertical centre.
    pub fn centroid(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// True when the two rectangles share a region of positive area.
    ///
    /// Rectangles that only touch along an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x0 < other.x1
            && other.x0 < self.x1
            && self.y0 < other.y1
            && other.y0 < self.y1
    }

    /// True when the vertical extents overlap (edges inclusive).
    pub fn overlaps_vertically(&self, other: &Rect) -> bool {
        other.y0 <= self.y1 && other.y1 >= self.y0
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Grow this rectangle in place to include `other`.
    pub fn include(&mut self, other: &Rect) {
        *self = self.union(other);
    }

    /// Divide every coordinate by `factor` (raster pixels back to page units).
    pub fn descale(&self, factor: f32) -> Rect {
        Rect {
            x0: self.x0 / factor,
            y0: self.y0 / factor,
            x1: self.x1 / factor,
            y1: self.y1 / factor,
        }
    }

    /// Multiply every coordinate by `factor` (page units to raster pixels).
    pub fn scale(&self, factor: f32) -> Rect {
        Rect {
            x0: self.x0 * factor,
            y0: self.y0 * factor,
            x1: self.x1 * factor,
            y1: self.y1 * factor,
        }
    }

    /// Union of an iterator of rectangles, `None` when it is empty.
    pub fn union_all<'a, I>(rects: I) -> Option<Rect>
    where
        I: IntoIterator<Item = &'a Rect>,
    {
        rects.into_iter().fold(None, |acc, r| match acc {
            None => Some(*r),
            Some(u) => Some(u.union(r)),
        })
    }
}

/// Page dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// US Letter (8.5 x 11 inches).
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    /// The whole page as a rectangle.
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::letter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects_is_strict() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let touching = Rect::new(10.0, 0.0, 20.0, 10.0);
        let overlapping = Rect::new(9.0, 9.0, 20.0, 20.0);
        assert!(!a.intersects(&touching));
        assert!(a.intersects(&overlapping));
        assert!(overlapping.intersects(&a));
    }

    #[test]
    fn test_empty_rect_never_intersects() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let degenerate = Rect::new(5.0, 5.0, 5.0, 8.0);
        assert!(!a.intersects(&degenerate));
    }

    #[test]
    fn test_union_and_descale() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, -5.0, 20.0, 8.0);
        assert_eq!(a.union(&b), Rect::new(0.0, -5.0, 20.0, 10.0));
        assert_eq!(
            Rect::new(40.0, 80.0, 400.0, 800.0).descale(4.0),
            Rect::new(10.0, 20.0, 100.0, 200.0)
        );
    }

    #[test]
    fn test_union_all() {
        assert_eq!(Rect::union_all(&[]), None);
        let rects = [Rect::new(1.0, 1.0, 2.0, 2.0), Rect::new(3.0, 0.0, 4.0, 5.0)];
        assert_eq!(Rect::union_all(&rects), Some(Rect::new(1.0, 0.0, 4.0, 5.0)));
    }

    #[test]
    fn test_vertical_overlap_inclusive() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let below = Rect::new(50.0, 10.0, 60.0, 20.0);
        let far = Rect::new(0.0, 11.0, 10.0, 20.0);
        assert!(a.overlaps_vertically(&below));
        assert!(!a.overlaps_vertically(&far));
    }
}
