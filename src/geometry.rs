use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default share of a panel's area that must overlap another panel before it
/// counts as contained in it.
pub const DEFAULT_CONTAINMENT_THRESHOLD: f64 = 0.8;

/// Axis-aligned panel bounds in page-pixel space.
///
/// A panel has no identity beyond its position in the page's panel list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PanelRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl PanelRect {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Builds a rect from two arbitrary corners, e.g. the start and end of a drag.
    pub fn from_corners(a: (i32, i32), b: (i32, i32)) -> Self {
        Self::new(a.0, a.1, b.0, b.1).normalized()
    }

    pub fn normalized(self) -> Self {
        Self {
            x1: self.x1.min(self.x2),
            y1: self.y1.min(self.y2),
            x2: self.x1.max(self.x2),
            y2: self.y1.max(self.y2),
        }
    }

    pub fn width(&self) -> i64 {
        (i64::from(self.x2) - i64::from(self.x1)).max(0)
    }

    pub fn height(&self) -> i64 {
        (i64::from(self.y2) - i64::from(self.y1)).max(0)
    }

    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }

    /// Zero width or height (or inverted corners).
    pub fn is_degenerate(&self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    pub fn intersection_area(&self, other: &PanelRect) -> i64 {
        let w = i64::from(self.x2.min(other.x2)) - i64::from(self.x1.max(other.x1));
        let h = i64::from(self.y2.min(other.y2)) - i64::from(self.y1.max(other.y1));
        w.max(0) * h.max(0)
    }

    /// True when more than `threshold` of this rect's area lies inside `other`.
    ///
    /// A zero-area rect is never contained in anything.
    pub fn is_contained_in(&self, other: &PanelRect, threshold: f64) -> bool {
        let area = self.area();
        if area == 0 {
            return false;
        }

        self.intersection_area(other) as f64 / area as f64 > threshold
    }

    /// Converts to an `imageproc` rect for cropping and drawing.
    /// Returns `None` for degenerate rects, which `imageproc` cannot represent.
    pub fn to_rect(&self) -> Option<Rect> {
        if self.is_degenerate() {
            return None;
        }
        Some(Rect::at(self.x1, self.y1).of_size(self.width() as u32, self.height() as u32))
    }
}

impl From<Rect> for PanelRect {
    fn from(rect: Rect) -> Self {
        Self::new(rect.left(), rect.top(), rect.right() + 1, rect.bottom() + 1)
    }
}

impl fmt::Display for PanelRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x1, self.y1, self.x2, self.y2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_clamps_inverted_sides() {
        assert_eq!(PanelRect::new(0, 0, 10, 20).area(), 200);
        assert_eq!(PanelRect::new(10, 0, 0, 20).area(), 0);
        assert_eq!(PanelRect::new(5, 5, 5, 50).area(), 0);
    }

    #[test]
    fn intersection_of_disjoint_rects_is_zero() {
        let a = PanelRect::new(0, 0, 10, 10);
        let b = PanelRect::new(20, 20, 30, 30);
        assert_eq!(a.intersection_area(&b), 0);

        let c = PanelRect::new(5, 5, 15, 15);
        assert_eq!(a.intersection_area(&c), 25);
    }

    #[test]
    fn nested_rect_is_contained() {
        let outer = PanelRect::new(0, 0, 100, 100);
        let inner = PanelRect::new(10, 10, 50, 50);

        assert!(inner.is_contained_in(&outer, DEFAULT_CONTAINMENT_THRESHOLD));
        assert!(!outer.is_contained_in(&inner, DEFAULT_CONTAINMENT_THRESHOLD));
    }

    #[test]
    fn containment_threshold_is_exclusive() {
        let a = PanelRect::new(0, 0, 10, 10);
        // Exactly 80% of `a` overlaps `b`.
        let b = PanelRect::new(2, 0, 20, 10);

        assert!(!a.is_contained_in(&b, 0.8));
        assert!(a.is_contained_in(&b, 0.79));
    }

    #[test]
    fn degenerate_rect_is_never_contained() {
        let line = PanelRect::new(10, 10, 10, 50);
        let page = PanelRect::new(0, 0, 100, 100);

        assert!(line.is_degenerate());
        assert!(!line.is_contained_in(&page, 0.0));
    }

    #[test]
    fn corners_are_normalized() {
        let rect = PanelRect::from_corners((80, 90), (10, 20));
        assert_eq!(rect, PanelRect::new(10, 20, 80, 90));
    }

    #[test]
    fn imageproc_rect_conversion() {
        let rect = PanelRect::new(3, 4, 13, 24);
        let converted = rect.to_rect().unwrap();

        assert_eq!(converted.width(), 10);
        assert_eq!(converted.height(), 20);
        assert_eq!(PanelRect::from(converted), rect);
        assert!(PanelRect::new(0, 0, 0, 5).to_rect().is_none());
    }
}
