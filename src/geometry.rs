//! Geometry primitives for the auto-hide controller.
//!
//! All coordinates are integer screen coordinates as reported by the window
//! system. Every function here is total: no panics, no I/O, no clocks.

use serde::{Deserialize, Serialize};

/// A point in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self { Self { x, y } }
}

/// A window rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Right edge (x + width).
    #[must_use]
    pub const fn right(&self) -> i32 { self.x + self.width }

    /// Bottom edge (y + height).
    #[must_use]
    pub const fn bottom(&self) -> i32 { self.y + self.height }

    /// Center point of the rectangle.
    #[must_use]
    pub const fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Whether a point lies within the rectangle. Edges count as inside.
    #[must_use]
    pub const fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }
}

/// The usable area of one display (the monitor frame minus taskbars and
/// similar reserved strips).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkArea {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl WorkArea {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Right edge (x + width).
    #[must_use]
    pub const fn right(&self) -> i32 { self.x + self.width }

    /// Bottom edge (y + height).
    #[must_use]
    pub const fn bottom(&self) -> i32 { self.y + self.height }

    /// Whether a point lies within the area. Edges count as inside.
    #[must_use]
    pub const fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Whether a point's vertical position falls within this area's band.
    #[must_use]
    pub const fn contains_y(&self, y: i32) -> bool { y >= self.y && y <= self.bottom() }

    /// Area of the overlap between this work area and a window rectangle.
    #[must_use]
    pub fn overlap_area(&self, bounds: Bounds) -> i64 {
        let w = i64::from(self.right().min(bounds.right()) - self.x.max(bounds.x));
        let h = i64::from(self.bottom().min(bounds.bottom()) - self.y.max(bounds.y));
        if w > 0 && h > 0 { w * h } else { 0 }
    }
}

/// Whether a window touches the right edge of a work area, within a
/// tolerance in pixels.
#[must_use]
pub const fn is_at_right_edge(bounds: Bounds, area: WorkArea, tolerance: i32) -> bool {
    bounds.right() >= area.right() - tolerance
}

/// Whether the cursor sits within `proximity` pixels of a work area's right
/// edge, horizontally. Vertical containment is checked separately where it
/// matters.
#[must_use]
pub const fn is_cursor_near_right_edge(cursor: Point, area: WorkArea, proximity: i32) -> bool {
    (area.right() - cursor.x).abs() < proximity
}

/// Whether a window is already retracted behind the right edge, leaving at
/// most `margin` pixels on screen. Used to avoid remembering a retracted
/// position as the bounds to restore.
#[must_use]
pub const fn is_mostly_hidden(bounds: Bounds, area: WorkArea, margin: i32) -> bool {
    bounds.x >= area.right() - margin
}

/// The retracted placement: only `reveal` pixels of the window remain
/// visible at the right edge. Size and vertical position are untouched.
#[must_use]
pub const fn docked_bounds(bounds: Bounds, area: WorkArea, reveal: i32) -> Bounds {
    Bounds::new(area.right() - reveal, bounds.y, bounds.width, bounds.height)
}

/// The restored placement: the window right-aligned inside the work area at
/// its remembered size and vertical position.
#[must_use]
pub const fn undocked_bounds(original: Bounds, area: WorkArea) -> Bounds {
    Bounds::new(
        area.right() - original.width,
        original.y,
        original.width,
        original.height,
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const AREA: WorkArea = WorkArea::new(0, 0, 1920, 1080);

    #[test]
    fn test_contains_point_edges_are_inside() {
        let bounds = Bounds::new(100, 100, 200, 200);
        assert!(bounds.contains_point(Point::new(100, 100)));
        assert!(bounds.contains_point(Point::new(300, 300)));
        assert!(bounds.contains_point(Point::new(200, 200)));
        assert!(!bounds.contains_point(Point::new(301, 200)));
        assert!(!bounds.contains_point(Point::new(99, 200)));
    }

    #[test]
    fn test_is_at_right_edge_matches_definition() {
        let tolerance = 1;
        for x in [0, 500, 895, 896, 897, 1915] {
            let bounds = Bounds::new(x, 100, 1024, 620);
            let expected = bounds.x + bounds.width >= AREA.x + AREA.width - tolerance;
            assert_eq!(is_at_right_edge(bounds, AREA, tolerance), expected, "x={x}");
        }
    }

    #[test]
    fn test_is_at_right_edge_offset_area() {
        // Secondary monitor to the right of the primary.
        let area = WorkArea::new(1920, 0, 1920, 1080);
        assert!(is_at_right_edge(Bounds::new(3340, 0, 500, 500), area, 1));
        assert!(!is_at_right_edge(Bounds::new(1920, 0, 500, 500), area, 1));
    }

    #[test]
    fn test_cursor_near_right_edge() {
        assert!(is_cursor_near_right_edge(Point::new(1918, 500), AREA, 10));
        assert!(is_cursor_near_right_edge(Point::new(1925, 500), AREA, 10));
        assert!(!is_cursor_near_right_edge(Point::new(1910, 500), AREA, 10));
        assert!(!is_cursor_near_right_edge(Point::new(500, 500), AREA, 10));
    }

    #[test]
    fn test_mostly_hidden() {
        assert!(is_mostly_hidden(Bounds::new(1915, 100, 1024, 620), AREA, 20));
        assert!(is_mostly_hidden(Bounds::new(1900, 100, 1024, 620), AREA, 20));
        assert!(!is_mostly_hidden(Bounds::new(1899, 100, 1024, 620), AREA, 20));
        assert!(!is_mostly_hidden(Bounds::new(896, 100, 1024, 620), AREA, 20));
    }

    #[test]
    fn test_docked_bounds_keeps_size_and_y() {
        let bounds = Bounds::new(896, 100, 1024, 620);
        let docked = docked_bounds(bounds, AREA, 5);
        assert_eq!(docked, Bounds::new(1915, 100, 1024, 620));
    }

    #[test]
    fn test_dock_undock_round_trip() {
        let original = Bounds::new(896, 100, 1024, 620);
        let docked = docked_bounds(original, AREA, 5);
        let restored = undocked_bounds(original, AREA);
        assert_eq!(restored.y, original.y);
        assert_eq!(restored.height, original.height);
        assert_eq!(restored.width, original.width);
        assert_eq!(restored.right(), AREA.right());
        assert_ne!(docked.x, restored.x);
    }

    #[test]
    fn test_overlap_area() {
        let bounds = Bounds::new(1800, 100, 200, 200);
        assert_eq!(AREA.overlap_area(bounds), 120 * 200);
        let outside = Bounds::new(2000, 100, 200, 200);
        assert_eq!(AREA.overlap_area(outside), 0);
    }

    #[test]
    fn test_contains_y_band() {
        let area = WorkArea::new(1920, 200, 1920, 880);
        assert!(area.contains_y(200));
        assert!(area.contains_y(1080));
        assert!(!area.contains_y(100));
    }
}
