//! Interactive selection shapes in pixel space.

use crate::{
    core::{bounds::Bounds, geo::Point},
    rendering::raster::distance_to_segment,
};
use serde::{Deserialize, Serialize};

/// Shape family produced by a drag gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionShape {
    Box,
    Line,
    Ellipse,
}

/// A selection shape in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SelectionArea {
    Rect(Bounds),
    /// A segment with a tolerance band of `width` pixels centred on it
    Line { from: Point, to: Point, width: f64 },
    /// The ellipse inscribed in the rectangle
    Ellipse(Bounds),
}

impl SelectionArea {
    /// Corners of a drag from `pressed` to `current`.
    ///
    /// With `origin_center` the press point becomes the centre of the shape and
    /// the corners are mirrored around it.
    pub fn drag_corners(pressed: &Point, current: &Point, origin_center: bool) -> (Point, Point) {
        if origin_center {
            let diff = pressed.subtract(current);
            (pressed.add(&diff), pressed.subtract(&diff))
        } else {
            (*pressed, *current)
        }
    }

    /// Builds the area a drag gesture describes
    pub fn from_drag(
        shape: SelectionShape,
        pressed: &Point,
        current: &Point,
        origin_center: bool,
        line_width: f64,
    ) -> Self {
        let (a, b) = Self::drag_corners(pressed, current, origin_center);
        match shape {
            SelectionShape::Box => SelectionArea::Rect(Bounds::from_corners(a, b)),
            SelectionShape::Line => SelectionArea::Line {
                from: a,
                to: b,
                width: line_width,
            },
            SelectionShape::Ellipse => SelectionArea::Ellipse(Bounds::from_corners(a, b)),
        }
    }

    /// Square of `size` pixels centred on a point, used for click detection
    pub fn around(point: &Point, size: f64) -> Self {
        SelectionArea::Rect(Bounds::from_center_and_size(*point, size, size))
    }

    pub fn translated(&self, offset: &Point) -> Self {
        match self {
            SelectionArea::Rect(rect) => SelectionArea::Rect(rect.translated(offset)),
            SelectionArea::Line { from, to, width } => SelectionArea::Line {
                from: from.add(offset),
                to: to.add(offset),
                width: *width,
            },
            SelectionArea::Ellipse(rect) => SelectionArea::Ellipse(rect.translated(offset)),
        }
    }

    /// Rectangle enclosing the whole area, tolerance band included
    pub fn bounding_box(&self) -> Bounds {
        match self {
            SelectionArea::Rect(rect) | SelectionArea::Ellipse(rect) => *rect,
            SelectionArea::Line { from, to, width } => {
                Bounds::from_corners(*from, *to).expanded(width / 2.0)
            }
        }
    }

    pub fn contains_point(&self, point: &Point) -> bool {
        match self {
            SelectionArea::Rect(rect) => rect.contains(point),
            SelectionArea::Line { from, to, width } => {
                distance_to_segment(point, from, to) <= width / 2.0
            }
            SelectionArea::Ellipse(rect) => ellipse_distance_sq(rect, point) <= 1.0,
        }
    }

    /// Whether the area overlaps a pixel rectangle
    pub fn intersects_bounds(&self, bounds: &Bounds) -> bool {
        match self {
            SelectionArea::Rect(rect) => rect.intersects(bounds),
            SelectionArea::Line { from, to, width } => {
                segment_intersects_rect(from, to, &bounds.expanded(width / 2.0))
            }
            SelectionArea::Ellipse(rect) => {
                if !rect.intersects(bounds) {
                    return false;
                }
                // Closest point of the rectangle to the ellipse centre
                let nearest = bounds.clamp(&rect.center());
                ellipse_distance_sq(rect, &nearest) <= 1.0
            }
        }
    }
}

/// Normalized squared distance from the ellipse centre; `<= 1` is inside
fn ellipse_distance_sq(rect: &Bounds, point: &Point) -> f64 {
    let rx = rect.width() / 2.0;
    let ry = rect.height() / 2.0;
    let center = rect.center();
    if rx <= 0.0 || ry <= 0.0 {
        // Degenerate ellipse collapses onto its bounding segment
        return if rect.contains(point) { 0.0 } else { f64::INFINITY };
    }
    let dx = (point.x - center.x) / rx;
    let dy = (point.y - center.y) / ry;
    dx * dx + dy * dy
}

/// Liang-Barsky style clip test of a segment against a rectangle
fn segment_intersects_rect(a: &Point, b: &Point, rect: &Bounds) -> bool {
    if rect.contains(a) || rect.contains(b) {
        return true;
    }
    let d = b.subtract(a);
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    let checks = [
        (-d.x, a.x - rect.min.x),
        (d.x, rect.max.x - a.x),
        (-d.y, a.y - rect.min.y),
        (d.y, rect.max.y - a.y),
    ];
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return false;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_from_drag_normalizes() {
        let area = SelectionArea::from_drag(
            SelectionShape::Box,
            &Point::new(150.0, 150.0),
            &Point::new(50.0, 50.0),
            false,
            5.0,
        );
        assert_eq!(area, SelectionArea::Rect(Bounds::from_coords(50.0, 50.0, 150.0, 150.0)));
    }

    #[test]
    fn test_origin_centered_drag_mirrors() {
        let area = SelectionArea::from_drag(
            SelectionShape::Ellipse,
            &Point::new(100.0, 100.0),
            &Point::new(120.0, 90.0),
            true,
            5.0,
        );
        assert_eq!(area, SelectionArea::Ellipse(Bounds::from_coords(80.0, 90.0, 120.0, 110.0)));
        assert!(area.contains_point(&Point::new(100.0, 100.0)));
        assert!(!area.contains_point(&Point::new(81.0, 91.0)));
    }

    #[test]
    fn test_line_tolerance_band() {
        let area = SelectionArea::from_drag(
            SelectionShape::Line,
            &Point::new(0.0, 0.0),
            &Point::new(100.0, 0.0),
            false,
            5.0,
        );
        assert!(area.contains_point(&Point::new(50.0, 2.0)));
        assert!(!area.contains_point(&Point::new(50.0, 3.0)));
        assert!(area.intersects_bounds(&Bounds::from_coords(40.0, 2.0, 60.0, 10.0)));
        assert!(!area.intersects_bounds(&Bounds::from_coords(40.0, 4.0, 60.0, 10.0)));
        assert_eq!(area.bounding_box(), Bounds::from_coords(-2.5, -2.5, 102.5, 2.5));
    }

    #[test]
    fn test_diagonal_line_crosses_rect() {
        let area = SelectionArea::Line {
            from: Point::new(0.0, 0.0),
            to: Point::new(100.0, 100.0),
            width: 0.0,
        };
        assert!(area.intersects_bounds(&Bounds::from_coords(40.0, 40.0, 60.0, 60.0)));
        assert!(!area.intersects_bounds(&Bounds::from_coords(60.0, 0.0, 80.0, 20.0)));
    }

    #[test]
    fn test_ellipse_rect_intersection_uses_curve() {
        let area = SelectionArea::Ellipse(Bounds::from_coords(0.0, 0.0, 100.0, 100.0));
        // Inside the bounding box corner but outside the ellipse
        assert!(!area.intersects_bounds(&Bounds::from_coords(0.0, 0.0, 5.0, 5.0)));
        assert!(area.intersects_bounds(&Bounds::from_coords(45.0, 0.0, 55.0, 5.0)));
    }

    #[test]
    fn test_translate_moves_every_variant() {
        let offset = Point::new(10.0, 20.0);
        let line = SelectionArea::Line {
            from: Point::new(0.0, 0.0),
            to: Point::new(1.0, 1.0),
            width: 5.0,
        };
        assert_eq!(
            line.translated(&offset),
            SelectionArea::Line {
                from: Point::new(10.0, 20.0),
                to: Point::new(11.0, 21.0),
                width: 5.0,
            }
        );
        assert_eq!(
            SelectionArea::around(&Point::new(0.0, 0.0), 4.0).translated(&offset),
            SelectionArea::Rect(Bounds::from_coords(8.0, 18.0, 12.0, 22.0))
        );
    }
}
