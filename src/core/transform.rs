//! Conversions between viewport pixels, map pixels and geographic coordinates.

use crate::core::{
    bounds::Bounds,
    geo::{LatLng, LatLngBounds, Point, Size},
    projection::Projection,
};

/// A snapshot of focus, zoom and viewport size able to convert between the
/// three coordinate spaces.
///
/// Viewport pixels have their origin at the top-left of the visible area.
/// Map pixels are zoom dependent and produced by the [`Projection`].
#[derive(Debug, Clone, Copy)]
pub struct CoordinateTransform<'a> {
    projection: &'a dyn Projection,
    focus: LatLng,
    zoom: i32,
    viewport_size: Size,
}

impl<'a> CoordinateTransform<'a> {
    pub fn new(projection: &'a dyn Projection, focus: LatLng, zoom: i32, viewport_size: Size) -> Self {
        Self {
            projection,
            focus,
            zoom,
            viewport_size,
        }
    }

    pub fn projection(&self) -> &'a dyn Projection {
        self.projection
    }

    pub fn zoom(&self) -> i32 {
        self.zoom
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport_size
    }

    pub fn viewport_center(&self) -> Point {
        self.viewport_size.center()
    }

    /// Current focus in map pixels
    pub fn focus_px(&self) -> Point {
        self.to_pixel(&self.focus)
    }

    pub fn to_pixel(&self, coord: &LatLng) -> Point {
        self.projection.to_pixel(coord, self.zoom)
    }

    pub fn to_coordinate(&self, pixel: &Point) -> LatLng {
        self.projection.to_coordinate(pixel, self.zoom)
    }

    /// `p - viewport_center + focus_px` against the current focus
    pub fn viewport_to_map_px(&self, point: &Point) -> Point {
        self.viewport_to_map_px_with(point, &self.focus_px())
    }

    /// Same as [`Self::viewport_to_map_px`] against an explicit reference focus,
    /// such as the focus a backbuffer was captured at
    pub fn viewport_to_map_px_with(&self, point: &Point, focus_px: &Point) -> Point {
        point.subtract(&self.viewport_center()).add(focus_px)
    }

    pub fn map_px_to_viewport(&self, pixel: &Point) -> Point {
        pixel.subtract(&self.focus_px()).add(&self.viewport_center())
    }

    pub fn viewport_to_coordinate(&self, point: &Point) -> LatLng {
        self.to_coordinate(&self.viewport_to_map_px(point))
    }

    pub fn coordinate_to_viewport(&self, coord: &LatLng) -> Point {
        self.map_px_to_viewport(&self.to_pixel(coord))
    }

    /// Map-pixel rectangle covering the visible viewport
    pub fn required_viewport_rect_px(&self) -> Bounds {
        let focus_px = self.focus_px();
        Bounds::new(
            self.viewport_to_map_px_with(&Point::new(0.0, 0.0), &focus_px),
            self.viewport_to_map_px_with(&self.viewport_size.to_point(), &focus_px),
        )
    }

    /// Geographic rectangle of the visible viewport
    pub fn viewport_rect(&self) -> LatLngBounds {
        self.bounds_to_coordinates(&self.required_viewport_rect_px())
    }

    /// Geographic rectangle spanned by a map-pixel rectangle
    pub fn bounds_to_coordinates(&self, rect: &Bounds) -> LatLngBounds {
        self.projection.to_coordinate_bounds(rect, self.zoom)
    }

    /// Offset to add to viewport pixels to obtain map pixels
    pub fn viewport_origin_px(&self) -> Point {
        self.focus_px().subtract(&self.viewport_center())
    }
}
