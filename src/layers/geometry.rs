//! Drawable, hit-testable geometries owned by geometry layers.

use crate::{
    core::{
        bounds::Bounds,
        constants::DEFAULT_CIRCLE_DIAMETER_PX,
        geo::{LatLng, LatLngBounds, Point},
        projection::Projection,
    },
    rendering::{
        raster::RasterSurface,
        surface::{Color, DrawingSurface, Pen},
    },
    spatial::selection::SelectionArea,
};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Stable handle of a geometry inside its layer. Handles are issued in
/// insertion order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeometryId(pub u64);

/// A geometry together with its handle, as returned by layer queries
#[derive(Debug, Clone)]
pub struct GeometryRef {
    pub id: GeometryId,
    pub geometry: Arc<Geometry>,
}

impl PartialEq for GeometryRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.geometry, &other.geometry)
    }
}

/// Inclusive zoom range a geometry or layer is visible in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoomRange {
    pub min: i32,
    pub max: i32,
}

impl ZoomRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn all() -> Self {
        Self {
            min: i32::MIN,
            max: i32::MAX,
        }
    }

    pub fn contains(&self, zoom: i32) -> bool {
        zoom >= self.min && zoom <= self.max
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self::all()
    }
}

/// Where a marker image sits relative to its coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Alignment {
    TopLeft,
    TopMiddle,
    TopRight,
    #[default]
    Middle,
    BottomLeft,
    BottomMiddle,
    BottomRight,
}

impl Alignment {
    /// Offset from the coordinate's pixel to the image's top-left corner
    pub fn offset(&self, width: f64, height: f64) -> Point {
        match self {
            Alignment::TopLeft => Point::new(0.0, 0.0),
            Alignment::TopMiddle => Point::new(-width / 2.0, 0.0),
            Alignment::TopRight => Point::new(-width, 0.0),
            Alignment::Middle => Point::new(-width / 2.0, -height / 2.0),
            Alignment::BottomLeft => Point::new(0.0, -height),
            Alignment::BottomMiddle => Point::new(-width / 2.0, -height),
            Alignment::BottomRight => Point::new(-width, -height),
        }
    }
}

/// How a point is rendered
#[derive(Debug, Clone)]
pub enum PointMarker {
    /// A dot the size of the pen
    Dot,
    /// A fixed-size image
    Image(Arc<RgbaImage>),
    /// A circle outline rendered once into an image
    Circle {
        diameter_px: f64,
        image: Arc<RgbaImage>,
    },
}

/// A single coordinate, optionally drawn with a fixed-size marker
#[derive(Debug, Clone)]
pub struct GeometryPoint {
    coordinate: LatLng,
    marker: PointMarker,
    alignment: Alignment,
    pen: Pen,
    zoom_range: ZoomRange,
}

impl GeometryPoint {
    /// A plain dot
    pub fn new(coordinate: LatLng) -> Self {
        Self {
            coordinate,
            marker: PointMarker::Dot,
            alignment: Alignment::Middle,
            pen: Pen::new(Color::BLACK, 4.0),
            zoom_range: ZoomRange::all(),
        }
    }

    /// A point drawn with an image marker
    pub fn with_image(coordinate: LatLng, image: Arc<RgbaImage>, alignment: Alignment) -> Self {
        Self {
            marker: PointMarker::Image(image),
            alignment,
            ..Self::new(coordinate)
        }
    }

    /// A point drawn as a circle outline
    pub fn circle(coordinate: LatLng, diameter_px: f64, pen: Pen) -> Self {
        let diameter_px = if diameter_px > 0.0 {
            diameter_px
        } else {
            DEFAULT_CIRCLE_DIAMETER_PX
        };
        Self {
            marker: PointMarker::Circle {
                diameter_px,
                image: Arc::new(render_circle(diameter_px, &pen)),
            },
            pen,
            ..Self::new(coordinate)
        }
    }

    pub fn with_pen(mut self, pen: Pen) -> Self {
        self.pen = pen;
        if let PointMarker::Circle { diameter_px, .. } = self.marker {
            self.marker = PointMarker::Circle {
                diameter_px,
                image: Arc::new(render_circle(diameter_px, &pen)),
            };
        }
        self
    }

    pub fn with_zoom_range(mut self, zoom_range: ZoomRange) -> Self {
        self.zoom_range = zoom_range;
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn coordinate(&self) -> LatLng {
        self.coordinate
    }

    pub fn set_coordinate(&mut self, coordinate: LatLng) {
        self.coordinate = coordinate;
    }

    pub fn marker(&self) -> &PointMarker {
        &self.marker
    }

    pub fn pen(&self) -> &Pen {
        &self.pen
    }

    pub fn is_visible(&self, zoom: i32) -> bool {
        self.zoom_range.contains(zoom)
    }

    fn marker_image(&self) -> Option<&RgbaImage> {
        match &self.marker {
            PointMarker::Dot => None,
            PointMarker::Image(image) | PointMarker::Circle { image, .. } => Some(image),
        }
    }

    /// Largest distance the rendered marker extends from its coordinate
    pub fn marker_extent_px(&self) -> f64 {
        match self.marker_image() {
            Some(image) => image.width().max(image.height()) as f64,
            None => self.pen.width / 2.0,
        }
    }

    /// Pixel rectangle the rendered point occupies at `pixel`
    pub fn pixel_rect(&self, pixel: &Point) -> Bounds {
        match self.marker_image() {
            Some(image) => {
                let (w, h) = (image.width() as f64, image.height() as f64);
                let top_left = pixel.add(&self.alignment.offset(w, h));
                Bounds::new(top_left, top_left.add(&Point::new(w, h)))
            }
            None => Bounds::new(*pixel, *pixel).expanded(self.pen.width / 2.0),
        }
    }

    pub fn bounding_box(&self, zoom: i32, projection: &dyn Projection) -> LatLngBounds {
        let rect = self.pixel_rect(&projection.to_pixel(&self.coordinate, zoom));
        LatLngBounds::from_corners(
            projection.to_coordinate(&rect.min, zoom),
            projection.to_coordinate(&rect.max, zoom),
        )
    }

    /// Plain dots match when the area contains their coordinate; markers
    /// match when the area overlaps the marker rectangle
    pub fn touches(&self, area: &SelectionArea, zoom: i32, projection: &dyn Projection) -> bool {
        if !self.is_visible(zoom) {
            return false;
        }
        let pixel = projection.to_pixel(&self.coordinate, zoom);
        match self.marker {
            PointMarker::Dot => area.contains_point(&pixel),
            _ => area.intersects_bounds(&self.pixel_rect(&pixel)),
        }
    }

    pub fn draw(
        &self,
        surface: &mut dyn DrawingSurface,
        rect_px: &Bounds,
        zoom: i32,
        projection: &dyn Projection,
    ) {
        if !self.is_visible(zoom) {
            return;
        }
        let pixel = projection.to_pixel(&self.coordinate, zoom);
        let occupied = self.pixel_rect(&pixel);
        if !rect_px.intersects(&occupied) {
            return;
        }
        match self.marker_image() {
            Some(image) => surface.draw_image(&occupied.min, image),
            None => surface.draw_line(&pixel, &pixel, &self.pen),
        }
    }
}

/// Renders a circle outline into a square transparent image
fn render_circle(diameter_px: f64, pen: &Pen) -> RgbaImage {
    let side = (diameter_px + pen.width).ceil().max(1.0) as u32;
    let mut image = RgbaImage::from_pixel(side, side, Color::TRANSPARENT.to_rgba());
    {
        let mut surface = RasterSurface::new(&mut image);
        let inset = pen.width / 2.0;
        let rect = Bounds::from_coords(inset, inset, side as f64 - inset, side as f64 - inset);
        surface.draw_ellipse(&rect, Some(pen), None);
    }
    image
}

/// An ordered sequence of points joined by a stroke
#[derive(Debug)]
pub struct GeometryLineString {
    points: Vec<GeometryPoint>,
    pen: Pen,
    zoom_range: ZoomRange,
    touched: Mutex<Vec<usize>>,
}

impl GeometryLineString {
    pub fn new(points: Vec<GeometryPoint>, pen: Pen) -> Self {
        Self {
            points,
            pen,
            zoom_range: ZoomRange::all(),
            touched: Mutex::new(Vec::new()),
        }
    }

    /// Vertices drawn as dots with the line's pen
    pub fn from_coordinates(coordinates: &[LatLng], pen: Pen) -> Self {
        let points = coordinates
            .iter()
            .map(|c| GeometryPoint::new(*c).with_pen(pen))
            .collect();
        Self::new(points, pen)
    }

    pub fn with_zoom_range(mut self, zoom_range: ZoomRange) -> Self {
        self.zoom_range = zoom_range;
        self
    }

    pub fn points(&self) -> &[GeometryPoint] {
        &self.points
    }

    pub fn pen(&self) -> &Pen {
        &self.pen
    }

    pub fn is_visible(&self, zoom: i32) -> bool {
        self.zoom_range.contains(zoom)
    }

    /// Indices of the points matched by the most recent hit test
    pub fn touched_points(&self) -> Vec<usize> {
        match self.touched.lock() {
            Ok(touched) => touched.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn touched_coordinates(&self) -> Vec<LatLng> {
        self.touched_points()
            .into_iter()
            .filter_map(|i| self.points.get(i).map(|p| p.coordinate()))
            .collect()
    }

    /// Bounding box of the vertex coordinates, `None` without vertices
    pub fn coordinate_bounds(&self) -> Option<LatLngBounds> {
        let coordinates: Vec<LatLng> = self.points.iter().map(|p| p.coordinate()).collect();
        LatLngBounds::from_points(&coordinates)
    }

    /// Recomputes the touched points; any previous match list is replaced
    pub fn touches(&self, area: &SelectionArea, zoom: i32, projection: &dyn Projection) -> bool {
        let matched: Vec<usize> = if self.is_visible(zoom) {
            self.points
                .iter()
                .enumerate()
                .filter(|(_, point)| point.touches(area, zoom, projection))
                .map(|(i, _)| i)
                .collect()
        } else {
            Vec::new()
        };
        let any = !matched.is_empty();
        match self.touched.lock() {
            Ok(mut touched) => *touched = matched,
            Err(poisoned) => *poisoned.into_inner() = matched,
        }
        any
    }

    pub fn draw(
        &self,
        surface: &mut dyn DrawingSurface,
        rect_px: &Bounds,
        zoom: i32,
        projection: &dyn Projection,
    ) {
        if !self.is_visible(zoom) {
            return;
        }
        let pixels: Vec<Point> = self
            .points
            .iter()
            .map(|p| projection.to_pixel(&p.coordinate(), zoom))
            .collect();
        let Some(extent) = Bounds::from_points(&pixels) else {
            return;
        };
        if !rect_px.intersects(&extent.expanded(self.pen.width)) {
            return;
        }
        surface.draw_polyline(&pixels, &self.pen);
        for point in &self.points {
            point.draw(surface, rect_px, zoom, projection);
        }
    }
}

/// The geometry variants a layer can hold
#[derive(Debug)]
pub enum Geometry {
    Point(GeometryPoint),
    LineString(GeometryLineString),
}

impl Geometry {
    pub fn as_point(&self) -> Option<&GeometryPoint> {
        match self {
            Geometry::Point(point) => Some(point),
            Geometry::LineString(_) => None,
        }
    }

    pub fn as_line_string(&self) -> Option<&GeometryLineString> {
        match self {
            Geometry::LineString(line) => Some(line),
            Geometry::Point(_) => None,
        }
    }

    pub fn is_visible(&self, zoom: i32) -> bool {
        match self {
            Geometry::Point(point) => point.is_visible(zoom),
            Geometry::LineString(line) => line.is_visible(zoom),
        }
    }

    /// Zoom independent bounds of the coordinates, used for indexing
    pub fn coordinate_bounds(&self) -> Option<LatLngBounds> {
        match self {
            Geometry::Point(point) => Some(LatLngBounds::new(point.coordinate(), point.coordinate())),
            Geometry::LineString(line) => line.coordinate_bounds(),
        }
    }

    /// Bounds of the rendered geometry at `zoom`, markers included
    pub fn bounding_box(&self, zoom: i32, projection: &dyn Projection) -> Option<LatLngBounds> {
        match self {
            Geometry::Point(point) => Some(point.bounding_box(zoom, projection)),
            Geometry::LineString(line) => line.coordinate_bounds(),
        }
    }

    /// Largest pixel distance a marker reaches beyond the coordinates
    pub fn marker_extent_px(&self) -> f64 {
        match self {
            Geometry::Point(point) => point.marker_extent_px(),
            Geometry::LineString(line) => line
                .points()
                .iter()
                .map(|p| p.marker_extent_px())
                .fold(line.pen().width / 2.0, f64::max),
        }
    }

    pub fn touches(&self, area: &SelectionArea, zoom: i32, projection: &dyn Projection) -> bool {
        match self {
            Geometry::Point(point) => point.touches(area, zoom, projection),
            Geometry::LineString(line) => line.touches(area, zoom, projection),
        }
    }

    pub fn draw(
        &self,
        surface: &mut dyn DrawingSurface,
        rect_px: &Bounds,
        zoom: i32,
        projection: &dyn Projection,
    ) {
        match self {
            Geometry::Point(point) => point.draw(surface, rect_px, zoom, projection),
            Geometry::LineString(line) => line.draw(surface, rect_px, zoom, projection),
        }
    }
}

impl From<GeometryPoint> for Geometry {
    fn from(point: GeometryPoint) -> Self {
        Geometry::Point(point)
    }
}

impl From<GeometryLineString> for Geometry {
    fn from(line: GeometryLineString) -> Self {
        Geometry::LineString(line)
    }
}
