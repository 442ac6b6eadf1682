//! Hit testing of selection areas against layer geometries.

use crate::{
    core::transform::CoordinateTransform,
    layers::{
        base::LayerTrait,
        geometry::{GeometryId, GeometryRef},
    },
    spatial::selection::SelectionArea,
};
use std::sync::Arc;

/// Geometries matched by a selection, grouped by layer.
///
/// Groups follow layer order and geometries inside a group follow handle
/// order. Layers without a match are left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionResult {
    layers: Vec<(String, Vec<GeometryRef>)>,
}

impl SelectionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, layer: impl Into<String>, geometries: Vec<GeometryRef>) {
        if !geometries.is_empty() {
            self.layers.push((layer.into(), geometries));
        }
    }

    /// Matches of one layer
    pub fn get(&self, layer: &str) -> Option<&[GeometryRef]> {
        self.layers
            .iter()
            .find(|(name, _)| name == layer)
            .map(|(_, geometries)| geometries.as_slice())
    }

    pub fn ids(&self, layer: &str) -> Vec<GeometryId> {
        self.get(layer)
            .map(|geometries| geometries.iter().map(|g| g.id).collect())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[GeometryRef])> {
        self.layers
            .iter()
            .map(|(name, geometries)| (name.as_str(), geometries.as_slice()))
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Number of matched geometries over all layers
    pub fn total(&self) -> usize {
        self.layers.iter().map(|(_, geometries)| geometries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Tests viewport-pixel selection areas against the geometries of a layer
/// stack, using the transform of the moment the selection finished
pub struct HitTester<'a> {
    transform: CoordinateTransform<'a>,
}

impl<'a> HitTester<'a> {
    pub fn new(transform: CoordinateTransform<'a>) -> Self {
        Self { transform }
    }

    /// Matches `area`, given in viewport pixels, against every layer visible
    /// at the transform's zoom.
    ///
    /// The area's bounding box, grown by the widest marker margin of the
    /// visible layers, is converted to a geographic region once per call.
    /// Candidates come from each layer's spatial query over that region;
    /// each candidate then runs its exact shape test. Line strings record
    /// their touched points as a side effect.
    pub fn test(&self, layers: &[Arc<dyn LayerTrait>], area: &SelectionArea) -> SelectionResult {
        let zoom = self.transform.zoom();
        let projection = self.transform.projection();
        let area_px = area.translated(&self.transform.viewport_origin_px());

        let visible: Vec<&Arc<dyn LayerTrait>> = layers.iter().filter(|l| l.is_visible(zoom)).collect();
        let margin = visible
            .iter()
            .map(|layer| layer.hit_margin_px())
            .fold(0.0, f64::max);
        let region = projection.to_coordinate_bounds(&area_px.bounding_box().expanded(margin), zoom);

        let mut result = SelectionResult::new();
        for layer in visible {
            let matched: Vec<GeometryRef> = layer
                .geometries_in(&region)
                .into_iter()
                .filter(|candidate| candidate.geometry.touches(&area_px, zoom, projection))
                .collect();
            log::trace!("layer '{}' matched {} geometries", layer.name(), matched.len());
            result.push(layer.name(), matched);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        bounds::Bounds,
        geo::{LatLng, Point, Size},
        projection::SphericalMercator,
    };
    use crate::layers::{
        geometry::{GeometryLineString, GeometryPoint, ZoomRange},
        vector::GeometryLayer,
    };
    use crate::rendering::surface::Pen;

    fn transform(projection: &SphericalMercator) -> CoordinateTransform<'_> {
        CoordinateTransform::new(projection, LatLng::new(0.0, 0.0), 6, Size::new(400, 400))
    }

    #[test]
    fn test_box_selects_point_under_it() {
        let projection = SphericalMercator::default();
        let transform = transform(&projection);
        let layer = Arc::new(GeometryLayer::new("points"));
        let inside = transform.viewport_to_coordinate(&Point::new(100.0, 100.0));
        let outside = transform.viewport_to_coordinate(&Point::new(300.0, 300.0));
        let id = layer.add_point(GeometryPoint::new(inside)).unwrap();
        layer.add_point(GeometryPoint::new(outside)).unwrap();

        let layers: Vec<Arc<dyn LayerTrait>> = vec![layer];
        let area = SelectionArea::Rect(Bounds::from_coords(50.0, 50.0, 150.0, 150.0));
        let result = HitTester::new(transform).test(&layers, &area);

        assert_eq!(result.ids("points"), vec![id]);
        assert_eq!(result.total(), 1);
    }

    #[test]
    fn test_results_follow_layer_order_and_skip_hidden() {
        let projection = SphericalMercator::default();
        let transform = transform(&projection);
        let coordinate = transform.viewport_to_coordinate(&Point::new(200.0, 200.0));

        let first = Arc::new(GeometryLayer::new("first"));
        let hidden = Arc::new(GeometryLayer::new("hidden").with_zoom_range(ZoomRange::new(10, 12)));
        let second = Arc::new(GeometryLayer::new("second"));
        for layer in [&first, &hidden, &second] {
            layer.add_point(GeometryPoint::new(coordinate)).unwrap();
        }

        let layers: Vec<Arc<dyn LayerTrait>> = vec![second, hidden, first];
        let area = SelectionArea::around(&Point::new(200.0, 200.0), 10.0);
        let tester = HitTester::new(transform);
        let result = tester.test(&layers, &area);

        assert_eq!(result.layer_names(), vec!["second", "first"]);
        assert_eq!(result, tester.test(&layers, &area));
    }

    #[test]
    fn test_line_selection_records_touched_points() {
        let projection = SphericalMercator::default();
        let transform = transform(&projection);
        let coordinates: Vec<LatLng> = [50.0, 150.0, 250.0]
            .iter()
            .map(|x| transform.viewport_to_coordinate(&Point::new(*x, 200.0)))
            .collect();
        let layer = Arc::new(GeometryLayer::new("route"));
        let id = layer
            .add_line_string(GeometryLineString::from_coordinates(&coordinates, Pen::default()))
            .unwrap();

        let layers: Vec<Arc<dyn LayerTrait>> = vec![layer.clone()];
        // Vertical selection line crossing only the middle vertex
        let area = SelectionArea::Line {
            from: Point::new(150.0, 100.0),
            to: Point::new(150.0, 300.0),
            width: 5.0,
        };
        let result = HitTester::new(transform).test(&layers, &area);

        assert_eq!(result.ids("route"), vec![id]);
        let geometry = layer.geometry(id).unwrap();
        assert_eq!(geometry.as_line_string().unwrap().touched_points(), vec![1]);
    }

    #[test]
    fn test_shared_region_keeps_exact_tests_per_layer() {
        let projection = SphericalMercator::default();
        let transform = transform(&projection);
        let coordinate = transform.viewport_to_coordinate(&Point::new(165.0, 100.0));

        let markers = Arc::new(GeometryLayer::new("markers"));
        let circle = markers
            .add_point(GeometryPoint::circle(coordinate, 40.0, Pen::default()))
            .unwrap();
        let dots = Arc::new(GeometryLayer::new("dots"));
        dots.add_point(GeometryPoint::new(coordinate)).unwrap();

        // The marker margin widens the query for both layers, but the plain
        // dot lies outside the box and must not match
        let layers: Vec<Arc<dyn LayerTrait>> = vec![dots, markers];
        let area = SelectionArea::Rect(Bounds::from_coords(50.0, 50.0, 150.0, 150.0));
        let result = HitTester::new(transform).test(&layers, &area);

        assert_eq!(result.layer_names(), vec!["markers"]);
        assert_eq!(result.ids("markers"), vec![circle]);
    }

    #[test]
    fn test_empty_selection() {
        let projection = SphericalMercator::default();
        let layers: Vec<Arc<dyn LayerTrait>> = vec![Arc::new(GeometryLayer::new("empty"))];
        let area = SelectionArea::Ellipse(Bounds::from_coords(0.0, 0.0, 400.0, 400.0));
        let result = HitTester::new(transform(&projection)).test(&layers, &area);
        assert!(result.is_empty());
        assert!(result.get("empty").is_none());
    }
}
