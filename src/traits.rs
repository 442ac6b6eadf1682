//! Shared trait abstractions
//!
//! The layer contract lives here so the renderer, the hit tester and the
//! map control can depend on it without depending on concrete layer types.

use crate::{
    core::{
        bounds::Bounds,
        geo::{LatLngBounds, Point},
        projection::Projection,
    },
    input::events::SignalSender,
    layers::{
        base::LayerType,
        geometry::{GeometryId, GeometryRef},
    },
    rendering::surface::DrawingSurface,
    spatial::selection::SelectionArea,
};

/// Operations every map layer provides.
///
/// Layers are shared between the interactive thread and redraw workers, so
/// every method takes `&self` and mutable state sits behind interior locks.
pub trait LayerOperations: Send + Sync {
    /// Unique name inside a layer manager
    fn name(&self) -> &str;

    fn layer_type(&self) -> LayerType;

    /// Whether the layer is switched on and `zoom` lies within its range
    fn is_visible(&self, zoom: i32) -> bool;

    fn set_visible(&self, visible: bool);

    /// Draws everything intersecting `rect_px`, given in map pixels at `zoom`.
    /// The surface is already translated so map pixels can be used directly.
    fn draw(
        &self,
        surface: &mut dyn DrawingSurface,
        rect_px: &Bounds,
        zoom: i32,
        projection: &dyn Projection,
    );

    /// Candidate geometries whose coordinate bounds intersect `bounds`,
    /// in insertion order
    fn geometries_in(&self, _bounds: &LatLngBounds) -> Vec<GeometryRef> {
        Vec::new()
    }

    /// Extra pixels a hit test query must grow by to catch markers drawn
    /// beyond their coordinate
    fn hit_margin_px(&self) -> f64 {
        0.0
    }

    /// Moves geometries that are pinned to the widget rather than the map
    fn move_widget_geometries(&self, _offset_px: &Point, _zoom: i32) {}

    /// Click detection for a press area in map pixels. Returns the clicked
    /// geometries; implementations also emit "geometry clicked" signals.
    fn pointer_pressed(
        &self,
        _area: &SelectionArea,
        _zoom: i32,
        _projection: &dyn Projection,
    ) -> Vec<GeometryId> {
        Vec::new()
    }

    /// Connects the layer to the map control that now owns it
    fn attach(&self, _signals: SignalSender) {}

    fn detach(&self) {}

    fn as_any(&self) -> &dyn std::any::Any;
}
