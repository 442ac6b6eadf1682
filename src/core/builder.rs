//! Map builder for fluent API configuration
//!
//! [`MapBuilder`] assembles a [`MapControl`] from a [`MapConfig`] plus the
//! collaborators the control does not create itself: the content source,
//! the redraw executor and the initial layers.

use crate::{
    core::{
        config::MapConfig,
        geo::{LatLng, LatLngBounds, Size},
        map::MapControl,
        projection::ProjectionKind,
    },
    input::handler::MouseButtonMode,
    layers::base::LayerTrait,
    rendering::surface::Color,
    runtime::{InlineExecutor, RedrawExecutor, ThreadExecutor},
    tiles::source::{ContentSource, NullContentSource},
    Result,
};
use std::sync::Arc;

/// Builder for creating and configuring [`MapControl`] instances
#[derive(Default)]
pub struct MapBuilder {
    config: MapConfig,
    /// Content source shared with tile layers; none means no imagery
    content: Option<Arc<dyn ContentSource>>,
    /// Where redraws run; a thread per redraw unless set
    executor: Option<Arc<dyn RedrawExecutor>>,
    layers: Vec<Arc<dyn LayerTrait>>,
}

impl MapBuilder {
    /// Create a new MapBuilder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration, e.g. one loaded from JSON
    pub fn with_config(mut self, config: MapConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_projection(mut self, projection: ProjectionKind) -> Self {
        self.config.projection = projection;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.config.tile_size = tile_size;
        self
    }

    /// Set zoom limits; they are swapped if given in the wrong order
    pub fn with_zoom_limits(mut self, zoom_min: i32, zoom_max: i32) -> Self {
        self.config.zoom_min = zoom_min;
        self.config.zoom_max = zoom_max;
        self
    }

    /// Set the initial focus and zoom level
    pub fn with_focus_and_zoom(mut self, focus: LatLng, zoom: i32) -> Self {
        self.config.initial_focus = focus;
        self.config.initial_zoom = Some(zoom);
        self
    }

    pub fn with_viewport_size(mut self, size: Size) -> Self {
        self.config.viewport_size = size;
        self
    }

    pub fn with_pan_limit(mut self, limit: LatLngBounds) -> Self {
        self.config.pan_limit = Some(limit);
        self
    }

    pub fn with_background(mut self, colour: Color) -> Self {
        self.config.background = colour;
        self
    }

    /// Enable or disable the scaled preview painted while zoom redraws run
    pub fn with_scaled_background(mut self, enabled: bool) -> Self {
        self.config.scaled_background = enabled;
        self
    }

    pub fn with_crosshairs(mut self, enabled: bool) -> Self {
        self.config.overlays.crosshairs = enabled;
        self
    }

    pub fn with_scalebar(mut self, enabled: bool) -> Self {
        self.config.overlays.scalebar = enabled;
        self
    }

    pub fn with_viewport_border(mut self, enabled: bool) -> Self {
        self.config.overlays.viewport_border = enabled;
        self
    }

    /// Set what dragging with the left and right buttons does
    pub fn with_mouse_modes(mut self, left: MouseButtonMode, right: MouseButtonMode) -> Self {
        self.config.mouse.left_button = left;
        self.config.mouse.right_button = right;
        self
    }

    /// Enable or disable pointer input
    pub fn with_mouse(mut self, enabled: bool) -> Self {
        self.config.mouse.enabled = enabled;
        self
    }

    /// Centre drag shapes on the press point, per button
    pub fn with_origin_center(mut self, left: bool, right: bool) -> Self {
        self.config.mouse.left_origin_center = left;
        self.config.mouse.right_origin_center = right;
        self
    }

    pub fn with_content_source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.content = Some(source);
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn RedrawExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Adds a layer on top of those added before
    pub fn with_layer(mut self, layer: Arc<dyn LayerTrait>) -> Self {
        self.layers.push(layer);
        self
    }

    /// Build the map control
    pub fn build(self) -> Result<MapControl> {
        let content = self
            .content
            .unwrap_or_else(|| Arc::new(NullContentSource));
        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(ThreadExecutor));

        let mut map = MapControl::new(self.config, content, executor)?;
        for layer in self.layers {
            map.add_layer(layer, None)?;
        }
        Ok(map)
    }
}

/// Preset configurations for common use cases
impl MapBuilder {
    /// Renders on the calling thread, for tests and offline frame export
    pub fn headless(size: Size) -> Self {
        Self::new()
            .with_viewport_size(size)
            .with_executor(Arc::new(InlineExecutor))
    }

    /// Selection on the left button, box zoom on the right, scalebar shown
    pub fn desktop_map(focus: LatLng, zoom: i32, size: Size) -> Self {
        Self::new()
            .with_focus_and_zoom(focus, zoom)
            .with_viewport_size(size)
            .with_mouse_modes(MouseButtonMode::Pan, MouseButtonMode::PanBox)
            .with_scalebar(true)
    }

    /// A static map without pointer handling or decorations
    pub fn minimal_map(focus: LatLng, zoom: i32, size: Size) -> Self {
        Self::new()
            .with_focus_and_zoom(focus, zoom)
            .with_viewport_size(size)
            .with_mouse(false)
            .with_crosshairs(false)
            .with_scaled_background(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::vector::GeometryLayer;
    use crate::MapError;

    #[test]
    fn test_map_builder_basic() {
        let map = MapBuilder::headless(Size::new(320, 240))
            .with_focus_and_zoom(LatLng::new(52.0, 13.0), 8)
            .with_zoom_limits(2, 12)
            .build()
            .unwrap();

        assert_eq!(map.zoom(), 8);
        assert_eq!(map.focus(), LatLng::new(52.0, 13.0));
        assert_eq!(map.viewport_size(), Size::new(320, 240));
        assert_eq!(map.viewport().zoom_min(), 2);
    }

    #[test]
    fn test_initial_zoom_is_clamped() {
        let map = MapBuilder::headless(Size::new(100, 100))
            .with_zoom_limits(3, 5)
            .with_focus_and_zoom(LatLng::default(), 40)
            .build()
            .unwrap();
        assert_eq!(map.zoom(), 5);
    }

    #[test]
    fn test_layers_added_in_order() {
        let map = MapBuilder::headless(Size::new(100, 100))
            .with_layer(Arc::new(GeometryLayer::new("bottom")))
            .with_layer(Arc::new(GeometryLayer::new("top")))
            .build()
            .unwrap();
        assert_eq!(map.layers().names(), vec!["bottom", "top"]);
    }

    #[test]
    fn test_minimal_map_preset() {
        let map = MapBuilder::minimal_map(LatLng::default(), 4, Size::new(100, 100))
            .with_executor(Arc::new(InlineExecutor))
            .build()
            .unwrap();
        assert!(!map.interaction().mouse_enabled);
        assert!(!map.config().overlays.crosshairs);
    }

    #[test]
    fn test_desktop_map_preset() {
        let builder = MapBuilder::desktop_map(LatLng::default(), 4, Size::new(100, 100));
        assert_eq!(builder.config.mouse.right_button, MouseButtonMode::PanBox);
        assert!(builder.config.overlays.scalebar);
    }

    #[test]
    fn test_zero_tile_size_is_rejected() {
        let result = MapBuilder::headless(Size::new(10, 10)).with_tile_size(0).build();
        assert!(matches!(result, Err(MapError::Render(_))));
    }
}
