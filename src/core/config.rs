//! Configuration for the map control
//!
//! Every field has a default, so a config can be deserialized from a partial
//! JSON document and only override what it names.

use crate::{
    core::{
        constants::{
            CLICK_TOLERANCE_PX, DEFAULT_SCROLL_STEP_PX, DEFAULT_ZOOM_MAX, DEFAULT_ZOOM_MIN,
            SELECTION_LINE_TOLERANCE_PX, TILE_SIZE,
        },
        geo::{LatLng, LatLngBounds, Size},
        projection::ProjectionKind,
    },
    input::handler::MouseButtonMode,
    rendering::surface::Color,
    Result,
};
use serde::{Deserialize, Serialize};

/// Top-level map control configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub projection: ProjectionKind,
    pub tile_size: u32,
    pub zoom_min: i32,
    pub zoom_max: i32,
    /// Starting zoom, clamped into `[zoom_min, zoom_max]`
    pub initial_zoom: Option<i32>,
    pub initial_focus: LatLng,
    pub viewport_size: Size,
    pub pan_limit: Option<LatLngBounds>,
    pub background: Color,
    /// Paint a scaled copy of the current frame while a zoom redraw is pending
    pub scaled_background: bool,
    pub overlays: OverlayConfig,
    pub mouse: MouseConfig,
    /// Pixel distance the arrow keys scroll by
    pub keyboard_scroll_px: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            projection: ProjectionKind::SphericalMercator,
            tile_size: TILE_SIZE,
            zoom_min: DEFAULT_ZOOM_MIN,
            zoom_max: DEFAULT_ZOOM_MAX,
            initial_zoom: None,
            initial_focus: LatLng::default(),
            viewport_size: Size::new(800, 600),
            pan_limit: None,
            background: Color::TRANSPARENT,
            scaled_background: true,
            overlays: OverlayConfig::default(),
            mouse: MouseConfig::default(),
            keyboard_scroll_px: DEFAULT_SCROLL_STEP_PX,
        }
    }
}

impl MapConfig {
    /// Parses a (possibly partial) JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Decorations painted on top of the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub crosshairs: bool,
    pub scalebar: bool,
    pub viewport_border: bool,
    pub overlay_colour: Color,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            crosshairs: true,
            scalebar: false,
            viewport_border: false,
            overlay_colour: Color::BLACK,
        }
    }
}

/// Pointer handling options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MouseConfig {
    pub enabled: bool,
    pub left_button: MouseButtonMode,
    pub right_button: MouseButtonMode,
    /// Left button drag shapes are centred on the press point instead of
    /// spanning press to release
    pub left_origin_center: bool,
    /// Same for the right button
    pub right_origin_center: bool,
    /// Width of the band tested around a line selection
    pub selection_line_tolerance_px: f64,
    /// Edge length of the square tested around a press for geometry clicks
    pub click_tolerance_px: f64,
}

impl Default for MouseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            left_button: MouseButtonMode::Pan,
            right_button: MouseButtonMode::DrawBox,
            left_origin_center: false,
            right_origin_center: false,
            selection_line_tolerance_px: SELECTION_LINE_TOLERANCE_PX,
            click_tolerance_px: CLICK_TOLERANCE_PX,
        }
    }
}
