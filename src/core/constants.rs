//! Core constants for the viewport engine.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Default lowest zoom level.
pub const DEFAULT_ZOOM_MIN: i32 = 0;

/// Default highest zoom level.
pub const DEFAULT_ZOOM_MAX: i32 = 17;

/// Backbuffer edge length as a multiple of the viewport edge length.
pub const BACKBUFFER_SCALE: u32 = 2;

/// Pixel distance scrolled by the arrow keys and the scroll helpers.
pub const DEFAULT_SCROLL_STEP_PX: f64 = 10.0;

/// Width of the tolerance band drawn around a line selection.
pub const SELECTION_LINE_TOLERANCE_PX: f64 = 5.0;

/// Edge length of the square tested around a pointer press for geometry clicks.
pub const CLICK_TOLERANCE_PX: f64 = 5.0;

/// Fill colour (RGBA) of an in-progress drag shape.
pub const DRAG_SHAPE_COLOUR: [u8; 4] = [66, 132, 253, 102];

/// Length of each crosshair arm, measured from the viewport centre.
pub const CROSSHAIR_ARM_PX: f64 = 10.0;

/// Scalebar distance in metres, indexed by zoom level.
pub const SCALEBAR_DISTANCES_M: [f64; 19] = [
    5_000_000.0,
    2_000_000.0,
    1_000_000.0,
    1_000_000.0,
    1_000_000.0,
    100_000.0,
    100_000.0,
    50_000.0,
    50_000.0,
    10_000.0,
    10_000.0,
    10_000.0,
    1_000.0,
    1_000.0,
    500.0,
    200.0,
    100.0,
    50.0,
    25.0,
];

/// Ground resolution in metres per pixel at zoom 18 on the equator.
pub const METRES_PER_PIXEL_AT_Z18: f64 = 0.597164;

/// Default diameter of a circle marker.
pub const DEFAULT_CIRCLE_DIAMETER_PX: f64 = 10.0;
