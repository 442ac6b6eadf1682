//! # mapframe
//!
//! A layer-based map viewport engine.
//!
//! The crate converts between geographic coordinates, zoom-dependent map
//! pixels and viewport pixels, keeps an oversized backbuffer that is redrawn
//! off the interactive thread and published atomically, drives a zoom, pan
//! and focus state machine with scaled previews and animated transitions,
//! and hit-tests interactively drawn selection shapes against layer
//! geometries.

pub mod core;
pub mod input;
pub mod layers;
pub mod prelude;
pub mod rendering;
pub mod runtime;
pub mod spatial;
pub mod tiles;
pub mod traits;
#[cfg(feature = "egui")]
pub mod ui;

pub use crate::core::constants;

// Re-export public API
pub use core::{
    bounds::Bounds,
    builder::MapBuilder,
    config::MapConfig,
    geo::{LatLng, LatLngBounds, Point, Size, TileCoord},
    map::MapControl,
    projection::{Equirectangular, Projection, ProjectionKind, SphericalMercator},
    transform::CoordinateTransform,
    viewport::ViewportState,
};

pub use layers::{
    base::LayerTrait,
    geometry::{Geometry, GeometryId, GeometryLineString, GeometryPoint},
    manager::LayerManager,
    tile::TileLayer,
    vector::GeometryLayer,
};

pub use input::{
    events::{InputEvent, MapEvent},
    handler::{InteractionController, MouseButtonMode},
};

pub use rendering::{
    backbuffer::{Backbuffer, BackbufferRenderer},
    context::RenderContext,
    raster::RasterSurface,
    surface::{Color, DrawingSurface, Pen},
};

pub use spatial::{
    hit_test::{HitTester, SelectionResult},
    index::SpatialIndex,
    selection::SelectionArea,
};

pub use tiles::source::{ContentSource, MemoryTileSource};

/// Installs `env_logger` reading `RUST_LOG`, defaulting to `info`.
/// Safe to call more than once.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("An animation is already in progress")]
    AlreadyAnimating,
}

/// Error type alias for convenience
pub type Error = MapError;
