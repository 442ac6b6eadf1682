//! Prelude module for common mapframe types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use mapframe::prelude::*;`

pub use crate::core::{
    bounds::Bounds,
    builder::MapBuilder,
    config::{MapConfig, MouseConfig, OverlayConfig},
    geo::{LatLng, LatLngBounds, Point, Size, TileCoord},
    map::MapControl,
    projection::{Projection, ProjectionKind},
    transform::CoordinateTransform,
    viewport::ViewportState,
};

pub use crate::layers::{
    base::{LayerTrait, LayerType},
    geometry::{Geometry, GeometryId, GeometryLineString, GeometryPoint, ZoomRange},
    manager::LayerManager,
    tile::TileLayer,
    vector::GeometryLayer,
};

pub use crate::input::{
    events::{EventHandled, InputEvent, KeyCode, KeyModifiers, MapEvent, MouseButton},
    handler::{InteractionController, MouseButtonMode},
};

pub use crate::spatial::{
    hit_test::{HitTester, SelectionResult},
    selection::{SelectionArea, SelectionShape},
};

pub use crate::rendering::{
    context::RenderContext,
    raster::RasterSurface,
    surface::{Color, DrawingSurface, Pen},
};

pub use crate::runtime::{InlineExecutor, RedrawExecutor, ThreadExecutor};

#[cfg(feature = "tokio-runtime")]
pub use crate::runtime::TokioExecutor;

pub use crate::tiles::source::{ContentSource, MemoryTileSource};

#[cfg(feature = "egui")]
pub use crate::ui::MapView;

pub use crate::{Error as MapError, Result};

pub use std::{
    sync::Arc,
    time::{Duration, Instant},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
