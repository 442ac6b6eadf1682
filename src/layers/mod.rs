pub mod macros;

pub mod base;
pub mod geometry;
pub mod manager;
pub mod tile;
pub mod vector;

pub use base::{LayerProperties, LayerTrait, LayerType};
pub use geometry::{
    Alignment, Geometry, GeometryId, GeometryLineString, GeometryPoint, GeometryRef, PointMarker,
    ZoomRange,
};
pub use manager::LayerManager;
pub use tile::TileLayer;
pub use vector::GeometryLayer;
