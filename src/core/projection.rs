//! Geographic to map-pixel projections.
//!
//! A projection maps a [`LatLng`] onto the pixel plane of one integer zoom
//! level. Map pixels at different zoom levels are not comparable; the world
//! doubles in size with every level.

use crate::core::{
    bounds::Bounds,
    constants::TILE_SIZE,
    geo::{LatLng, LatLngBounds, Point},
};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt::Debug;

/// Supported projection families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProjectionKind {
    /// Web Mercator (EPSG:3857), square world of `tile_size * 2^zoom`
    #[default]
    SphericalMercator,
    /// Plate carrée (EPSG:4326), twice as wide as it is tall
    Equirectangular,
}

impl ProjectionKind {
    /// Builds the projection with the given tile size
    pub fn build(self, tile_size: u32) -> Box<dyn Projection> {
        match self {
            Self::SphericalMercator => Box::new(SphericalMercator::new(tile_size)),
            Self::Equirectangular => Box::new(Equirectangular::new(tile_size)),
        }
    }
}

/// Bidirectional conversion between geographic coordinates and map pixels.
///
/// Implementations must be a bijection for a fixed zoom level, so that
/// `to_coordinate(to_pixel(c, z), z)` returns `c` within floating point
/// tolerance.
pub trait Projection: Send + Sync + Debug {
    fn kind(&self) -> ProjectionKind;

    /// Edge length of one square tile in pixels
    fn tile_size(&self) -> u32;

    /// Number of tile columns covering the world at `zoom`
    fn tiles_x(&self, zoom: i32) -> u32;

    /// Number of tile rows covering the world at `zoom`
    fn tiles_y(&self, zoom: i32) -> u32;

    fn to_pixel(&self, coord: &LatLng, zoom: i32) -> Point;

    fn to_coordinate(&self, pixel: &Point, zoom: i32) -> LatLng;

    /// Geographic rectangle spanned by a map-pixel rectangle at `zoom`
    fn to_coordinate_bounds(&self, rect: &Bounds, zoom: i32) -> LatLngBounds {
        LatLngBounds::from_corners(
            self.to_coordinate(&rect.min, zoom),
            self.to_coordinate(&rect.max, zoom),
        )
    }

    /// World size in map pixels at `zoom`
    fn world_size(&self, zoom: i32) -> Point {
        let ts = self.tile_size() as f64;
        Point::new(
            world_tiles(zoom, 0) * ts * self.tiles_x(0) as f64,
            world_tiles(zoom, 0) * ts * self.tiles_y(0) as f64,
        )
    }
}

/// `2^(zoom + extra)` as a float, well defined for negative zoom levels
fn world_tiles(zoom: i32, extra: i32) -> f64 {
    2_f64.powi(zoom.saturating_add(extra))
}

/// Tile count for a non-negative zoom, saturating instead of overflowing
fn tile_count(zoom: i32, extra: i32) -> u32 {
    let exponent = zoom.saturating_add(extra).clamp(0, 31) as u32;
    1u32 << exponent
}

/// Spherical (Web) Mercator projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalMercator {
    tile_size: u32,
}

impl SphericalMercator {
    pub fn new(tile_size: u32) -> Self {
        Self { tile_size }
    }

    fn world_px(&self, zoom: i32) -> f64 {
        world_tiles(zoom, 0) * self.tile_size as f64
    }
}

impl Default for SphericalMercator {
    fn default() -> Self {
        Self::new(TILE_SIZE)
    }
}

impl Projection for SphericalMercator {
    fn kind(&self) -> ProjectionKind {
        ProjectionKind::SphericalMercator
    }

    fn tile_size(&self) -> u32 {
        self.tile_size
    }

    fn tiles_x(&self, zoom: i32) -> u32 {
        tile_count(zoom, 0)
    }

    fn tiles_y(&self, zoom: i32) -> u32 {
        tile_count(zoom, 0)
    }

    fn to_pixel(&self, coord: &LatLng, zoom: i32) -> Point {
        let world = self.world_px(zoom);
        let lat_rad = LatLng::clamp_lat(coord.lat).to_radians();
        let x = (coord.lng + 180.0) / 360.0 * world;
        let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * world;
        Point::new(x, y)
    }

    fn to_coordinate(&self, pixel: &Point, zoom: i32) -> LatLng {
        let world = self.world_px(zoom);
        let lng = pixel.x / world * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * pixel.y / world)).sinh().atan().to_degrees();
        LatLng::new(lat, lng)
    }
}

/// Equirectangular (plate carrée) projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equirectangular {
    tile_size: u32,
}

impl Equirectangular {
    pub fn new(tile_size: u32) -> Self {
        Self { tile_size }
    }
}

impl Default for Equirectangular {
    fn default() -> Self {
        Self::new(TILE_SIZE)
    }
}

impl Projection for Equirectangular {
    fn kind(&self) -> ProjectionKind {
        ProjectionKind::Equirectangular
    }

    fn tile_size(&self) -> u32 {
        self.tile_size
    }

    fn tiles_x(&self, zoom: i32) -> u32 {
        tile_count(zoom, 1)
    }

    fn tiles_y(&self, zoom: i32) -> u32 {
        tile_count(zoom, 0)
    }

    fn to_pixel(&self, coord: &LatLng, zoom: i32) -> Point {
        let ts = self.tile_size as f64;
        let width = world_tiles(zoom, 1) * ts;
        let height = world_tiles(zoom, 0) * ts;
        Point::new(
            (coord.lng + 180.0) / 360.0 * width,
            (90.0 - coord.lat) / 180.0 * height,
        )
    }

    fn to_coordinate(&self, pixel: &Point, zoom: i32) -> LatLng {
        let ts = self.tile_size as f64;
        let width = world_tiles(zoom, 1) * ts;
        let height = world_tiles(zoom, 0) * ts;
        LatLng::new(90.0 - pixel.y / height * 180.0, pixel.x / width * 360.0 - 180.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn assert_round_trip(projection: &dyn Projection, max_lat: f64) {
        for zoom in 0..=17 {
            let mut lat = -max_lat;
            while lat <= max_lat {
                let mut lng = -180.0;
                while lng <= 180.0 {
                    let coord = LatLng::new(lat, lng);
                    let back = projection.to_coordinate(&projection.to_pixel(&coord, zoom), zoom);
                    assert!(
                        coord.approx_eq(&back, EPSILON),
                        "{:?} round trip at zoom {} gave {:?}",
                        coord,
                        zoom,
                        back
                    );
                    lng += 22.5;
                }
                lat += 8.5;
            }
        }
    }

    #[test]
    fn test_mercator_round_trip() {
        assert_round_trip(&SphericalMercator::default(), 85.0);
    }

    #[test]
    fn test_equirectangular_round_trip() {
        assert_round_trip(&Equirectangular::default(), 90.0);
    }

    #[test]
    fn test_mercator_origin_is_world_center() {
        let projection = SphericalMercator::default();
        let center = projection.to_pixel(&LatLng::new(0.0, 0.0), 1);
        assert!((center.x - 256.0).abs() < EPSILON);
        assert!((center.y - 256.0).abs() < EPSILON);
        assert_eq!(projection.world_size(1), Point::new(512.0, 512.0));
    }

    #[test]
    fn test_pixels_double_per_zoom_level() {
        let projection = SphericalMercator::default();
        let coord = LatLng::new(48.2, 16.37);
        let z10 = projection.to_pixel(&coord, 10);
        let z11 = projection.to_pixel(&coord, 11);
        assert!((z11.x - z10.x * 2.0).abs() < 1e-6);
        assert!((z11.y - z10.y * 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_mercator_poles_stay_finite() {
        let projection = SphericalMercator::default();
        let north = projection.to_pixel(&LatLng::new(90.0, 0.0), 2);
        assert!(north.y.is_finite());
        assert!(north.y.abs() < 1e-6);
    }

    #[test]
    fn test_equirectangular_world_is_twice_as_wide() {
        let projection = Equirectangular::new(256);
        assert_eq!(projection.tiles_x(0), 2);
        assert_eq!(projection.tiles_y(0), 1);
        assert_eq!(projection.world_size(2), Point::new(2048.0, 1024.0));
        let corner = projection.to_pixel(&LatLng::new(-90.0, 180.0), 0);
        assert_eq!(corner, Point::new(512.0, 256.0));
    }

    #[test]
    fn test_kind_builds_matching_projection() {
        let projection = ProjectionKind::Equirectangular.build(128);
        assert_eq!(projection.kind(), ProjectionKind::Equirectangular);
        assert_eq!(projection.tile_size(), 128);
    }
}
