use crate::core::{
    bounds::Bounds,
    geo::{LatLng, LatLngBounds, Point},
};

use rstar::{RTree, RTreeObject, AABB};

/// A key stored in an R-tree under its bounding box
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialItem<K> {
    pub key: K,
    pub bounds: Bounds,
}

impl<K> SpatialItem<K> {
    pub fn new(key: K, bounds: Bounds) -> Self {
        Self { key, bounds }
    }

    pub fn from_point(key: K, point: Point) -> Self {
        Self::new(key, Bounds::new(point, point))
    }

    /// Geographic bounds are stored as `(lng, lat)` pairs
    pub fn from_lat_lng_bounds(key: K, bounds: &LatLngBounds) -> Self {
        Self::new(key, to_planar(bounds))
    }

    pub fn from_lat_lng(key: K, lat_lng: LatLng) -> Self {
        Self::from_point(key, Point::new(lat_lng.lng, lat_lng.lat))
    }
}

fn to_planar(bounds: &LatLngBounds) -> Bounds {
    Bounds::from_coords(
        bounds.south_west.lng,
        bounds.south_west.lat,
        bounds.north_east.lng,
        bounds.north_east.lat,
    )
}

// --- rstar integration -------------------------------------------------------------------------

impl<K> RTreeObject for SpatialItem<K> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.min.x, self.bounds.min.y],
            [self.bounds.max.x, self.bounds.max.y],
        )
    }
}

/// R-tree based spatial index
pub struct SpatialIndex<K> {
    rtree: RTree<SpatialItem<K>>,
}

impl<K: Clone + PartialEq> SpatialIndex<K> {
    pub fn new() -> Self {
        Self {
            rtree: RTree::new(),
        }
    }

    pub fn insert(&mut self, item: SpatialItem<K>) {
        self.rtree.insert(item);
    }

    /// Keys whose bounds intersect `bounds`, in no particular order
    pub fn query(&self, bounds: &Bounds) -> Vec<K> {
        let envelope = AABB::from_corners(
            [bounds.min.x, bounds.min.y],
            [bounds.max.x, bounds.max.y],
        );
        self.rtree
            .locate_in_envelope_intersecting(&envelope)
            .map(|item| item.key.clone())
            .collect()
    }

    pub fn query_lat_lng(&self, bounds: &LatLngBounds) -> Vec<K> {
        self.query(&to_planar(bounds))
    }

    pub fn remove(&mut self, key: &K) -> Option<SpatialItem<K>> {
        // First find the element immutably, clone it, then remove mutably.
        let found = self.rtree.iter().find(|item| item.key == *key).cloned()?;
        self.rtree.remove(&found)
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn clear(&mut self) {
        self.rtree = RTree::new();
    }
}

impl<K: Clone + PartialEq> Default for SpatialIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}
