use crate::{
    core::{
        bounds::Bounds,
        geo::{LatLng, LatLngBounds},
        projection::Projection,
    },
    input::events::MapSignal,
    layers::{
        base::{LayerProperties, LayerTrait, LayerType},
        geometry::{Geometry, GeometryId, GeometryLineString, GeometryPoint, GeometryRef, ZoomRange},
    },
    rendering::surface::DrawingSurface,
    spatial::{index::SpatialItem, selection::SelectionArea, SpatialIndex},
    MapError, Result,
};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Arena of geometries plus the spatial index over their coordinates
#[derive(Default)]
struct GeometryStore {
    geometries: BTreeMap<GeometryId, Arc<Geometry>>,
    index: SpatialIndex<GeometryId>,
    next_id: u64,
    max_marker_extent_px: f64,
}

impl GeometryStore {
    fn index_geometry(&mut self, id: GeometryId, geometry: &Geometry) {
        if let Some(bounds) = geometry.coordinate_bounds() {
            self.index.insert(SpatialItem::from_lat_lng_bounds(id, &bounds));
        }
    }

    fn refresh_marker_extent(&mut self) {
        self.max_marker_extent_px = self
            .geometries
            .values()
            .map(|g| g.marker_extent_px())
            .fold(0.0, f64::max);
    }

    /// Candidates intersecting `bounds`, ordered by handle
    fn query(&self, bounds: &LatLngBounds) -> Vec<GeometryRef> {
        let mut ids = self.index.query_lat_lng(bounds);
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| {
                self.geometries.get(&id).map(|geometry| GeometryRef {
                    id,
                    geometry: geometry.clone(),
                })
            })
            .collect()
    }
}

/// A layer owning points and line strings
///
/// Geometries are addressed by [`GeometryId`] handles that stay valid until
/// the geometry is removed. Mutations request a redraw from the attached
/// map control.
pub struct GeometryLayer {
    properties: LayerProperties,
    store: RwLock<GeometryStore>,
}

impl GeometryLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            properties: LayerProperties::new(name, LayerType::Geometry),
            store: RwLock::new(GeometryStore::default()),
        }
    }

    pub fn with_zoom_range(mut self, zoom_range: ZoomRange) -> Self {
        self.properties = self.properties.with_zoom_range(zoom_range);
        self
    }

    fn read(&self) -> Option<RwLockReadGuard<'_, GeometryStore>> {
        match self.store.read() {
            Ok(store) => Some(store),
            Err(_) => {
                log::warn!("geometry store of '{}' poisoned", self.properties.name);
                None
            }
        }
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, GeometryStore>> {
        self.store
            .write()
            .map_err(|_| MapError::Layer(format!("geometry store of '{}' poisoned", self.properties.name)))
    }

    /// Adds a geometry and returns its handle
    pub fn add_geometry(&self, geometry: impl Into<Geometry>) -> Result<GeometryId> {
        let geometry = Arc::new(geometry.into());
        let id = {
            let mut store = self.write()?;
            let id = GeometryId(store.next_id);
            store.next_id += 1;
            store.index_geometry(id, &geometry);
            store.max_marker_extent_px = store.max_marker_extent_px.max(geometry.marker_extent_px());
            store.geometries.insert(id, geometry);
            id
        };
        self.properties.request_redraw();
        Ok(id)
    }

    pub fn add_point(&self, point: GeometryPoint) -> Result<GeometryId> {
        self.add_geometry(point)
    }

    pub fn add_line_string(&self, line: GeometryLineString) -> Result<GeometryId> {
        self.add_geometry(line)
    }

    pub fn remove_geometry(&self, id: GeometryId) -> Result<Option<Arc<Geometry>>> {
        let removed = {
            let mut store = self.write()?;
            let removed = store.geometries.remove(&id);
            if removed.is_some() {
                store.index.remove(&id);
                store.refresh_marker_extent();
            }
            removed
        };
        if removed.is_some() {
            self.properties.request_redraw();
        }
        Ok(removed)
    }

    pub fn clear(&self) -> Result<()> {
        {
            let mut store = self.write()?;
            store.geometries.clear();
            store.index.clear();
            store.max_marker_extent_px = 0.0;
        }
        self.properties.request_redraw();
        Ok(())
    }

    pub fn geometry(&self, id: GeometryId) -> Option<Arc<Geometry>> {
        self.read()?.geometries.get(&id).cloned()
    }

    /// Every geometry in handle order
    pub fn geometries(&self) -> Vec<GeometryRef> {
        self.read()
            .map(|store| {
                store
                    .geometries
                    .iter()
                    .map(|(id, geometry)| GeometryRef {
                        id: *id,
                        geometry: geometry.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.read().map(|store| store.geometries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Moves a point geometry, emitting "geometry moved" and a redraw
    pub fn set_point_coordinate(&self, id: GeometryId, coordinate: LatLng) -> Result<()> {
        {
            let mut store = self.write()?;
            let moved = match store.geometries.get(&id).map(|g| g.as_point()) {
                Some(Some(point)) => {
                    let mut point = point.clone();
                    point.set_coordinate(coordinate);
                    Geometry::Point(point)
                }
                Some(None) => {
                    return Err(MapError::Layer(format!("geometry {:?} is not a point", id)));
                }
                None => {
                    return Err(MapError::Layer(format!(
                        "no geometry {:?} in layer '{}'",
                        id, self.properties.name
                    )));
                }
            };
            store.index.remove(&id);
            store.index_geometry(id, &moved);
            store.geometries.insert(id, Arc::new(moved));
        }

        if let Some(signals) = self.properties.signals() {
            signals.send(MapSignal::GeometryMoved {
                layer: self.properties.name.clone(),
                geometry: id,
                coordinate,
            });
            signals.request_redraw();
        }
        Ok(())
    }

    /// Bounding box of the rendered geometry at `zoom`
    pub fn geometry_bounds(
        &self,
        id: GeometryId,
        zoom: i32,
        projection: &dyn Projection,
    ) -> Option<LatLngBounds> {
        self.geometry(id)?.bounding_box(zoom, projection)
    }

    /// Query region for a pixel rectangle, widened so markers drawn away
    /// from their coordinate are still found
    fn query_region(&self, rect_px: &Bounds, zoom: i32, projection: &dyn Projection) -> LatLngBounds {
        projection.to_coordinate_bounds(&rect_px.expanded(self.hit_margin_px()), zoom)
    }
}

impl LayerTrait for GeometryLayer {
    crate::impl_layer_trait!(properties);

    fn draw(
        &self,
        surface: &mut dyn DrawingSurface,
        rect_px: &Bounds,
        zoom: i32,
        projection: &dyn Projection,
    ) {
        let region = self.query_region(rect_px, zoom, projection);
        let Some(store) = self.read() else {
            return;
        };
        for candidate in store.query(&region) {
            candidate.geometry.draw(surface, rect_px, zoom, projection);
        }
    }

    fn geometries_in(&self, bounds: &LatLngBounds) -> Vec<GeometryRef> {
        self.read().map(|store| store.query(bounds)).unwrap_or_default()
    }

    fn hit_margin_px(&self) -> f64 {
        self.read().map(|store| store.max_marker_extent_px).unwrap_or(0.0)
    }

    fn pointer_pressed(
        &self,
        area: &SelectionArea,
        zoom: i32,
        projection: &dyn Projection,
    ) -> Vec<GeometryId> {
        let region = self.query_region(&area.bounding_box(), zoom, projection);
        let clicked: Vec<GeometryId> = self
            .geometries_in(&region)
            .into_iter()
            .filter(|candidate| candidate.geometry.touches(area, zoom, projection))
            .map(|candidate| candidate.id)
            .collect();

        if let Some(signals) = self.properties.signals() {
            for id in &clicked {
                signals.send(MapSignal::GeometryClicked {
                    layer: self.properties.name.clone(),
                    geometry: *id,
                });
            }
        }
        clicked
    }
}
