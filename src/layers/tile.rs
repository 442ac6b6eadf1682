use crate::{
    core::{bounds::Bounds, geo::TileCoord, projection::Projection},
    layers::{
        base::{LayerProperties, LayerTrait, LayerType},
        geometry::ZoomRange,
    },
    rendering::surface::DrawingSurface,
    tiles::source::ContentSource,
};
use std::sync::Arc;

/// Draws the tiles covering the redraw rectangle from a content source.
///
/// Missing tiles are left to the background; the source schedules them and
/// reports back through its notifier, which triggers the next redraw.
pub struct TileLayer {
    properties: LayerProperties,
    source: Arc<dyn ContentSource>,
}

impl TileLayer {
    pub fn new(name: impl Into<String>, source: Arc<dyn ContentSource>) -> Self {
        Self {
            properties: LayerProperties::new(name, LayerType::Tile),
            source,
        }
    }

    pub fn with_zoom_range(mut self, zoom_range: ZoomRange) -> Self {
        self.properties = self.properties.with_zoom_range(zoom_range);
        self
    }

    pub fn source(&self) -> &Arc<dyn ContentSource> {
        &self.source
    }

    /// Tiles intersecting `rect_px` at `zoom`, row by row
    pub fn tiles_in(rect_px: &Bounds, zoom: i32, projection: &dyn Projection) -> Vec<TileCoord> {
        let Ok(z) = u8::try_from(zoom) else {
            return Vec::new();
        };
        let tile_size = projection.tile_size() as f64;
        let (columns, rows) = (projection.tiles_x(zoom), projection.tiles_y(zoom));
        if tile_size <= 0.0 || columns == 0 || rows == 0 {
            return Vec::new();
        }

        let range = |min: f64, max: f64, count: u32| -> Option<(u32, u32)> {
            let first = (min / tile_size).floor().max(0.0);
            let last = ((max / tile_size).ceil() - 1.0).min(count as f64 - 1.0);
            (last >= first).then_some((first as u32, last as u32))
        };
        let (Some((x0, x1)), Some((y0, y1))) = (
            range(rect_px.min.x, rect_px.max.x, columns),
            range(rect_px.min.y, rect_px.max.y, rows),
        ) else {
            return Vec::new();
        };

        (y0..=y1)
            .flat_map(|y| (x0..=x1).map(move |x| TileCoord::new(x, y, z)))
            .collect()
    }
}

impl LayerTrait for TileLayer {
    crate::impl_layer_trait!(properties);

    fn draw(
        &self,
        surface: &mut dyn DrawingSurface,
        rect_px: &Bounds,
        zoom: i32,
        projection: &dyn Projection,
    ) {
        let tile_size = projection.tile_size();
        let mut missing = 0usize;
        for coord in Self::tiles_in(rect_px, zoom, projection) {
            match self.source.request_tile(coord) {
                Some(image) => surface.draw_image(&coord.origin_px(tile_size), &image),
                None => missing += 1,
            }
        }
        if missing > 0 {
            log::trace!("layer '{}' is waiting for {} tiles", self.properties.name, missing);
        }
    }
}
