use image::{Rgba, RgbaImage};
use mapframe::{
    prelude::*,
    runtime::TokioExecutor,
    spatial::selection::SelectionArea,
};

/// Renders a demo scene: generated tiles, a few markers and a route, a zoom
/// step and a box selection, then writes the frame to a PNG.
fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    mapframe::init_logging();

    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "mapframe-demo.png".to_string());

    let runtime = tokio::runtime::Runtime::new()?;
    let tiles = Arc::new(MemoryTileSource::new());

    let places = Arc::new(GeometryLayer::new("places"));
    for (lat, lng) in [(48.8566, 2.3522), (50.8503, 4.3517), (52.3676, 4.9041)] {
        places.add_point(GeometryPoint::circle(
            LatLng::new(lat, lng),
            12.0,
            Pen::new(Color::RED, 2.0),
        ))?;
    }
    let route = Arc::new(GeometryLayer::new("route"));
    route.add_line_string(GeometryLineString::from_coordinates(
        &[
            LatLng::new(48.8566, 2.3522),
            LatLng::new(50.8503, 4.3517),
            LatLng::new(52.3676, 4.9041),
        ],
        Pen::new(Color::BLUE, 3.0),
    ))?;

    let mut map = MapBuilder::desktop_map(LatLng::new(50.5, 3.5), 5, Size::new(640, 480))
        .with_executor(Arc::new(TokioExecutor::new(runtime.handle().clone())))
        .with_content_source(tiles.clone())
        .with_background(Color::WHITE)
        .with_layer(Arc::new(TileLayer::new("base", tiles.clone())))
        .with_layer(route)
        .with_layer(places)
        .build()?;

    map.on("backbufferupdated", |event| log::info!("{:?}", event));
    map.on("geometriesselected", |event| {
        if let MapEvent::GeometriesSelected(result) = event {
            for (layer, geometries) in result.iter() {
                log::info!("selected {} geometries in '{}'", geometries.len(), layer);
            }
        }
    });

    settle(&mut map, &tiles);
    map.zoom_in();
    settle(&mut map, &tiles);

    let selection = map.select(&SelectionArea::Rect(Bounds::from_coords(0.0, 0.0, 640.0, 480.0)));
    println!("{} geometries on screen", selection.total());

    map.save_frame(&output)?;
    println!("wrote {}", output);
    Ok(())
}

/// Serves every tile the last redraw asked for until no more are missing
fn settle(map: &mut MapControl, tiles: &MemoryTileSource) {
    for _ in 0..8 {
        map.wait_for_redraw(Duration::from_secs(5));
        map.process_events();
        let pending = tiles.pending_tiles();
        if pending.is_empty() {
            break;
        }
        for coord in pending {
            tiles.insert_tile(coord, checker_tile(coord));
        }
        map.update(Instant::now());
    }
    map.process_events();
}

fn checker_tile(coord: TileCoord) -> RgbaImage {
    let shade = if (coord.x + coord.y) % 2 == 0 { 235 } else { 215 };
    RgbaImage::from_fn(256, 256, |x, y| {
        if x == 0 || y == 0 {
            Rgba([180, 180, 180, 255])
        } else {
            Rgba([shade, shade, shade, 255])
        }
    })
}
