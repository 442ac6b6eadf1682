use mapframe::prelude::*;
use mapframe::core::projection::{Equirectangular, SphericalMercator};

/// Helper to build a map that renders on the calling thread
fn headless_map(size: Size, zoom_max: i32, zoom: i32) -> MapControl {
    MapBuilder::headless(size)
        .with_zoom_limits(0, zoom_max)
        .with_focus_and_zoom(LatLng::new(0.0, 0.0), zoom)
        .build()
        .unwrap()
}

fn zoom_events(map: &mut MapControl) -> Vec<i32> {
    map.process_events()
        .into_iter()
        .filter_map(|event| match event {
            MapEvent::ZoomChanged { zoom } => Some(zoom),
            _ => None,
        })
        .collect()
}

/// Three single zoom steps land three levels up, each triggering a redraw
#[test]
fn test_three_zoom_steps() {
    let mut map = headless_map(Size::new(400, 400), 17, 9);
    map.process_events();
    let before = map.stats().requested;

    assert!(map.zoom_in());
    assert!(map.zoom_in());
    assert!(map.zoom_in());

    assert_eq!(map.zoom(), 12);
    assert_eq!(zoom_events(&mut map), vec![10, 11, 12]);
    assert_eq!(map.stats().requested - before, 3);
}

/// Auto zoom on two points climbs to the upper bound when both still fit
#[test]
fn test_focus_points_with_auto_zoom() {
    let mut map = headless_map(Size::new(400, 400), 4, 0);
    let points = [LatLng::new(0.0, 0.0), LatLng::new(10.0, 10.0)];

    assert!(map.set_focus_points(&points, true));
    assert!(map.focus().approx_eq(&LatLng::new(5.0, 5.0), 1e-12));
    assert_eq!(map.zoom(), 4);
    assert!(map.viewport_contains_all(&points));
}

/// After auto zoom, the points are visible or the zoom is at its minimum
#[test]
fn test_auto_zoom_containment() {
    let point_sets = [
        vec![LatLng::new(-60.0, -150.0), LatLng::new(60.0, 150.0)],
        vec![LatLng::new(51.5, -0.12), LatLng::new(48.85, 2.35), LatLng::new(52.52, 13.4)],
        vec![LatLng::new(40.0, 40.0), LatLng::new(40.001, 40.001)],
    ];
    for points in point_sets {
        let mut map = headless_map(Size::new(300, 200), 17, 8);
        map.set_focus_points(&points, true);
        assert!(
            map.viewport_contains_all(&points) || map.zoom() == map.viewport().zoom_min(),
            "points {:?} not contained at zoom {}",
            points,
            map.zoom()
        );
    }
}

/// A second animation request is rejected while the first runs to its end
#[test]
fn test_animation_runs_five_ticks() {
    let mut map = headless_map(Size::new(400, 400), 17, 6);
    let target = LatLng::new(10.0, 10.0);

    map.animate_focus_to(target, 5, Duration::from_millis(100)).unwrap();
    let second = map.animate_focus_to(LatLng::new(-20.0, 0.0), 5, Duration::from_millis(100));
    assert!(matches!(second, Err(MapError::AlreadyAnimating)));

    let mut ticks = 0;
    while let Some(deadline) = map.next_animation_deadline() {
        map.update(deadline);
        ticks += 1;
        assert!(ticks <= 5);
    }

    assert_eq!(ticks, 5);
    assert!(!map.is_animating());
    assert!(map.focus().approx_eq(&target, 1e-6));
    assert!(map.animate_focus_to(LatLng::new(0.0, 0.0), 2, Duration::from_millis(10)).is_ok());
}

/// Zero steps jump straight to the target
#[test]
fn test_animation_without_steps_jumps() {
    let mut map = headless_map(Size::new(100, 100), 17, 3);
    map.animate_focus_to(LatLng::new(1.0, 2.0), 0, Duration::from_millis(100))
        .unwrap();
    assert_eq!(map.focus(), LatLng::new(1.0, 2.0));
    assert!(!map.is_animating());
}

/// Focus updates outside the pan limit leave the focus unchanged
#[test]
fn test_pan_limit_invariant() {
    let mut map = headless_map(Size::new(400, 400), 17, 6);
    map.set_pan_limit(Some(LatLngBounds::from_coords(-5.0, -5.0, 5.0, 5.0)));
    let before = map.focus();

    for candidate in [
        LatLng::new(6.0, 0.0),
        LatLng::new(0.0, -5.5),
        LatLng::new(80.0, 170.0),
        LatLng::new(-5.0001, 5.0001),
    ] {
        assert!(!map.set_focus(candidate));
        assert_eq!(map.focus(), before);
    }
    assert!(map.set_focus(LatLng::new(4.0, -4.0)));
}

/// Zooming in then out restores the zoom, and no sequence leaves the bounds
#[test]
fn test_zoom_monotonicity() {
    let mut map = headless_map(Size::new(200, 200), 7, 2);
    map.set_zoom_limits(2, 7);

    let start = map.zoom();
    map.zoom_in();
    map.zoom_out();
    assert_eq!(map.zoom(), start);

    let sequence = [1, 1, 1, 1, 1, 1, 1, -1, 1, -1, -1, -1, -1, -1, -1, -1, -1, 1];
    for step in sequence {
        if step > 0 {
            map.zoom_in();
        } else {
            map.zoom_out();
        }
        assert!((2..=7).contains(&map.zoom()));
    }

    map.set_zoom(100);
    assert_eq!(map.zoom(), 7);
    map.set_zoom(-100);
    assert_eq!(map.zoom(), 2);
}

/// Projecting to pixels and back returns the coordinate
#[test]
fn test_projection_round_trip() {
    let projections: [Box<dyn Projection>; 2] = [
        Box::new(SphericalMercator::default()),
        Box::new(Equirectangular::default()),
    ];
    for projection in &projections {
        for zoom in [0, 3, 9, 17] {
            for lat in [-80.0, -33.3, 0.0, 12.5, 85.0] {
                for lng in [-179.9, -45.0, 0.0, 90.1, 180.0] {
                    let coord = LatLng::new(lat, lng);
                    let back = projection.to_coordinate(&projection.to_pixel(&coord, zoom), zoom);
                    assert!(
                        back.approx_eq(&coord, 1e-9),
                        "{:?} at zoom {} came back as {:?}",
                        coord,
                        zoom,
                        back
                    );
                }
            }
        }
    }
}

/// Pan then zoom and zoom then pan keep the same coordinate under the pointer
#[test]
fn test_pan_and_zoom_commute_visually() {
    let mut a = headless_map(Size::new(400, 300), 17, 6);
    let mut b = headless_map(Size::new(400, 300), 17, 6);

    a.scroll(&Point::new(40.0, -20.0));
    a.zoom_in();

    b.zoom_in();
    b.scroll(&Point::new(80.0, -40.0));

    assert!(a.focus().approx_eq(&b.focus(), 1e-9));
}
