use crate::{
    core::{
        geo::{LatLng, LatLngBounds, Point, Size},
        projection::Projection,
        transform::CoordinateTransform,
    },
    runtime::TryGuard,
    MapError, Result,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// An in-flight focus animation
#[derive(Debug, Clone, PartialEq)]
pub struct FocusAnimation {
    pub target: LatLng,
    pub steps_remaining: u32,
    pub interval: Duration,
    pub next_tick: Instant,
}

/// Zoom, focus and size of the visible map area
///
/// Holds the zoom invariant `zoom_min <= zoom <= zoom_max` at all times.
/// Transitions here are pure state changes; loading aborts, previews and
/// redraws are layered on top by the map control.
#[derive(Debug)]
pub struct ViewportState {
    projection: Arc<dyn Projection>,
    focus: LatLng,
    zoom_min: i32,
    zoom_max: i32,
    zoom: i32,
    viewport_size: Size,
    pan_limit: Option<LatLngBounds>,
    animation: Option<FocusAnimation>,
    animation_guard: TryGuard,
}

impl ViewportState {
    pub fn new(projection: Arc<dyn Projection>, zoom_min: i32, zoom_max: i32, viewport_size: Size) -> Self {
        let (zoom_min, zoom_max) = ordered(zoom_min, zoom_max);
        Self {
            projection,
            focus: LatLng::default(),
            zoom_min,
            zoom_max,
            zoom: zoom_min,
            viewport_size,
            pan_limit: None,
            animation: None,
            animation_guard: TryGuard::new(),
        }
    }

    pub fn projection(&self) -> &Arc<dyn Projection> {
        &self.projection
    }

    pub fn focus(&self) -> LatLng {
        self.focus
    }

    pub fn zoom(&self) -> i32 {
        self.zoom
    }

    pub fn zoom_min(&self) -> i32 {
        self.zoom_min
    }

    pub fn zoom_max(&self) -> i32 {
        self.zoom_max
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport_size
    }

    pub fn pan_limit(&self) -> Option<LatLngBounds> {
        self.pan_limit
    }

    /// Coordinate conversions for the current focus, zoom and size
    pub fn transform(&self) -> CoordinateTransform<'_> {
        CoordinateTransform::new(
            self.projection.as_ref(),
            self.focus,
            self.zoom,
            self.viewport_size,
        )
    }

    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewport_size = size;
    }

    /// Sets new zoom bounds, swapping them if given in the wrong order, and
    /// pulls the current zoom back inside. Returns the zoom levels the current
    /// zoom has to step by to satisfy the new bounds.
    pub fn set_zoom_limits(&mut self, zoom_min: i32, zoom_max: i32) -> i32 {
        let (zoom_min, zoom_max) = ordered(zoom_min, zoom_max);
        self.zoom_min = zoom_min;
        self.zoom_max = zoom_max;
        self.clamp_zoom(self.zoom) - self.zoom
    }

    pub fn clamp_zoom(&self, zoom: i32) -> i32 {
        zoom.clamp(self.zoom_min, self.zoom_max)
    }

    pub fn can_zoom_in(&self) -> bool {
        self.zoom < self.zoom_max
    }

    pub fn can_zoom_out(&self) -> bool {
        self.zoom > self.zoom_min
    }

    /// One level in, `false` at the upper bound
    pub fn step_zoom_in(&mut self) -> bool {
        if !self.can_zoom_in() {
            return false;
        }
        self.zoom += 1;
        true
    }

    /// One level out, `false` at the lower bound
    pub fn step_zoom_out(&mut self) -> bool {
        if !self.can_zoom_out() {
            return false;
        }
        self.zoom -= 1;
        true
    }

    /// Restricts focus updates to a rectangle; degenerate rectangles do not constrain
    pub fn set_pan_limit(&mut self, limit: Option<LatLngBounds>) {
        self.pan_limit = limit;
    }

    pub fn accepts_focus(&self, coord: &LatLng) -> bool {
        match &self.pan_limit {
            Some(limit) if limit.is_valid() => limit.contains(coord),
            _ => true,
        }
    }

    /// Moves the focus, rejected when outside the pan limit
    pub fn set_focus(&mut self, coord: LatLng) -> bool {
        if !self.accepts_focus(&coord) {
            log::trace!("focus {:?} rejected by pan limit", coord);
            return false;
        }
        self.focus = coord;
        true
    }

    /// Focus candidate after moving the view by a map-pixel delta
    pub fn scroll_target(&self, delta_px: &Point) -> LatLng {
        let transform = self.transform();
        transform.to_coordinate(&transform.focus_px().add(delta_px))
    }

    pub fn scroll(&mut self, delta_px: &Point) -> bool {
        let target = self.scroll_target(delta_px);
        self.set_focus(target)
    }

    /// Whether every point lies inside the visible geographic rectangle
    pub fn contains_all(&self, points: &[LatLng]) -> bool {
        let rect = self.transform().viewport_rect();
        points.iter().all(|p| rect.contains(p))
    }

    pub fn is_animating(&self) -> bool {
        self.animation_guard.is_held()
    }

    pub fn animation(&self) -> Option<&FocusAnimation> {
        self.animation.as_ref()
    }

    /// Schedules `steps` equal focus increments spaced `interval` apart.
    /// The first tick is due one interval after `now`.
    pub fn begin_animation(&mut self, target: LatLng, steps: u32, interval: Duration, now: Instant) -> Result<()> {
        if !self.animation_guard.try_acquire() {
            return Err(MapError::AlreadyAnimating);
        }
        self.animation = Some(FocusAnimation {
            target,
            steps_remaining: steps,
            interval,
            next_tick: now + interval,
        });
        Ok(())
    }

    /// Pops the next animation increment if one is due at `now`.
    ///
    /// The increment is the remaining map-pixel distance divided by the
    /// remaining step count, so the last step lands on the target exactly.
    pub fn next_animation_step(&mut self, now: Instant) -> Option<Point> {
        let focus_px = self.transform().focus_px();
        let animation = self.animation.as_mut()?;
        if animation.next_tick > now {
            return None;
        }
        if animation.steps_remaining == 0 {
            self.finish_animation();
            return None;
        }

        let target_px = self.projection.to_pixel(&animation.target, self.zoom);
        let step = target_px
            .subtract(&focus_px)
            .divide(animation.steps_remaining as f64);
        animation.steps_remaining -= 1;
        animation.next_tick += animation.interval;
        if animation.steps_remaining == 0 {
            self.finish_animation();
        }
        Some(step)
    }

    /// Time the next animation tick is due, if animating
    pub fn next_animation_deadline(&self) -> Option<Instant> {
        self.animation.as_ref().map(|a| a.next_tick)
    }

    fn finish_animation(&mut self) {
        self.animation = None;
        self.animation_guard.release();
    }
}

fn ordered(a: i32, b: i32) -> (i32, i32) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::projection::SphericalMercator;

    fn state(zoom_min: i32, zoom_max: i32) -> ViewportState {
        ViewportState::new(
            Arc::new(SphericalMercator::default()),
            zoom_min,
            zoom_max,
            Size::new(400, 400),
        )
    }

    #[test]
    fn test_zoom_limits_swapped_when_reversed() {
        let mut viewport = state(17, 2);
        assert_eq!(viewport.zoom_min(), 2);
        assert_eq!(viewport.zoom_max(), 17);
        assert_eq!(viewport.zoom(), 2);

        viewport.set_zoom_limits(5, 3);
        assert_eq!((viewport.zoom_min(), viewport.zoom_max()), (3, 5));
    }

    #[test]
    fn test_zoom_limits_report_required_step() {
        let mut viewport = state(0, 17);
        for _ in 0..10 {
            viewport.step_zoom_in();
        }
        assert_eq!(viewport.set_zoom_limits(0, 7), -3);
        assert_eq!(viewport.set_zoom_limits(12, 15), 2);
    }

    #[test]
    fn test_zoom_steps_stop_at_bounds() {
        let mut viewport = state(3, 4);
        assert!(!viewport.step_zoom_out());
        assert!(viewport.step_zoom_in());
        assert!(!viewport.step_zoom_in());
        assert_eq!(viewport.zoom(), 4);
        assert!(viewport.step_zoom_out());
        assert_eq!(viewport.zoom(), 3);
    }

    #[test]
    fn test_pan_limit_rejects_outside_focus() {
        let mut viewport = state(0, 17);
        viewport.set_pan_limit(Some(LatLngBounds::from_coords(-10.0, -10.0, 10.0, 10.0)));

        assert!(viewport.set_focus(LatLng::new(5.0, 5.0)));
        assert!(!viewport.set_focus(LatLng::new(50.0, 5.0)));
        assert_eq!(viewport.focus(), LatLng::new(5.0, 5.0));
    }

    #[test]
    fn test_degenerate_pan_limit_does_not_constrain() {
        let mut viewport = state(0, 17);
        let point = LatLng::new(1.0, 1.0);
        viewport.set_pan_limit(Some(LatLngBounds::new(point, point)));
        assert!(viewport.set_focus(LatLng::new(40.0, 40.0)));
    }

    #[test]
    fn test_scroll_moves_focus_in_pixel_space() {
        let mut viewport = state(0, 17);
        for _ in 0..4 {
            viewport.step_zoom_in();
        }
        let before = viewport.transform().focus_px();
        assert!(viewport.scroll(&Point::new(32.0, -16.0)));
        let after = viewport.transform().focus_px();
        assert!((after.x - before.x - 32.0).abs() < 1e-6);
        assert!((after.y - before.y + 16.0).abs() < 1e-6);
    }

    #[test]
    fn test_animation_guard_rejects_second_request() {
        let mut viewport = state(0, 17);
        let now = Instant::now();
        let interval = Duration::from_millis(100);
        viewport
            .begin_animation(LatLng::new(1.0, 1.0), 3, interval, now)
            .unwrap();
        let second = viewport.begin_animation(LatLng::new(2.0, 2.0), 3, interval, now);
        assert!(matches!(second, Err(MapError::AlreadyAnimating)));
        assert_eq!(viewport.animation().unwrap().target, LatLng::new(1.0, 1.0));
    }

    #[test]
    fn test_animation_steps_are_due_by_interval() {
        let mut viewport = state(0, 17);
        let now = Instant::now();
        let interval = Duration::from_millis(100);
        viewport
            .begin_animation(LatLng::new(0.0, 10.0), 2, interval, now)
            .unwrap();

        assert!(viewport.next_animation_step(now).is_none());
        let step = viewport.next_animation_step(now + interval).unwrap();
        viewport.scroll(&step);
        assert!(viewport.is_animating());
        let step = viewport.next_animation_step(now + interval * 2).unwrap();
        viewport.scroll(&step);
        assert!(!viewport.is_animating());
        assert!(viewport.focus().approx_eq(&LatLng::new(0.0, 10.0), 1e-9));
    }
}
