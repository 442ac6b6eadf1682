//! Double-buffered asynchronous redraw of the layer stack.
//!
//! A redraw renders an image twice the viewport size around the focus on a
//! worker, hands it back over a channel and is published by the interactive
//! thread in [`BackbufferRenderer::poll`]. The displayed buffer is only ever
//! replaced as a whole.

use crate::{
    core::{
        bounds::Bounds,
        constants::BACKBUFFER_SCALE,
        geo::{Point, Size},
        projection::Projection,
        transform::CoordinateTransform,
    },
    layers::manager::LayerManager,
    rendering::{
        raster::RasterSurface,
        surface::{Color, DrawingSurface},
    },
    runtime::{RedrawExecutor, TryGuard},
};
use crossbeam_channel::{Receiver, Sender};
use image::RgbaImage;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, RwLock,
};
use std::time::Duration;

/// A finished redraw
#[derive(Debug, Clone)]
pub struct Backbuffer {
    pub image: Arc<RgbaImage>,
    /// Map pixels the image covers, valid for `zoom` only
    pub coverage_px: Bounds,
    /// Focus in map pixels when the redraw captured the view
    pub map_focus_px: Point,
    pub zoom: i32,
}

impl Backbuffer {
    /// Whether the buffer can serve a view needing `required_px` at `zoom`
    pub fn covers(&self, required_px: &Bounds, zoom: i32) -> bool {
        self.zoom == zoom && self.coverage_px.contains_bounds(required_px)
    }

    /// Where the image's top-left corner lands in the viewport
    pub fn viewport_origin(&self, transform: &CoordinateTransform<'_>) -> Point {
        transform.map_px_to_viewport(&self.coverage_px.min)
    }
}

/// The view parameters a redraw renders with
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    pub projection: Arc<dyn Projection>,
    pub focus_px: Point,
    pub zoom: i32,
    pub viewport_size: Size,
    pub background: Color,
}

impl ViewSnapshot {
    /// Map pixels a backbuffer for this view covers: the focus plus and
    /// minus one viewport in each direction
    pub fn coverage_px(&self) -> Bounds {
        let half = self
            .viewport_size
            .to_point()
            .multiply(BACKBUFFER_SCALE as f64 / 2.0);
        Bounds::new(self.focus_px.subtract(&half), self.focus_px.add(&half))
    }
}

/// Renders every visible layer for `view` into a fresh image.
///
/// The surface is translated so layers draw in map pixels and clipped to
/// the coverage rectangle. An empty layer stack yields a background-only
/// image.
pub fn render_backbuffer(view: &ViewSnapshot, layers: &LayerManager) -> Backbuffer {
    let coverage_px = view.coverage_px();
    let width = view.viewport_size.width * BACKBUFFER_SCALE;
    let height = view.viewport_size.height * BACKBUFFER_SCALE;
    let mut image = RgbaImage::from_pixel(width, height, view.background.to_rgba());
    {
        let mut surface = RasterSurface::new(&mut image);
        surface.translate(&coverage_px.min.negate());
        surface.set_clip(Some(&coverage_px));
        for layer in layers.visible_layers(view.zoom) {
            surface.save();
            layer.draw(&mut surface, &coverage_px, view.zoom, view.projection.as_ref());
            surface.restore();
        }
        surface.set_clip(None);
        surface.translate(&coverage_px.min);
    }
    Backbuffer {
        image: Arc::new(image),
        coverage_px,
        map_focus_px: view.focus_px,
        zoom: view.zoom,
    }
}

/// Counters of the redraw pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedrawStats {
    /// Redraw requests received
    pub requested: usize,
    /// Requests coalesced into an already queued redraw
    pub dropped: usize,
    /// Redraws that finished rendering
    pub completed: usize,
    /// Most redraws ever rendering at the same time
    pub max_concurrent: usize,
}

/// What `poll` observed since the last call
#[derive(Debug, Clone, PartialEq)]
pub enum RedrawUpdate {
    Started,
    Published { coverage_px: Bounds, zoom: i32 },
}

enum WorkerMessage {
    Started,
    Finished(Backbuffer),
}

/// State shared between the renderer and its workers
struct Shared {
    view: RwLock<ViewSnapshot>,
    /// Held from dispatch until a worker picks the job up
    queued: TryGuard,
    /// Serializes rendering; only workers ever wait on it
    executing: Mutex<()>,
    in_flight: AtomicUsize,
    rendering: AtomicUsize,
    requested: AtomicUsize,
    dropped: AtomicUsize,
    completed: AtomicUsize,
    max_concurrent: AtomicUsize,
}

impl Shared {
    fn snapshot(&self) -> Option<ViewSnapshot> {
        match self.view.read() {
            Ok(view) => Some(view.clone()),
            Err(_) => {
                log::warn!("view snapshot poisoned, skipping redraw");
                None
            }
        }
    }

    fn run(&self, layers: &LayerManager, tx: &Sender<WorkerMessage>) {
        let _executing = match self.executing.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Requests arriving from now on queue a follow-up redraw
        self.queued.release();

        let Some(view) = self.snapshot() else {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            return;
        };
        let rendering = self.rendering.fetch_add(1, Ordering::AcqRel) + 1;
        self.max_concurrent.fetch_max(rendering, Ordering::AcqRel);
        let _ = tx.send(WorkerMessage::Started);

        let backbuffer = render_backbuffer(&view, layers);
        log::trace!(
            "redraw finished for zoom {} covering {:?}",
            backbuffer.zoom,
            backbuffer.coverage_px
        );

        // Counters settle before the handoff, so whoever receives the
        // buffer sees the renderer idle unless another redraw is queued
        self.rendering.fetch_sub(1, Ordering::AcqRel);
        self.completed.fetch_add(1, Ordering::AcqRel);
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        if tx.send(WorkerMessage::Finished(backbuffer)).is_err() {
            log::trace!("renderer dropped before redraw finished");
        }
    }
}

/// Schedules redraws on an executor and publishes their results
pub struct BackbufferRenderer {
    shared: Arc<Shared>,
    layers: Arc<LayerManager>,
    executor: Arc<dyn RedrawExecutor>,
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
    current: Option<Backbuffer>,
}

impl BackbufferRenderer {
    pub fn new(layers: Arc<LayerManager>, executor: Arc<dyn RedrawExecutor>, view: ViewSnapshot) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            shared: Arc::new(Shared {
                view: RwLock::new(view),
                queued: TryGuard::new(),
                executing: Mutex::new(()),
                in_flight: AtomicUsize::new(0),
                rendering: AtomicUsize::new(0),
                requested: AtomicUsize::new(0),
                dropped: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
                max_concurrent: AtomicUsize::new(0),
            }),
            layers,
            executor,
            tx,
            rx,
            current: None,
        }
    }

    pub fn executor_name(&self) -> &'static str {
        self.executor.name()
    }

    /// Replaces the view the next redraw renders
    pub fn update_view(&self, view: ViewSnapshot) {
        match self.shared.view.write() {
            Ok(mut slot) => *slot = view,
            Err(_) => log::warn!("view snapshot poisoned, keeping previous view"),
        }
    }

    /// Whether the published buffer fails to cover `required_px` at `zoom`
    pub fn needs_redraw(&self, required_px: &Bounds, zoom: i32) -> bool {
        !self
            .current
            .as_ref()
            .is_some_and(|buffer| buffer.covers(required_px, zoom))
    }

    /// Requests a redraw without waiting.
    ///
    /// Returns `false` when nothing was dispatched: the viewport is empty,
    /// a queued redraw that has not started yet will pick up the latest view
    /// anyway, or the executor refused the job.
    pub fn request_redraw(&self) -> bool {
        let empty = self
            .shared
            .snapshot()
            .map_or(true, |view| view.viewport_size.is_empty());
        if empty {
            return false;
        }

        self.shared.requested.fetch_add(1, Ordering::AcqRel);
        if !self.shared.queued.try_acquire() {
            self.shared.dropped.fetch_add(1, Ordering::AcqRel);
            log::trace!("redraw already queued, coalescing");
            return false;
        }

        self.shared.in_flight.fetch_add(1, Ordering::AcqRel);
        let shared = self.shared.clone();
        let layers = self.layers.clone();
        let tx = self.tx.clone();
        match self.executor.execute(Box::new(move || shared.run(&layers, &tx))) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("redraw dispatch failed: {}", err);
                self.shared.in_flight.fetch_sub(1, Ordering::AcqRel);
                self.shared.queued.release();
                false
            }
        }
    }

    /// Drains worker messages and publishes the newest finished buffer.
    /// Call on the interactive thread.
    pub fn poll(&mut self) -> Vec<RedrawUpdate> {
        let mut updates = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            self.handle(message, &mut updates);
        }
        updates
    }

    /// Blocks until a redraw has been published or `timeout` elapses.
    /// For embedders without an event loop, never call it from a UI thread.
    pub fn wait_for_publish(&mut self, timeout: Duration) -> Vec<RedrawUpdate> {
        let deadline = std::time::Instant::now() + timeout;
        let mut updates = Vec::new();
        while !updates
            .iter()
            .any(|u| matches!(u, RedrawUpdate::Published { .. }))
        {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(message) => self.handle(message, &mut updates),
                Err(_) => break,
            }
        }
        updates.extend(self.poll());
        updates
    }

    fn handle(&mut self, message: WorkerMessage, updates: &mut Vec<RedrawUpdate>) {
        match message {
            WorkerMessage::Started => updates.push(RedrawUpdate::Started),
            WorkerMessage::Finished(backbuffer) => {
                updates.push(RedrawUpdate::Published {
                    coverage_px: backbuffer.coverage_px,
                    zoom: backbuffer.zoom,
                });
                self.current = Some(backbuffer);
            }
        }
    }

    /// The published buffer
    pub fn current(&self) -> Option<&Backbuffer> {
        self.current.as_ref()
    }

    /// Drops the published buffer, e.g. after a resize
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Whether a redraw is queued or rendering
    pub fn is_busy(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire) > 0
    }

    pub fn stats(&self) -> RedrawStats {
        RedrawStats {
            requested: self.shared.requested.load(Ordering::Acquire),
            dropped: self.shared.dropped.load(Ordering::Acquire),
            completed: self.shared.completed.load(Ordering::Acquire),
            max_concurrent: self.shared.max_concurrent.load(Ordering::Acquire),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{geo::LatLng, projection::SphericalMercator};
    use crate::layers::{geometry::GeometryPoint, vector::GeometryLayer};
    use crate::rendering::surface::Pen;
    use crate::runtime::InlineExecutor;

    fn view(size: Size) -> ViewSnapshot {
        let projection: Arc<dyn Projection> = Arc::new(SphericalMercator::default());
        let focus_px = projection.to_pixel(&LatLng::new(0.0, 0.0), 3);
        ViewSnapshot {
            projection,
            focus_px,
            zoom: 3,
            viewport_size: size,
            background: Color::WHITE,
        }
    }

    #[test]
    fn test_empty_stack_renders_background() {
        let backbuffer = render_backbuffer(&view(Size::new(50, 40)), &LayerManager::new());
        assert_eq!(backbuffer.image.dimensions(), (100, 80));
        assert!(backbuffer.image.pixels().all(|p| *p == Color::WHITE.to_rgba()));
        assert_eq!(backbuffer.coverage_px.width(), 100.0);
    }

    #[test]
    fn test_layers_draw_in_map_pixels() {
        let layers = LayerManager::new();
        let points = Arc::new(GeometryLayer::new("points"));
        points
            .add_point(GeometryPoint::new(LatLng::new(0.0, 0.0)).with_pen(Pen::new(Color::RED, 4.0)))
            .unwrap();
        layers.add_layer(points, None).unwrap();

        let backbuffer = render_backbuffer(&view(Size::new(50, 50)), &layers);
        // The focus sits at the centre of the image
        assert_eq!(*backbuffer.image.get_pixel(50, 50), Color::RED.to_rgba());
        assert_eq!(*backbuffer.image.get_pixel(10, 10), Color::WHITE.to_rgba());
    }

    #[test]
    fn test_inline_redraw_publishes_on_poll() {
        let mut renderer = BackbufferRenderer::new(
            Arc::new(LayerManager::new()),
            Arc::new(InlineExecutor),
            view(Size::new(20, 20)),
        );
        let required = Bounds::from_center_and_size(view(Size::new(20, 20)).focus_px, 20.0, 20.0);
        assert!(renderer.needs_redraw(&required, 3));

        assert!(renderer.request_redraw());
        assert!(renderer.current().is_none());
        let updates = renderer.poll();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0], RedrawUpdate::Started);
        assert!(!renderer.needs_redraw(&required, 3));
        assert!(renderer.needs_redraw(&required, 4));
        assert!(!renderer.is_busy());
    }

    #[test]
    fn test_zero_viewport_is_a_no_op() {
        let renderer = BackbufferRenderer::new(
            Arc::new(LayerManager::new()),
            Arc::new(InlineExecutor),
            view(Size::new(0, 20)),
        );
        assert!(!renderer.request_redraw());
        assert_eq!(renderer.stats(), RedrawStats::default());
    }
}
