use crate::{
    core::{
        config::MapConfig,
        geo::{LatLng, LatLngBounds, Point, Size},
        projection::Projection,
        transform::CoordinateTransform,
        viewport::ViewportState,
    },
    input::{
        events::{signal_channel, EventHandled, InputEvent, MapEvent, MapSignal, MouseButton},
        handler::{Action, EventManager, InteractionController, MouseButtonMode},
    },
    layers::{base::LayerTrait, geometry::GeometryId, manager::LayerManager, vector::GeometryLayer},
    rendering::{
        backbuffer::{Backbuffer, BackbufferRenderer, RedrawStats, RedrawUpdate, ViewSnapshot},
        overlay,
        preview::ScaledPreview,
        raster::RasterSurface,
        surface::{Color, DrawingSurface},
    },
    runtime::RedrawExecutor,
    spatial::{
        hit_test::{HitTester, SelectionResult},
        selection::SelectionArea,
    },
    tiles::source::{ContentNotifier, ContentSource},
    MapError, Result,
};
use crossbeam_channel::Receiver;
use image::RgbaImage;
use std::{
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

/// The interactive map.
///
/// Owns the viewport state, the layer stack and the backbuffer renderer, and
/// must be driven from one interactive thread: call [`MapControl::update`]
/// regularly, forward input through [`MapControl::handle_input`] and paint
/// with [`MapControl::paint`]. Redraws run on the configured executor and
/// are published during `update`.
pub struct MapControl {
    config: MapConfig,
    viewport: ViewportState,
    layers: Arc<LayerManager>,
    renderer: BackbufferRenderer,
    content: Arc<dyn ContentSource>,
    signal_rx: Receiver<MapSignal>,
    event_manager: EventManager,
    interaction: InteractionController,
    preview: Option<ScaledPreview>,
    following: Option<(String, GeometryId)>,
}

impl MapControl {
    /// Creates a control from a configuration and its collaborators and
    /// schedules the first redraw
    pub fn new(
        config: MapConfig,
        content: Arc<dyn ContentSource>,
        executor: Arc<dyn RedrawExecutor>,
    ) -> Result<Self> {
        if config.tile_size == 0 {
            return Err(MapError::Render("tile size must be positive".to_string()));
        }
        if !config.initial_focus.is_valid() {
            return Err(MapError::InvalidCoordinates(format!(
                "initial focus {:?} is out of range",
                config.initial_focus
            )));
        }

        let projection: Arc<dyn Projection> = Arc::from(config.projection.build(config.tile_size));
        let mut viewport = ViewportState::new(
            projection,
            config.zoom_min,
            config.zoom_max,
            config.viewport_size,
        );
        viewport.set_pan_limit(config.pan_limit);
        let initial_zoom = viewport.clamp_zoom(config.initial_zoom.unwrap_or(config.zoom_min));
        while viewport.zoom() < initial_zoom && viewport.step_zoom_in() {}
        if !viewport.set_focus(config.initial_focus) {
            log::warn!("initial focus lies outside the pan limit, keeping {:?}", viewport.focus());
        }

        let (signals, signal_rx) = signal_channel();
        let layers = Arc::new(LayerManager::with_signals(signals.clone()));
        content.attach(ContentNotifier::new(signals));

        let view = snapshot(&viewport, config.background);
        let renderer = BackbufferRenderer::new(layers.clone(), executor, view);

        let mut interaction = InteractionController::new();
        interaction.mouse_enabled = config.mouse.enabled;
        interaction.left_button = config.mouse.left_button;
        interaction.right_button = config.mouse.right_button;
        interaction.left_origin_center = config.mouse.left_origin_center;
        interaction.right_origin_center = config.mouse.right_origin_center;
        interaction.selection_line_tolerance_px = config.mouse.selection_line_tolerance_px;
        interaction.click_tolerance_px = config.mouse.click_tolerance_px;
        interaction.keyboard_scroll_px = config.keyboard_scroll_px;

        log::debug!(
            "map control created at {:?} zoom {} using the {} executor",
            viewport.focus(),
            viewport.zoom(),
            renderer.executor_name()
        );

        let mut map = Self {
            config,
            viewport,
            layers,
            renderer,
            content,
            signal_rx,
            event_manager: EventManager::new(),
            interaction,
            preview: None,
            following: None,
        };
        map.refresh(true);
        Ok(map)
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    /// Coordinate conversions for the current view
    pub fn transform(&self) -> CoordinateTransform<'_> {
        self.viewport.transform()
    }

    pub fn focus(&self) -> LatLng {
        self.viewport.focus()
    }

    pub fn zoom(&self) -> i32 {
        self.viewport.zoom()
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport.viewport_size()
    }

    pub fn layers(&self) -> &Arc<LayerManager> {
        &self.layers
    }

    pub fn content_source(&self) -> &Arc<dyn ContentSource> {
        &self.content
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    pub fn interaction_mut(&mut self) -> &mut InteractionController {
        &mut self.interaction
    }

    /// Sets what dragging with `button` does, optionally centring its
    /// shapes on the press point
    pub fn set_mouse_mode(&mut self, button: MouseButton, mode: MouseButtonMode, origin_center: bool) {
        self.interaction.set_mode(button, mode, origin_center);
    }

    pub fn scaled_preview(&self) -> Option<&ScaledPreview> {
        self.preview.as_ref()
    }

    /// The published backbuffer
    pub fn backbuffer(&self) -> Option<&Backbuffer> {
        self.renderer.current()
    }

    pub fn stats(&self) -> RedrawStats {
        self.renderer.stats()
    }

    pub fn is_redrawing(&self) -> bool {
        self.renderer.is_busy()
    }

    // ---- layers ----

    /// Adds a layer at `index` (appending when absent or out of range). A
    /// layer with the same name is replaced in place.
    pub fn add_layer(&mut self, layer: Arc<dyn LayerTrait>, index: Option<usize>) -> Result<()> {
        let name = layer.name().to_string();
        self.layers.add_layer(layer, index)?;
        self.event_manager.emit(MapEvent::LayerAdded { name });
        self.refresh(true);
        Ok(())
    }

    /// Removes a layer by name, `false` if there was none
    pub fn remove_layer(&mut self, name: &str) -> Result<bool> {
        if self.layers.remove_layer(name)?.is_none() {
            return Ok(false);
        }
        if self.following.as_ref().is_some_and(|(layer, _)| layer == name) {
            self.following = None;
        }
        self.event_manager.emit(MapEvent::LayerRemoved {
            name: name.to_string(),
        });
        self.refresh(true);
        Ok(true)
    }

    pub fn layer(&self, name: &str) -> Option<Arc<dyn LayerTrait>> {
        self.layers.layer(name)
    }

    // ---- zoom ----

    /// One zoom level in; `false` at the upper bound
    pub fn zoom_in(&mut self) -> bool {
        if !self.viewport.can_zoom_in() {
            return false;
        }
        self.content.abort_loading();
        self.prepare_preview(2.0, self.viewport.zoom() + 1);
        self.viewport.step_zoom_in();
        self.zoom_changed();
        true
    }

    /// One zoom level out; `false` at the lower bound
    pub fn zoom_out(&mut self) -> bool {
        if !self.viewport.can_zoom_out() {
            return false;
        }
        self.content.abort_loading();
        self.prepare_preview(0.5, self.viewport.zoom() - 1);
        self.viewport.step_zoom_out();
        self.zoom_changed();
        true
    }

    /// Clamps `zoom` into the bounds and steps there one level at a time
    pub fn set_zoom(&mut self, zoom: i32) {
        let target = self.viewport.clamp_zoom(zoom);
        while self.viewport.zoom() < target && self.zoom_in() {}
        while self.viewport.zoom() > target && self.zoom_out() {}
    }

    /// Sets new zoom bounds, swapping them when given in the wrong order,
    /// and steps the current zoom back inside
    pub fn set_zoom_limits(&mut self, zoom_min: i32, zoom_max: i32) {
        let steps = self.viewport.set_zoom_limits(zoom_min, zoom_max);
        for _ in 0..steps.unsigned_abs() {
            if steps > 0 {
                self.zoom_in();
            } else {
                self.zoom_out();
            }
        }
    }

    fn zoom_changed(&mut self) {
        let zoom = self.viewport.zoom();
        log::debug!("zoom changed to {}", zoom);
        self.event_manager.emit(MapEvent::ZoomChanged { zoom });
        self.view_changed();
        self.refresh(true);
    }

    /// Stores a scaled copy of the displayed frame for the zoom level the
    /// view is about to switch to
    fn prepare_preview(&mut self, factor: f64, zoom: i32) {
        if !self.config.scaled_background || self.viewport.viewport_size().is_empty() {
            return;
        }
        let transform = self.viewport.transform();
        let frame = self.compose_map();
        self.preview = ScaledPreview::from_frame(&frame, &transform.viewport_origin_px(), factor, zoom);
    }

    // ---- focus ----

    /// Moves the focus; rejected when outside the pan limit
    pub fn set_focus(&mut self, coord: LatLng) -> bool {
        if !self.viewport.set_focus(coord) {
            return false;
        }
        self.view_changed();
        self.refresh(false);
        true
    }

    /// Focuses the mean of `points`. With `auto_zoom` the zoom climbs to the
    /// closest level still showing every point.
    pub fn set_focus_points(&mut self, points: &[LatLng], auto_zoom: bool) -> bool {
        let Some(mean) = LatLng::mean(points) else {
            return false;
        };
        if !self.set_focus(mean) {
            return false;
        }
        if auto_zoom {
            while !self.viewport.contains_all(points) && self.zoom_out() {}
            while self.viewport.contains_all(points) && self.viewport.can_zoom_in() {
                self.zoom_in();
            }
            if !self.viewport.contains_all(points) {
                self.zoom_out();
            }
        }
        true
    }

    /// Moves the view by a map-pixel delta, respecting the pan limit
    pub fn scroll(&mut self, delta_px: &Point) -> bool {
        if !self.viewport.scroll(delta_px) {
            return false;
        }
        self.layers.move_widget_geometries(delta_px, self.viewport.zoom());
        self.view_changed();
        self.refresh(false);
        true
    }

    pub fn scroll_left(&mut self, pixels: f64) -> bool {
        self.scroll(&Point::new(-pixels, 0.0))
    }

    pub fn scroll_right(&mut self, pixels: f64) -> bool {
        self.scroll(&Point::new(pixels, 0.0))
    }

    pub fn scroll_up(&mut self, pixels: f64) -> bool {
        self.scroll(&Point::new(0.0, -pixels))
    }

    pub fn scroll_down(&mut self, pixels: f64) -> bool {
        self.scroll(&Point::new(0.0, pixels))
    }

    /// Moves the focus to `target` in `steps` equal increments, one every
    /// `interval`, applied by [`MapControl::update`]. Zero steps jump
    /// straight to the target.
    pub fn animate_focus_to(&mut self, target: LatLng, steps: u32, interval: Duration) -> Result<()> {
        if self.viewport.is_animating() {
            return Err(MapError::AlreadyAnimating);
        }
        if steps == 0 {
            self.set_focus(target);
            return Ok(());
        }
        self.viewport
            .begin_animation(target, steps, interval, Instant::now())
    }

    pub fn is_animating(&self) -> bool {
        self.viewport.is_animating()
    }

    fn view_changed(&mut self) {
        self.event_manager.emit(MapEvent::ViewChanged {
            focus: self.viewport.focus(),
            zoom: self.viewport.zoom(),
        });
    }

    // ---- view settings ----

    /// Resizes the viewport, dropping buffers drawn for the old size
    pub fn set_viewport_size(&mut self, size: Size) {
        if size == self.viewport.viewport_size() {
            return;
        }
        self.viewport.set_viewport_size(size);
        self.renderer.clear();
        self.preview = None;
        self.refresh(true);
    }

    pub fn set_pan_limit(&mut self, limit: Option<LatLngBounds>) {
        self.viewport.set_pan_limit(limit);
    }

    pub fn set_background_colour(&mut self, colour: Color) {
        self.config.background = colour;
        self.refresh(true);
    }

    /// Keeps the view centred on a point geometry as it moves
    pub fn follow_geometry(&mut self, layer: &str, id: GeometryId) -> Result<()> {
        let coordinate = self
            .with_geometry_layer(layer, |geometries| {
                geometries
                    .geometry(id)
                    .and_then(|geometry| geometry.as_point().map(|point| point.coordinate()))
            })?
            .ok_or_else(|| MapError::Layer(format!("no point {:?} in layer '{}'", id, layer)))?;
        self.following = Some((layer.to_string(), id));
        self.set_focus(coordinate);
        Ok(())
    }

    pub fn stop_following(&mut self) {
        self.following = None;
    }

    // ---- queries ----

    /// Geographic rectangle of the visible area
    pub fn viewport_rect(&self) -> LatLngBounds {
        self.viewport.transform().viewport_rect()
    }

    pub fn viewport_contains_all(&self, points: &[LatLng]) -> bool {
        self.viewport.contains_all(points)
    }

    /// Whether a geometry is on screen. `partial` accepts any overlap,
    /// otherwise its whole bounding box must be visible.
    pub fn is_geometry_visible(&self, layer: &str, id: GeometryId, partial: bool) -> bool {
        let transform = self.viewport.transform();
        let bounds = self.with_geometry_layer(layer, |geometries| {
            geometries.geometry_bounds(id, transform.zoom(), transform.projection())
        });
        let Ok(Some(bounds)) = bounds else {
            return false;
        };
        let visible = transform.viewport_rect();
        if partial {
            visible.intersects(&bounds)
        } else {
            visible.contains_bounds(&bounds)
        }
    }

    /// Hit-tests an area given in viewport pixels against the visible layers
    pub fn select(&self, area: &SelectionArea) -> SelectionResult {
        HitTester::new(self.viewport.transform()).test(&self.layers.layers(), area)
    }

    fn with_geometry_layer<R>(&self, name: &str, f: impl FnOnce(&GeometryLayer) -> R) -> Result<R> {
        let layer = self
            .layers
            .layer(name)
            .ok_or_else(|| MapError::Layer(format!("no layer named '{}'", name)))?;
        let geometries = layer
            .as_any()
            .downcast_ref::<GeometryLayer>()
            .ok_or_else(|| MapError::Layer(format!("layer '{}' holds no geometries", name)))?;
        Ok(f(geometries))
    }

    // ---- events ----

    /// Register an event listener for a [`MapEvent::kind`]
    pub fn on<F>(&mut self, event_type: &str, callback: F)
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        self.event_manager.on(event_type, callback);
    }

    /// Dispatches queued events to their listeners and returns them
    pub fn process_events(&mut self) -> Vec<MapEvent> {
        self.event_manager.process_events()
    }

    /// Advances animations, reacts to collaborator signals and publishes
    /// finished redraws. Returns `true` when the display needs a repaint.
    pub fn update(&mut self, now: Instant) -> bool {
        let mut repaint = self.drain_signals();

        while let Some(step) = self.viewport.next_animation_step(now) {
            repaint |= self.scroll(&step);
        }

        let updates = self.renderer.poll();
        repaint |= self.apply_redraw_updates(updates);
        repaint
    }

    /// Blocks until a redraw is published or `timeout` elapses, then
    /// publishes it like [`MapControl::update`]. For embedders without an
    /// event loop.
    pub fn wait_for_redraw(&mut self, timeout: Duration) -> bool {
        self.drain_signals();
        let updates = self.renderer.wait_for_publish(timeout);
        let published = updates
            .iter()
            .any(|u| matches!(u, RedrawUpdate::Published { .. }));
        self.apply_redraw_updates(updates);
        published
    }

    /// Time the next animation step is due, for embedders scheduling wakeups
    pub fn next_animation_deadline(&self) -> Option<Instant> {
        self.viewport.next_animation_deadline()
    }

    fn drain_signals(&mut self) -> bool {
        let signals: Vec<MapSignal> = self.signal_rx.try_iter().collect();
        let repaint = !signals.is_empty();
        for signal in signals {
            self.handle_signal(signal);
        }
        repaint
    }

    fn handle_signal(&mut self, signal: MapSignal) {
        log::trace!("signal {:?}", signal);
        match signal {
            MapSignal::RedrawRequested | MapSignal::ContentUpdated => self.refresh(true),
            MapSignal::LoadingFinished => {
                self.preview = None;
            }
            MapSignal::GeometryClicked { layer, geometry } => {
                self.event_manager
                    .emit(MapEvent::GeometryClicked { layer, geometry });
            }
            MapSignal::GeometryMoved {
                layer,
                geometry,
                coordinate,
            } => {
                let followed = self
                    .following
                    .as_ref()
                    .is_some_and(|(l, g)| *l == layer && *g == geometry);
                if followed {
                    let transform = self.viewport.transform();
                    let delta = transform.to_pixel(&coordinate).subtract(&transform.focus_px());
                    self.scroll(&delta);
                }
            }
        }
    }

    fn apply_redraw_updates(&mut self, updates: Vec<RedrawUpdate>) -> bool {
        let mut repaint = false;
        for update in updates {
            match update {
                RedrawUpdate::Started => self.event_manager.emit(MapEvent::RedrawStarted),
                RedrawUpdate::Published { coverage_px, zoom } => {
                    repaint = true;
                    if zoom == self.viewport.zoom() && !self.content.is_loading() {
                        self.preview = None;
                    }
                    self.event_manager
                        .emit(MapEvent::BackbufferUpdated { coverage_px, zoom });
                    self.event_manager.emit(MapEvent::RedrawFinished);
                }
            }
        }
        if repaint {
            // The view may have moved on while the redraw was rendering
            self.refresh(false);
        }
        repaint
    }

    /// Hands the latest view to the renderer and redraws when forced or when
    /// the published buffer no longer covers the viewport
    fn refresh(&mut self, force: bool) {
        self.renderer
            .update_view(snapshot(&self.viewport, self.config.background));
        let transform = self.viewport.transform();
        if force || self.renderer.needs_redraw(&transform.required_viewport_rect_px(), transform.zoom()) {
            self.renderer.request_redraw();
        }
    }

    // ---- input ----

    /// Applies one input event. Wheel input at a zoom bound and pointer
    /// input while the mouse is disabled are not handled.
    pub fn handle_input(&mut self, event: InputEvent) -> EventHandled {
        let actions = self.interaction.handle_event(
            &event,
            self.viewport.can_zoom_in(),
            self.viewport.can_zoom_out(),
        );
        if actions.is_empty() {
            return EventHandled::NotHandled;
        }
        for action in actions {
            self.execute_action(action);
        }
        self.drain_signals();
        EventHandled::Handled
    }

    fn execute_action(&mut self, action: Action) {
        match action {
            Action::Scroll { delta } => {
                self.scroll(&delta);
            }
            Action::ZoomIn => {
                self.zoom_in();
            }
            Action::ZoomOut => {
                self.zoom_out();
            }
            Action::WheelZoom { zoom_in, position } => {
                let anchor = self.viewport.transform().viewport_to_coordinate(&position);
                let zoomed = if zoom_in { self.zoom_in() } else { self.zoom_out() };
                if zoomed {
                    let moved = self.viewport.transform().coordinate_to_viewport(&anchor);
                    self.scroll(&moved.subtract(&position));
                }
            }
            Action::FitArea { corners: (a, b) } => {
                let transform = self.viewport.transform();
                let corners = [
                    transform.viewport_to_coordinate(&a),
                    transform.viewport_to_coordinate(&b),
                ];
                self.set_focus_points(&corners, true);
            }
            Action::Select { area } => {
                let result = self.select(&area);
                log::debug!("selection matched {} geometries", result.total());
                self.event_manager.emit(MapEvent::GeometriesSelected(result));
            }
            Action::Click { area } => {
                let transform = self.viewport.transform();
                let area_px = area.translated(&transform.viewport_origin_px());
                for layer in self.layers.visible_layers(transform.zoom()) {
                    layer.pointer_pressed(&area_px, transform.zoom(), transform.projection());
                }
            }
            Action::Dragged { from, to } => {
                let transform = self.viewport.transform();
                let event = MapEvent::MouseDragged {
                    from: transform.viewport_to_coordinate(&from),
                    to: transform.viewport_to_coordinate(&to),
                };
                self.event_manager.emit(event);
            }
            Action::PointerPressed { button, position } => {
                let coordinate = self.viewport.transform().viewport_to_coordinate(&position);
                self.event_manager
                    .emit(MapEvent::PointerPressed { button, coordinate });
            }
            Action::PointerMoved { position } => {
                let coordinate = self.viewport.transform().viewport_to_coordinate(&position);
                self.event_manager.emit(MapEvent::PointerMoved { coordinate });
            }
            Action::PointerReleased { button, position } => {
                let coordinate = self.viewport.transform().viewport_to_coordinate(&position);
                self.event_manager
                    .emit(MapEvent::PointerReleased { button, coordinate });
            }
            Action::Resize { size } => self.set_viewport_size(size),
        }
    }

    // ---- painting ----

    /// Paints the map and its overlays in viewport pixels
    pub fn paint(&self, surface: &mut dyn DrawingSurface) {
        self.paint_map(surface);
        self.paint_overlays(surface);
    }

    /// Scaled preview underneath, then the published backbuffer when it
    /// belongs to the current zoom
    fn paint_map(&self, surface: &mut dyn DrawingSurface) {
        let transform = self.viewport.transform();
        if let Some(preview) = &self.preview {
            if let Some(origin) = preview.viewport_origin(&transform) {
                surface.draw_image(&origin, preview.image());
            }
        }
        if let Some(buffer) = self.renderer.current() {
            if buffer.zoom == transform.zoom() {
                surface.draw_image(&buffer.viewport_origin(&transform), &buffer.image);
            }
        }
    }

    fn paint_overlays(&self, surface: &mut dyn DrawingSurface) {
        let size = self.viewport.viewport_size();
        let overlays = &self.config.overlays;
        if let Some((area, pressed)) = self.interaction.drag_shape() {
            overlay::draw_drag_shape(surface, &area, pressed.as_ref(), overlays.overlay_colour);
        }
        if overlays.viewport_border {
            overlay::draw_viewport_border(surface, size, overlays.overlay_colour);
        }
        if overlays.crosshairs {
            overlay::draw_crosshairs(surface, size, overlays.overlay_colour);
        }
        if overlays.scalebar {
            overlay::draw_scalebar(surface, size, self.viewport.zoom(), overlays.overlay_colour);
        }
    }

    fn compose_map(&self) -> RgbaImage {
        let size = self.viewport.viewport_size();
        let mut frame = RgbaImage::new(size.width, size.height);
        self.paint_map(&mut RasterSurface::new(&mut frame));
        frame
    }

    /// The composed viewport-sized frame, overlays included
    pub fn render_frame(&self) -> Result<RgbaImage> {
        let size = self.viewport.viewport_size();
        if size.is_empty() {
            return Err(MapError::Render("viewport is empty".to_string()));
        }
        let mut frame = RgbaImage::from_pixel(size.width, size.height, self.config.background.to_rgba());
        self.paint(&mut RasterSurface::new(&mut frame));
        Ok(frame)
    }

    /// Writes the composed frame to an image file, format taken from the
    /// extension
    pub fn save_frame(&self, path: impl AsRef<Path>) -> Result<()> {
        let frame = self.render_frame()?;
        frame.save(path.as_ref())?;
        log::debug!("saved frame to {}", path.as_ref().display());
        Ok(())
    }
}

fn snapshot(viewport: &ViewportState, background: Color) -> ViewSnapshot {
    ViewSnapshot {
        projection: viewport.projection().clone(),
        focus_px: viewport.transform().focus_px(),
        zoom: viewport.zoom(),
        viewport_size: viewport.viewport_size(),
        background,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        input::events::{KeyCode, KeyModifiers},
        layers::geometry::GeometryPoint,
        runtime::InlineExecutor,
        tiles::source::MemoryTileSource,
    };
    use std::sync::Mutex;

    fn map_with(config: MapConfig) -> MapControl {
        MapControl::new(config, Arc::new(MemoryTileSource::new()), Arc::new(InlineExecutor)).unwrap()
    }

    fn map() -> MapControl {
        map_with(MapConfig {
            initial_zoom: Some(5),
            viewport_size: Size::new(200, 200),
            ..MapConfig::default()
        })
    }

    #[test]
    fn test_new_rejects_invalid_focus() {
        let config = MapConfig {
            initial_focus: LatLng::new(120.0, 0.0),
            ..MapConfig::default()
        };
        let result = MapControl::new(config, Arc::new(MemoryTileSource::new()), Arc::new(InlineExecutor));
        assert!(matches!(result, Err(MapError::InvalidCoordinates(_))));
    }

    #[test]
    fn test_initial_redraw_is_published_on_update() {
        let mut map = map();
        assert!(map.update(Instant::now()));
        let events = map.process_events();
        assert!(events.iter().any(|e| matches!(e, MapEvent::BackbufferUpdated { zoom: 5, .. })));
    }

    #[test]
    fn test_zoom_steps_abort_loading_and_keep_bounds() {
        let source = Arc::new(MemoryTileSource::new());
        let mut map = MapControl::new(
            MapConfig {
                zoom_max: 6,
                initial_zoom: Some(5),
                viewport_size: Size::new(100, 100),
                ..MapConfig::default()
            },
            source.clone(),
            Arc::new(InlineExecutor),
        )
        .unwrap();

        assert!(map.zoom_in());
        assert!(!map.zoom_in());
        assert_eq!(map.zoom(), 6);
        assert_eq!(source.abort_count(), 1);

        map.set_zoom(-4);
        assert_eq!(map.zoom(), 0);
        assert_eq!(source.abort_count(), 7);
    }

    #[test]
    fn test_zoom_produces_preview_for_new_level() {
        let mut map = map();
        map.update(Instant::now());
        map.zoom_in();
        let preview = map.scaled_preview().unwrap();
        assert_eq!(preview.zoom(), 6);
        assert_eq!(preview.image().width(), 400);
    }

    #[test]
    fn test_preview_cleared_once_redraw_lands() {
        let mut map = map();
        map.update(Instant::now());
        map.zoom_out();
        assert!(map.scaled_preview().is_some());
        map.update(Instant::now());
        assert!(map.scaled_preview().is_none());
    }

    #[test]
    fn test_pan_limit_rejects_scroll() {
        let mut map = map();
        map.set_pan_limit(Some(LatLngBounds::from_coords(-1.0, -1.0, 1.0, 1.0)));
        assert!(!map.scroll_right(100_000.0));
        assert_eq!(map.focus(), LatLng::new(0.0, 0.0));
    }

    #[test]
    fn test_zoom_limits_pull_zoom_inside() {
        let mut map = map();
        map.set_zoom_limits(9, 7);
        assert_eq!(map.zoom(), 7);
        assert_eq!((map.viewport().zoom_min(), map.viewport().zoom_max()), (7, 9));
    }

    #[test]
    fn test_keyboard_scroll_and_zoom() {
        let mut map = map();
        let before = map.transform().focus_px();
        let handled = map.handle_input(InputEvent::KeyPress {
            key: KeyCode::ArrowDown,
            modifiers: KeyModifiers::default(),
        });
        assert_eq!(handled, EventHandled::Handled);
        let after = map.transform().focus_px();
        assert!((after.y - before.y - 10.0).abs() < 1e-6);

        map.handle_input(InputEvent::KeyPress {
            key: KeyCode::Plus,
            modifiers: KeyModifiers::default(),
        });
        assert_eq!(map.zoom(), 6);
    }

    #[test]
    fn test_wheel_zoom_keeps_anchor_under_pointer() {
        let mut map = map();
        let position = Point::new(150.0, 60.0);
        let anchor = map.transform().viewport_to_coordinate(&position);
        let handled = map.handle_input(InputEvent::Wheel { delta: 1.0, position });
        assert_eq!(handled, EventHandled::Handled);
        assert_eq!(map.zoom(), 6);
        let moved = map.transform().coordinate_to_viewport(&anchor);
        assert!(moved.distance_to(&position) < 1e-6);
    }

    #[test]
    fn test_wheel_at_bound_is_not_handled() {
        let mut map = map_with(MapConfig {
            zoom_max: 3,
            initial_zoom: Some(3),
            ..MapConfig::default()
        });
        let handled = map.handle_input(InputEvent::Wheel {
            delta: 1.0,
            position: Point::new(1.0, 1.0),
        });
        assert_eq!(handled, EventHandled::NotHandled);
    }

    #[test]
    fn test_click_reaches_layer_and_emits_event() {
        let mut map = map();
        let layer = Arc::new(GeometryLayer::new("points"));
        let id = layer.add_point(GeometryPoint::new(LatLng::new(0.0, 0.0))).unwrap();
        map.add_layer(layer, None).unwrap();
        map.process_events();

        let clicked = Arc::new(Mutex::new(Vec::new()));
        let sink = clicked.clone();
        map.on("geometryclicked", move |event| {
            if let MapEvent::GeometryClicked { geometry, .. } = event {
                sink.lock().unwrap().push(*geometry);
            }
        });

        map.handle_input(InputEvent::PointerPressed {
            position: Point::new(100.0, 100.0),
            button: MouseButton::Left,
        });
        map.process_events();
        assert_eq!(*clicked.lock().unwrap(), vec![id]);
    }

    #[test]
    fn test_follow_geometry_tracks_moves() {
        let mut map = map();
        let layer = Arc::new(GeometryLayer::new("vehicles"));
        let id = layer.add_point(GeometryPoint::new(LatLng::new(1.0, 1.0))).unwrap();
        map.add_layer(layer.clone(), None).unwrap();

        map.follow_geometry("vehicles", id).unwrap();
        assert!(map.focus().approx_eq(&LatLng::new(1.0, 1.0), 1e-9));

        layer.set_point_coordinate(id, LatLng::new(2.0, 3.0)).unwrap();
        map.update(Instant::now());
        assert!(map.focus().approx_eq(&LatLng::new(2.0, 3.0), 1e-6));

        map.stop_following();
        layer.set_point_coordinate(id, LatLng::new(4.0, 4.0)).unwrap();
        map.update(Instant::now());
        assert!(map.focus().approx_eq(&LatLng::new(2.0, 3.0), 1e-6));

        assert!(matches!(map.follow_geometry("missing", id), Err(MapError::Layer(_))));
    }

    #[test]
    fn test_geometry_visibility() {
        let mut map = map();
        let layer = Arc::new(GeometryLayer::new("points"));
        let near = layer.add_point(GeometryPoint::new(LatLng::new(0.5, 0.5))).unwrap();
        let far = layer.add_point(GeometryPoint::new(LatLng::new(60.0, 100.0))).unwrap();
        map.add_layer(layer, None).unwrap();

        assert!(map.is_geometry_visible("points", near, false));
        assert!(!map.is_geometry_visible("points", far, true));
        assert!(!map.is_geometry_visible("nope", near, true));
    }

    #[test]
    fn test_render_frame_draws_backbuffer_and_crosshairs() {
        let mut map = map_with(MapConfig {
            initial_zoom: Some(3),
            viewport_size: Size::new(64, 48),
            background: Color::WHITE,
            ..MapConfig::default()
        });
        map.update(Instant::now());
        let frame = map.render_frame().unwrap();
        assert_eq!(frame.dimensions(), (64, 48));
        assert_eq!(frame.get_pixel(2, 2).0, [255, 255, 255, 255]);
        assert_eq!(frame.get_pixel(32, 24 - 5).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_render_frame_of_empty_viewport_fails() {
        let map = map_with(MapConfig {
            viewport_size: Size::new(0, 0),
            ..MapConfig::default()
        });
        assert!(matches!(map.render_frame(), Err(MapError::Render(_))));
        assert_eq!(map.stats().requested, 0);
    }

    #[test]
    fn test_add_and_remove_layer_events() {
        let mut map = map();
        map.add_layer(Arc::new(GeometryLayer::new("a")), None).unwrap();
        assert!(map.remove_layer("a").unwrap());
        assert!(!map.remove_layer("a").unwrap());
        let kinds: Vec<_> = map.process_events().iter().map(|e| e.kind()).collect();
        assert!(kinds.contains(&"layeradded"));
        assert!(kinds.contains(&"layerremoved"));
    }
}
