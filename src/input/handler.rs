use crate::{
    core::{
        constants::{CLICK_TOLERANCE_PX, DEFAULT_SCROLL_STEP_PX, SELECTION_LINE_TOLERANCE_PX},
        geo::{Point, Size},
    },
    input::events::{InputEvent, KeyCode, MapEvent, MouseButton},
    prelude::HashMap,
    spatial::selection::{SelectionArea, SelectionShape},
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// What dragging with a mouse button does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MouseButtonMode {
    None,
    /// Scroll the map along with the pointer
    #[default]
    Pan,
    DrawBox,
    DrawLine,
    DrawEllipse,
    /// Fit the dragged shape's corners into the view
    PanBox,
    PanLine,
    PanEllipse,
    /// Hit-test the dragged shape against the layers
    SelectBox,
    SelectLine,
    SelectEllipse,
}

/// Behaviour family of a [`MouseButtonMode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    None,
    Pan,
    Draw,
    PanShape,
    Select,
}

impl MouseButtonMode {
    pub fn kind(&self) -> DragKind {
        match self {
            Self::None => DragKind::None,
            Self::Pan => DragKind::Pan,
            Self::DrawBox | Self::DrawLine | Self::DrawEllipse => DragKind::Draw,
            Self::PanBox | Self::PanLine | Self::PanEllipse => DragKind::PanShape,
            Self::SelectBox | Self::SelectLine | Self::SelectEllipse => DragKind::Select,
        }
    }

    /// Shape drawn while dragging, `None` for plain panning
    pub fn shape(&self) -> Option<SelectionShape> {
        match self {
            Self::DrawBox | Self::PanBox | Self::SelectBox => Some(SelectionShape::Box),
            Self::DrawLine | Self::PanLine | Self::SelectLine => Some(SelectionShape::Line),
            Self::DrawEllipse | Self::PanEllipse | Self::SelectEllipse => Some(SelectionShape::Ellipse),
            Self::None | Self::Pan => None,
        }
    }
}

/// State changes requested by input, in viewport pixels unless noted.
/// The map control executes them in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Move the view by a map-pixel delta
    Scroll { delta: Point },
    ZoomIn,
    ZoomOut,
    /// Zoom one level keeping the point under `position` in place
    WheelZoom { zoom_in: bool, position: Point },
    /// Focus the two corners with auto zoom
    FitArea { corners: (Point, Point) },
    /// Hit-test a finished selection
    Select { area: SelectionArea },
    /// Click detection around a press
    Click { area: SelectionArea },
    /// A drag ended; corners of the dragged shape
    Dragged { from: Point, to: Point },
    PointerPressed { button: MouseButton, position: Point },
    PointerMoved { position: Point },
    PointerReleased { button: MouseButton, position: Point },
    Resize { size: Size },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragState {
    button: MouseButton,
    mode: MouseButtonMode,
    origin_center: bool,
    pressed: Point,
    current: Point,
}

impl DragState {
    fn moved(&self) -> bool {
        self.pressed != self.current
    }
}

/// Turns raw input into [`Action`]s.
///
/// The controller only tracks the gesture in progress; it never touches
/// map state, so the same input always yields the same actions.
#[derive(Debug, Clone)]
pub struct InteractionController {
    /// Pointer input is ignored when disabled; keys and resizes still apply
    pub mouse_enabled: bool,
    pub left_button: MouseButtonMode,
    pub right_button: MouseButtonMode,
    /// Left button drag shapes are centred on the press point
    pub left_origin_center: bool,
    /// Right button drag shapes are centred on the press point
    pub right_origin_center: bool,
    pub selection_line_tolerance_px: f64,
    pub click_tolerance_px: f64,
    pub keyboard_scroll_px: f64,
    drag: Option<DragState>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self {
            mouse_enabled: true,
            left_button: MouseButtonMode::Pan,
            right_button: MouseButtonMode::DrawBox,
            left_origin_center: false,
            right_origin_center: false,
            selection_line_tolerance_px: SELECTION_LINE_TOLERANCE_PX,
            click_tolerance_px: CLICK_TOLERANCE_PX,
            keyboard_scroll_px: DEFAULT_SCROLL_STEP_PX,
            drag: None,
        }
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode_for(&self, button: MouseButton) -> MouseButtonMode {
        match button {
            MouseButton::Left => self.left_button,
            MouseButton::Right => self.right_button,
            MouseButton::Middle | MouseButton::Other(_) => MouseButtonMode::None,
        }
    }

    /// Whether drags with `button` are centred on the press point
    pub fn origin_center_for(&self, button: MouseButton) -> bool {
        match button {
            MouseButton::Left => self.left_origin_center,
            MouseButton::Right => self.right_origin_center,
            MouseButton::Middle | MouseButton::Other(_) => false,
        }
    }

    /// Sets the drag mode of a button and whether its shapes are centred on
    /// the press point
    pub fn set_mode(&mut self, button: MouseButton, mode: MouseButtonMode, origin_center: bool) {
        match button {
            MouseButton::Left => {
                self.left_button = mode;
                self.left_origin_center = origin_center;
            }
            MouseButton::Right => {
                self.right_button = mode;
                self.right_origin_center = origin_center;
            }
            MouseButton::Middle | MouseButton::Other(_) => {
                log::debug!("no mode slot for {:?}", button);
            }
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// The shape of the drag in progress and, for origin centred drags, the
    /// press point
    pub fn drag_shape(&self) -> Option<(SelectionArea, Option<Point>)> {
        let drag = self.drag.as_ref()?;
        let shape = drag.mode.shape()?;
        let area = SelectionArea::from_drag(
            shape,
            &drag.pressed,
            &drag.current,
            drag.origin_center,
            self.selection_line_tolerance_px,
        );
        Some((area, drag.origin_center.then_some(drag.pressed)))
    }

    /// Abandons the gesture in progress
    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    /// Translates one input event. An empty result means the event was not
    /// handled; wheel input at a zoom bound is not handled.
    pub fn handle_event(&mut self, event: &InputEvent, can_zoom_in: bool, can_zoom_out: bool) -> Vec<Action> {
        if event.is_pointer_event() && !self.mouse_enabled {
            return Vec::new();
        }

        match event {
            InputEvent::PointerPressed { position, button } => self.pressed(*button, *position),
            InputEvent::PointerMoved { position } => self.moved(*position),
            InputEvent::PointerReleased { position, button } => self.released(*button, *position),
            InputEvent::Wheel { delta, position } => {
                let zoom_in = *delta > 0.0;
                let allowed = if zoom_in { can_zoom_in } else { can_zoom_out };
                if *delta == 0.0 || !allowed {
                    return Vec::new();
                }
                vec![Action::WheelZoom {
                    zoom_in,
                    position: *position,
                }]
            }
            InputEvent::KeyPress { key, .. } => self.key(*key),
            InputEvent::Resize { size } => vec![Action::Resize { size: *size }],
        }
    }

    fn pressed(&mut self, button: MouseButton, position: Point) -> Vec<Action> {
        let mode = self.mode_for(button);
        if self.drag.is_none() && mode != MouseButtonMode::None {
            self.drag = Some(DragState {
                button,
                mode,
                origin_center: self.origin_center_for(button),
                pressed: position,
                current: position,
            });
        }
        vec![
            Action::PointerPressed { button, position },
            Action::Click {
                area: SelectionArea::around(&position, self.click_tolerance_px),
            },
        ]
    }

    fn moved(&mut self, position: Point) -> Vec<Action> {
        let mut actions = vec![Action::PointerMoved { position }];
        if let Some(drag) = self.drag.as_mut() {
            if drag.mode == MouseButtonMode::Pan {
                let delta = drag.current.subtract(&position);
                if !delta.is_zero() {
                    actions.push(Action::Scroll { delta });
                }
            }
            drag.current = position;
        }
        actions
    }

    fn released(&mut self, button: MouseButton, position: Point) -> Vec<Action> {
        let mut actions = Vec::new();
        match self.drag.take() {
            Some(mut drag) if drag.button == button => {
                if drag.mode == MouseButtonMode::Pan {
                    let delta = drag.current.subtract(&position);
                    if !delta.is_zero() {
                        actions.push(Action::Scroll { delta });
                    }
                }
                drag.current = position;
                actions.push(Action::PointerReleased { button, position });
                if drag.moved() {
                    actions.extend(self.finish_drag(&drag));
                }
            }
            other => {
                self.drag = other;
                actions.push(Action::PointerReleased { button, position });
            }
        }
        actions
    }

    /// Pan-shape and select drags report the plain press to release
    /// corners in `Dragged`; other modes report nothing.
    fn finish_drag(&self, drag: &DragState) -> Vec<Action> {
        let action = match (drag.mode.kind(), drag.mode.shape()) {
            (DragKind::PanShape, Some(_)) => Action::FitArea {
                corners: SelectionArea::drag_corners(&drag.pressed, &drag.current, drag.origin_center),
            },
            (DragKind::Select, Some(shape)) => Action::Select {
                area: SelectionArea::from_drag(
                    shape,
                    &drag.pressed,
                    &drag.current,
                    drag.origin_center,
                    self.selection_line_tolerance_px,
                ),
            },
            _ => return Vec::new(),
        };
        // Dragged goes first so its points convert against the view the
        // drag was made in
        vec![
            Action::Dragged {
                from: drag.pressed,
                to: drag.current,
            },
            action,
        ]
    }

    fn key(&self, key: KeyCode) -> Vec<Action> {
        let step = self.keyboard_scroll_px;
        let action = match key {
            KeyCode::ArrowUp => Action::Scroll {
                delta: Point::new(0.0, -step),
            },
            KeyCode::ArrowDown => Action::Scroll {
                delta: Point::new(0.0, step),
            },
            KeyCode::ArrowLeft => Action::Scroll {
                delta: Point::new(-step, 0.0),
            },
            KeyCode::ArrowRight => Action::Scroll {
                delta: Point::new(step, 0.0),
            },
            KeyCode::Plus => Action::ZoomIn,
            KeyCode::Minus => Action::ZoomOut,
            KeyCode::Escape | KeyCode::Other(_) => return Vec::new(),
        };
        vec![action]
    }
}

/// Event listener callback type
pub type EventCallback = Box<dyn Fn(&MapEvent) + Send + Sync>;

/// Event management system for the map
#[derive(Default)]
pub struct EventManager {
    /// Event listeners by event kind
    listeners: HashMap<String, Vec<EventCallback>>,
    /// Event queue for processing
    event_queue: VecDeque<MapEvent>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event listener for a [`MapEvent::kind`]
    pub fn on<F>(&mut self, event_type: &str, callback: F)
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        self.listeners
            .entry(event_type.to_string())
            .or_default()
            .push(Box::new(callback));
    }

    /// Emit an event to the queue
    pub fn emit(&mut self, event: MapEvent) {
        self.event_queue.push_back(event);
    }

    /// Process all queued events
    pub fn process_events(&mut self) -> Vec<MapEvent> {
        let events: Vec<_> = self.event_queue.drain(..).collect();

        for event in &events {
            if let Some(callbacks) = self.listeners.get(event.kind()) {
                for callback in callbacks {
                    callback(event);
                }
            }
        }

        events
    }

    /// Clear all events from the queue
    pub fn clear_events(&mut self) {
        self.event_queue.clear();
    }

    /// Get number of pending events
    pub fn pending_events(&self) -> usize {
        self.event_queue.len()
    }
}
