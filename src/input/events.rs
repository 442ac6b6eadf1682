use crate::{
    core::{
        bounds::Bounds,
        geo::{LatLng, Point, Size},
    },
    layers::geometry::GeometryId,
    spatial::hit_test::SelectionResult,
};
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

/// Raw input delivered by the windowing toolkit, in viewport pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    PointerPressed {
        position: Point,
        button: MouseButton,
    },
    PointerMoved {
        position: Point,
    },
    PointerReleased {
        position: Point,
        button: MouseButton,
    },
    /// Wheel rotation, positive away from the user
    Wheel {
        delta: f64,
        position: Point,
    },
    /// Keyboard input
    KeyPress {
        key: KeyCode,
        modifiers: KeyModifiers,
    },
    /// Viewport/window resize
    Resize {
        size: Size,
    },
}

/// Keyboard key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Plus,
    Minus,
    Escape,
    Other(u32),
}

/// Keyboard modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KeyModifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Mouse button types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

/// Whether an event was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventHandled {
    Handled,
    NotHandled,
}

impl InputEvent {
    /// Gets the primary position associated with this event, if any
    pub fn position(&self) -> Option<Point> {
        match self {
            InputEvent::PointerPressed { position, .. }
            | InputEvent::PointerMoved { position }
            | InputEvent::PointerReleased { position, .. }
            | InputEvent::Wheel { position, .. } => Some(*position),
            InputEvent::KeyPress { .. } | InputEvent::Resize { .. } => None,
        }
    }

    /// Checks if this is a mouse/pointer event
    pub fn is_pointer_event(&self) -> bool {
        self.position().is_some()
    }

    /// Checks if this is a keyboard event
    pub fn is_keyboard_event(&self) -> bool {
        matches!(self, InputEvent::KeyPress { .. })
    }
}

/// Notifications emitted by the map control, delivered on the interactive
/// thread by `MapControl::process_events`
#[derive(Debug, Clone)]
pub enum MapEvent {
    /// Focus or zoom changed
    ViewChanged { focus: LatLng, zoom: i32 },
    ZoomChanged { zoom: i32 },
    /// A freshly drawn backbuffer was published
    BackbufferUpdated { coverage_px: Bounds, zoom: i32 },
    RedrawStarted,
    RedrawFinished,
    /// Result of a select-mode drag, keyed by layer name in layer order
    GeometriesSelected(SelectionResult),
    GeometryClicked { layer: String, geometry: GeometryId },
    /// A drag finished; corners of the dragged shape's bounding rectangle
    MouseDragged { from: LatLng, to: LatLng },
    PointerPressed { button: MouseButton, coordinate: LatLng },
    PointerMoved { coordinate: LatLng },
    PointerReleased { button: MouseButton, coordinate: LatLng },
    LayerAdded { name: String },
    LayerRemoved { name: String },
}

impl MapEvent {
    /// Listener key used by `EventManager::on`
    pub fn kind(&self) -> &'static str {
        match self {
            MapEvent::ViewChanged { .. } => "viewchanged",
            MapEvent::ZoomChanged { .. } => "zoomchanged",
            MapEvent::BackbufferUpdated { .. } => "backbufferupdated",
            MapEvent::RedrawStarted => "redrawstarted",
            MapEvent::RedrawFinished => "redrawfinished",
            MapEvent::GeometriesSelected(_) => "geometriesselected",
            MapEvent::GeometryClicked { .. } => "geometryclicked",
            MapEvent::MouseDragged { .. } => "mousedragged",
            MapEvent::PointerPressed { .. } => "pointerpressed",
            MapEvent::PointerMoved { .. } => "pointermoved",
            MapEvent::PointerReleased { .. } => "pointerreleased",
            MapEvent::LayerAdded { .. } => "layeradded",
            MapEvent::LayerRemoved { .. } => "layerremoved",
        }
    }
}

/// Messages sent to the map control from layers and the content source,
/// possibly from other threads
#[derive(Debug, Clone, PartialEq)]
pub enum MapSignal {
    RedrawRequested,
    ContentUpdated,
    LoadingFinished,
    GeometryClicked {
        layer: String,
        geometry: GeometryId,
    },
    GeometryMoved {
        layer: String,
        geometry: GeometryId,
        coordinate: LatLng,
    },
}

/// Cloneable sending half of the map control's signal channel
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: Sender<MapSignal>,
}

impl SignalSender {
    pub fn new(tx: Sender<MapSignal>) -> Self {
        Self { tx }
    }

    /// Sends a signal; a map control that has gone away is not an error
    pub fn send(&self, signal: MapSignal) {
        if let Err(err) = self.tx.send(signal) {
            log::trace!("signal dropped, receiver gone: {:?}", err.into_inner());
        }
    }

    pub fn request_redraw(&self) {
        self.send(MapSignal::RedrawRequested);
    }
}

/// Creates the unbounded channel between collaborators and the map control
pub fn signal_channel() -> (SignalSender, Receiver<MapSignal>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (SignalSender::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_event_position() {
        let press = InputEvent::PointerPressed {
            position: Point::new(100.0, 200.0),
            button: MouseButton::Left,
        };
        assert_eq!(press.position(), Some(Point::new(100.0, 200.0)));
        assert!(press.is_pointer_event());

        let resize = InputEvent::Resize {
            size: Size::new(10, 10),
        };
        assert_eq!(resize.position(), None);
    }

    #[test]
    fn test_event_type_checks() {
        let key_press = InputEvent::KeyPress {
            key: KeyCode::Plus,
            modifiers: KeyModifiers::default(),
        };
        assert!(!key_press.is_pointer_event());
        assert!(key_press.is_keyboard_event());
    }

    #[test]
    fn test_signal_channel_delivers_in_order() {
        let (sender, rx) = signal_channel();
        sender.request_redraw();
        sender.send(MapSignal::LoadingFinished);
        assert_eq!(rx.try_recv().unwrap(), MapSignal::RedrawRequested);
        assert_eq!(rx.try_recv().unwrap(), MapSignal::LoadingFinished);
    }

    #[test]
    fn test_send_after_receiver_dropped_is_silent() {
        let (sender, rx) = signal_channel();
        drop(rx);
        sender.request_redraw();
    }

    #[test]
    fn test_event_kinds() {
        assert_eq!(MapEvent::ZoomChanged { zoom: 3 }.kind(), "zoomchanged");
        assert_eq!(MapEvent::RedrawFinished.kind(), "redrawfinished");
    }
}
