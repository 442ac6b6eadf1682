pub mod events;
pub mod handler;

// Re-export the essential types
pub use events::{
    signal_channel, EventHandled, InputEvent, KeyCode, KeyModifiers, MapEvent, MapSignal,
    MouseButton, SignalSender,
};
pub use handler::{Action, DragKind, EventManager, InteractionController, MouseButtonMode};
