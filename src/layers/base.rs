use crate::{input::events::SignalSender, layers::geometry::ZoomRange};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    RwLock,
};

// LayerTrait is the shared layer contract from `traits`
pub use crate::traits::LayerOperations as LayerTrait;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerType {
    Tile,
    Geometry,
    Custom,
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerType::Tile => write!(f, "tile"),
            LayerType::Geometry => write!(f, "geometry"),
            LayerType::Custom => write!(f, "custom"),
        }
    }
}

/// State shared by every layer implementation
#[derive(Debug)]
pub struct LayerProperties {
    pub name: String,
    pub layer_type: LayerType,
    pub zoom_range: ZoomRange,
    visible: AtomicBool,
    signals: RwLock<Option<SignalSender>>,
}

impl LayerProperties {
    pub fn new(name: impl Into<String>, layer_type: LayerType) -> Self {
        Self {
            name: name.into(),
            layer_type,
            zoom_range: ZoomRange::all(),
            visible: AtomicBool::new(true),
            signals: RwLock::new(None),
        }
    }

    pub fn with_zoom_range(mut self, zoom_range: ZoomRange) -> Self {
        self.zoom_range = zoom_range;
        self
    }

    pub fn is_visible(&self, zoom: i32) -> bool {
        self.visible.load(Ordering::Acquire) && self.zoom_range.contains(zoom)
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Release);
        self.request_redraw();
    }

    pub fn attach(&self, signals: SignalSender) {
        match self.signals.write() {
            Ok(mut slot) => *slot = Some(signals),
            Err(_) => log::warn!("layer '{}' signal slot poisoned", self.name),
        }
    }

    pub fn detach(&self) {
        if let Ok(mut slot) = self.signals.write() {
            *slot = None;
        }
    }

    /// Sender of the owning map control, if attached
    pub fn signals(&self) -> Option<SignalSender> {
        self.signals.read().ok().and_then(|slot| slot.clone())
    }

    pub fn request_redraw(&self) {
        if let Some(signals) = self.signals() {
            signals.request_redraw();
        }
    }
}
